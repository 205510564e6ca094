//! Shared test support for unit tests.
//!
//! Compiled only under `cfg(test)`; integration tests under `tests/` carry their
//! own copy of the manifest writer since they cannot reach crate-private items.

pub(crate) mod factories;
