//! Expression compilation: the front-end seam and the retry-driving loop.
//!
//! # Module Structure
//!
//! - [`artifact`] - Compiled artifacts, evaluation flags and result metadata
//! - [`diagnostics`] - Front-end diagnostics and missing-assembly inference
//! - [`frontend`] - The [`frontend::ExpressionFrontend`] trait
//! - [`retry`] - On-demand metadata fetching
//! - [`driver`] - Compile classification and the bounded retry loop

pub mod artifact;
pub mod diagnostics;
pub mod driver;
pub mod frontend;
pub mod retry;
