//! The missing-assembly retry protocol.
//!
//! When a compile fails only because some assembly's metadata was never
//! captured, the debugger can often produce it on demand (from the debuggee
//! process, a symbol server, or disk). [`should_try_again_with_more_metadata_blocks`]
//! runs one round of that protocol: fetch each missing identity, append what
//! arrives to the working set, and report whether anything new was added so the
//! driver knows a recompile could succeed.

use log::{debug, warn};

use crate::{
    metadata::{
        block::{MetadataBlock, MetadataBlockSet},
        identity::AssemblyIdentity,
    },
    Error, Result,
};

/// Why a metadata fetch produced no bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The provider has no metadata for this identity. Not an error condition;
    /// it ends the current retry round.
    NotFound,
    /// The channel to the provider failed. Aborts the whole evaluation.
    Transport(String),
}

/// Source of on-demand metadata, implemented by the debugger side.
///
/// Implemented for any `FnMut(&AssemblyIdentity) -> Result<Vec<u8>, FetchError>`
/// closure, which is the form tests and simple hosts use.
pub trait MetadataProvider {
    /// Fetch the raw module-manifest bytes for one assembly identity.
    ///
    /// # Errors
    /// [`FetchError::NotFound`] when the identity cannot be produced,
    /// [`FetchError::Transport`] when the channel itself failed.
    fn fetch(
        &mut self,
        identity: &AssemblyIdentity,
    ) -> std::result::Result<Vec<u8>, FetchError>;
}

impl<F> MetadataProvider for F
where
    F: FnMut(&AssemblyIdentity) -> std::result::Result<Vec<u8>, FetchError>,
{
    fn fetch(
        &mut self,
        identity: &AssemblyIdentity,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        self(identity)
    }
}

/// Run one round of the missing-assembly retry protocol.
///
/// Fetches each identity in `missing`, in order, appending every successfully
/// parsed block to `blocks` (modules already present by MVID are dropped
/// silently). A [`FetchError::NotFound`] ends the round early: identities the
/// provider cannot produce now will not appear later in the same evaluation, so
/// asking for the rest would only add latency.
///
/// Returns `Ok(true)` when at least one genuinely new block was added, which is
/// the signal that recompiling might now succeed.
///
/// # Errors
/// [`Error::TransportFault`] when the provider channel fails, and any parse
/// error from malformed fetched manifests.
pub fn should_try_again_with_more_metadata_blocks<P: MetadataProvider>(
    provider: &mut P,
    missing: &[AssemblyIdentity],
    blocks: &mut MetadataBlockSet,
) -> Result<bool> {
    let mut added = false;

    for identity in missing {
        let bytes = match provider.fetch(identity) {
            Ok(bytes) => bytes,
            Err(FetchError::NotFound) => {
                debug!("retry: no metadata available for {identity}");
                break;
            }
            Err(FetchError::Transport(message)) => {
                warn!("retry: transport failure fetching {identity}: {message}");
                return Err(Error::TransportFault(message));
            }
        };

        let block = MetadataBlock::parse(bytes)?;
        let size = block.size();
        if blocks.push(block) {
            debug!("retry: added metadata block for {identity} ({size} bytes)");
            added = true;
        }
    }

    Ok(added)
}
