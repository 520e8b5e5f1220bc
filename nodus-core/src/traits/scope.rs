//! Variables owned by an enclosing pipeline.

use crate::error::Result;
use std::collections::HashMap;

/// Variables owned by an enclosing pipeline.
///
/// Implementations return [`NodusError::ScopeUnavailable`] when their
/// source cannot be read.
///
/// [`NodusError::ScopeUnavailable`]: crate::error::NodusError::ScopeUnavailable
pub trait PipelineScope: Send + Sync {
    /// Declared `vars`.
    fn vars(&self) -> Result<HashMap<String, String>>;

    /// Declared `decryptSecrets`.
    fn decrypt_secrets(&self) -> Result<HashMap<String, String>>;
}
