//! Dispose analysis errors definitions.

use crate::repo::TypeUid;
use thiserror::Error;

/// An alias for result that can be a [`DisposeError`].
pub type DisposeResult<T> = Result<T, DisposeError>;

/// The dispose analysis error type.
#[derive(Debug, Error)]
pub enum DisposeError {
    #[error("no Dispose method found on the disposable capability {0}")]
    MissingDisposeSymbol(TypeUid),
}
