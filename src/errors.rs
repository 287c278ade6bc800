//! Analysis errors definition.

use crate::controlflow::BlockId;
use crate::dispose::errors::DisposeError;
use crate::repo::TypeUid;
use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("control flow graph has no blocks")]
    EmptyControlFlowGraph,

    #[error("block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("type not found: {0}")]
    TypeNotFound(TypeUid),

    #[error("dispose analysis error: {0}")]
    Dispose(#[from] DisposeError),
}
