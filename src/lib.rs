//! This crate provides the dispose-state dataflow analysis used by code
//! quality rules to detect missed releases of disposable resources.
//!
//! The analyzed procedure arrives already lowered: a [`body::Body`] arena
//! of operations, a [`controlflow::Cfg`] over them, a [`repo::Repo`] of
//! the symbols they reference, and the read-only results of a points-to
//! pass (and optionally of a null pass). The analysis runs a forward
//! worklist to fixpoint and reports, per basic block, the dispose state
//! of every abstract heap location of a disposable type.

pub mod body;
pub mod controlflow;
pub mod dataflow;
pub mod dispose;
pub mod errors;
pub mod hierarchy;
pub mod nullness;
pub mod pointsto;
pub mod repo;

use crate::body::Body;
use crate::controlflow::Cfg;
use crate::dataflow::CancelToken;
use crate::dispose::{DisposeContext, DisposeFlows};
use crate::errors::AnalysisResult;

/// Runs the dispose-state dataflow pass onto the given procedure and
/// returns per-block entry and exit states.
///
/// # Errors
///
/// This function may generate errors due to a malformed control flow
/// graph, and returns [`errors::AnalysisError::Cancelled`] when the host
/// cancels through the token.
pub fn compute_dispose_analysis(
    cfg: &Cfg,
    body: &Body,
    context: &DisposeContext,
    cancel: &CancelToken,
) -> AnalysisResult<DisposeFlows> {
    DisposeFlows::compute(cfg, body, context, cancel)
}
