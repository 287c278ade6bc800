//! Dataflow analysis framework.

use crate::controlflow::BlockId;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod forward;

pub use forward::{forward, AbstractForwardState};

/// Dataflow analysis result object.
///
/// Contains entry and exit abstract states for every basic block of the
/// analyzed procedure, after reaching fixpoint.
#[derive(Debug, Clone)]
pub struct Dataflow<S> {
    pub entries: BTreeMap<BlockId, S>,
    pub exits: BTreeMap<BlockId, S>,
}

impl<S> Dataflow<S> {
    #[must_use]
    pub fn entry(&self, block: BlockId) -> Option<&S> {
        self.entries.get(&block)
    }

    #[must_use]
    pub fn exit(&self, block: BlockId) -> Option<&S> {
        self.exits.get(&block)
    }
}

/// Cooperative cancellation flag, checked at block boundaries.
///
/// Cloned tokens share the same flag, so the host can keep one half and
/// hand the other to the analysis.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
