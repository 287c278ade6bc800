//! Null analysis result, as optionally consumed by the dispose analysis.
//!
//! When present it only refines precision: a receiver known to be null
//! cannot release anything. Omitting it never changes soundness.

use crate::body::OpId;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullState {
    Null,
    NotNull,
    MaybeNull,
    Undefined,
}

impl fmt::Display for NullState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::NotNull => write!(f, "not-null"),
            Self::MaybeNull => write!(f, "maybe-null"),
            Self::Undefined => write!(f, "undef"),
        }
    }
}

/// The per-operation null-state mapping. Operations with no recorded state
/// are [`NullState::Undefined`].
#[derive(Debug, Default)]
pub struct NullResult {
    states: BTreeMap<OpId, NullState>,
}

impl NullResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, op: OpId, state: NullState) {
        self.states.insert(op, state);
    }

    #[must_use]
    pub fn state(&self, op: OpId) -> NullState {
        self.states.get(&op).copied().unwrap_or(NullState::Undefined)
    }
}
