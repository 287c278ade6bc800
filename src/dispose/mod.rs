//! Dispose-state analysis pass stuff.
//!
//! Computes, for every abstract heap location of a disposable type, whether
//! the analyzed procedure disposed it on every path, some path, or no path,
//! together with the operations that contributed to disposal. Downstream
//! rules query the exit state of the exit block to report missed releases.

mod forward;
mod value;

pub mod errors;

use crate::body::{Body, OpId};
use crate::controlflow::Cfg;
use crate::dataflow::{self, CancelToken, Dataflow};
use crate::dispose::errors::DisposeError;
use crate::dispose::value::{NOT_DISPOSABLE, UNKNOWN};
use crate::errors::{AnalysisError, AnalysisResult};
use crate::nullness::{NullResult, NullState};
use crate::pointsto::{AbstractLocation, PointsToResult};
use crate::repo::{MethodDef, MethodUid, RefKind, Repo, TypeDef, TypeUid};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub use value::{DisposeKind, DisposeValue};

/// Result of the dispose analysis pass.
///
/// Contains dispose-state information for abstract locations at entries and
/// exits of every basic block of the analyzed procedure.
pub type DisposeFlows = Dataflow<State>;

impl DisposeFlows {
    /// Runs the dispose-state dataflow pass onto the given control flow
    /// graph and returns results of the dataflow analysis.
    ///
    /// # Errors
    ///
    /// This function may generate errors due to a malformed graph, and
    /// returns [`AnalysisError::Cancelled`] when the host cancels.
    pub fn compute(
        cfg: &Cfg,
        body: &Body,
        context: &DisposeContext,
        cancel: &CancelToken,
    ) -> AnalysisResult<Self> {
        dataflow::forward(cfg, body, context, cancel)
    }

    /// The exit state of the exit block, when the graph has one.
    #[must_use]
    pub fn final_state(&self, cfg: &Cfg) -> Option<&State> {
        cfg.exit_block().and_then(|block| self.exits.get(&block))
    }
}

/// The abstract state for the dispose pass: a mapping from abstract
/// locations to their dispose values.
///
/// A location absent from the map is at the lattice bottom
/// (`NotDisposable`). Keys are never removed; values only move upward.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct State {
    locations: BTreeMap<AbstractLocation, DisposeValue>,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.locations.is_empty() {
            return write!(f, "    <empty>");
        }
        for (i, (location, value)) in self.locations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "    {location}: {value}")?;
        }
        Ok(())
    }
}

impl State {
    /// Returns the dispose value tracked for the given location, if any.
    #[must_use]
    pub fn value(&self, location: &AbstractLocation) -> Option<&DisposeValue> {
        self.locations.get(location)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AbstractLocation, &DisposeValue)> {
        self.locations.iter()
    }

    fn current(&self, location: &AbstractLocation) -> &DisposeValue {
        self.locations.get(location).unwrap_or(&NOT_DISPOSABLE)
    }

    /// The single mutator of the map.
    ///
    /// Panics if the location's static type is not disposable: callers must
    /// filter locations before writing, a write for a non-disposable
    /// location is a contract violation.
    fn set(&mut self, context: &DisposeContext, location: AbstractLocation, value: DisposeValue) {
        assert!(
            context.is_disposable(location.ty()),
            "dispose state written for non-disposable location {location}"
        );
        self.locations.insert(location, value);
    }

    fn join_with(&mut self, other: &Self) {
        for (location, value) in &other.locations {
            match self.locations.get_mut(location) {
                Some(current) => *current = current.join(value),
                None => {
                    self.locations.insert(*location, value.clone());
                }
            }
        }
    }

    fn widen_to_unknown(&mut self) {
        for value in self.locations.values_mut() {
            *value = UNKNOWN.clone();
        }
    }

    #[cfg(test)]
    fn subseteq(&self, other: &Self) -> bool {
        self.locations.iter().all(|(location, value)| {
            other
                .locations
                .get(location)
                .is_some_and(|o| value.subseteq(o))
        })
    }
}

/// Classification of an invoked method with respect to disposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposeMethodKind {
    Dispose,
    DisposeBool,
    Close,
    None,
}

/// Everything the transfer function holds for the analyzed procedure:
/// domain symbols, heuristic configuration and the external analysis
/// results.
pub struct DisposeContext<'a> {
    repo: &'a Repo,
    disposable: TypeUid,
    collection: TypeUid,
    generic_collection: TypeUid,
    ownership_transfer: BTreeSet<TypeUid>,
    enclosing: TypeUid,
    dispose_method: MethodUid,
    points_to: &'a PointsToResult,
    nullness: Option<&'a NullResult>,
}

impl<'a> DisposeContext<'a> {
    /// Builds the analysis context.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the domain symbols is unknown to the
    /// repo, or if the disposable capability has no `Dispose` method.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: &'a Repo,
        disposable: TypeUid,
        collection: TypeUid,
        generic_collection: TypeUid,
        ownership_transfer: BTreeSet<TypeUid>,
        enclosing: TypeUid,
        points_to: &'a PointsToResult,
        nullness: Option<&'a NullResult>,
    ) -> AnalysisResult<Self> {
        for ty in [disposable, collection, generic_collection, enclosing] {
            if repo.type_def(ty).is_none() {
                return Err(AnalysisError::TypeNotFound(ty));
            }
        }
        let dispose_method = repo
            .find_method(disposable, "Dispose")
            .ok_or(DisposeError::MissingDisposeSymbol(disposable))?;

        Ok(Self {
            repo,
            disposable,
            collection,
            generic_collection,
            ownership_transfer,
            enclosing,
            dispose_method,
            points_to,
            nullness,
        })
    }

    #[must_use]
    pub fn repo(&self) -> &Repo {
        self.repo
    }

    #[must_use]
    pub fn enclosing(&self) -> TypeUid {
        self.enclosing
    }

    pub(crate) fn points_to(&self) -> &PointsToResult {
        self.points_to
    }

    pub(crate) fn is_disposable(&self, ty: TypeUid) -> bool {
        self.repo.derives_from(ty, self.disposable)
    }

    pub(crate) fn owns_by_construction(&self, ty: TypeUid) -> bool {
        self.ownership_transfer.contains(&ty)
    }

    pub(crate) fn null_state(&self, op: OpId) -> NullState {
        self.nullness
            .map_or(NullState::Undefined, |nullness| nullness.state(op))
    }

    /// Classifies an invoked method with respect to disposal. Methods of
    /// non-disposable types are never dispose methods.
    pub(crate) fn dispose_method_kind(&self, method: &MethodDef) -> DisposeMethodKind {
        if !self.is_disposable(method.containing()) {
            return DisposeMethodKind::None;
        }

        if method.params().is_empty()
            && method.returns().is_none()
            && self
                .repo
                .find_interface_implementation(method.containing(), self.dispose_method)
                == Some(method.uid())
        {
            return DisposeMethodKind::Dispose;
        }

        if method.name() == "Dispose" && method.returns().is_none() {
            if let [param] = method.params() {
                if param.ref_kind() == RefKind::Value
                    && self.repo.type_def(param.ty()).is_some_and(TypeDef::is_bool)
                {
                    return DisposeMethodKind::DisposeBool;
                }
            }
        }

        if method.name() == "Close" && method.params().is_empty() && method.returns().is_none() {
            return DisposeMethodKind::Close;
        }

        DisposeMethodKind::None
    }

    pub(crate) fn is_collection_add(&self, method: &MethodDef) -> bool {
        method.name().starts_with("Add")
            && (self.repo.derives_from(method.containing(), self.collection)
                || self
                    .repo
                    .derives_from(method.containing(), self.generic_collection))
    }
}
