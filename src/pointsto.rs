//! Points-to analysis result, as consumed by the dispose analysis.
//!
//! The result is produced by an external points-to pass and is read-only
//! here: every operation maps to a [`PointsToValue`], and each abstract
//! location stands for an alias class of runtime objects together with its
//! static type.

use crate::body::OpId;
use crate::repo::{LocationCounter, LocationUid, TypeUid};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// An alias class of runtime objects, with its static type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AbstractLocation {
    uid: LocationUid,
    ty: TypeUid,
}

impl fmt::Display for AbstractLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.uid)
    }
}

impl AbstractLocation {
    #[must_use]
    pub fn uid(&self) -> LocationUid {
        self.uid
    }

    #[must_use]
    pub fn ty(&self) -> TypeUid {
        self.ty
    }
}

/// What the points-to pass knows about one operation's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointsToValue {
    Unknown,
    NoLocation,
    Known(BTreeSet<AbstractLocation>),
}

impl fmt::Display for PointsToValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "?"),
            Self::NoLocation => write!(f, "<none>"),
            Self::Known(locations) => {
                write!(f, "{{")?;
                for (i, loc) in locations.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{loc}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// The per-operation points-to mapping.
///
/// Locations are owned by this result; the dispose analysis borrows them.
/// Operations with no recorded value are [`PointsToValue::Unknown`].
#[derive(Default)]
pub struct PointsToResult {
    values: BTreeMap<OpId, PointsToValue>,
    counter: LocationCounter,
}

impl PointsToResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh abstract location of the given static type.
    pub fn fresh_location(&mut self, ty: TypeUid) -> AbstractLocation {
        AbstractLocation {
            uid: self.counter.new_location_uid(),
            ty,
        }
    }

    pub fn record(&mut self, op: OpId, value: PointsToValue) {
        debug_assert!(
            !matches!(&value, PointsToValue::Known(locations) if locations.is_empty()),
            "a known points-to value cannot be empty"
        );
        self.values.insert(op, value);
    }

    /// Records a singleton known value for the operation.
    pub fn record_location(&mut self, op: OpId, location: AbstractLocation) {
        let mut locations = BTreeSet::new();
        locations.insert(location);
        self.record(op, PointsToValue::Known(locations));
    }

    #[must_use]
    pub fn value(&self, op: OpId) -> &PointsToValue {
        self.values.get(&op).unwrap_or(&PointsToValue::Unknown)
    }

    /// The locations the operation may evaluate to (empty for `Unknown` and
    /// `NoLocation` values).
    pub fn locations(&self, op: OpId) -> impl Iterator<Item = AbstractLocation> + '_ {
        let locations = match self.value(op) {
            PointsToValue::Known(locations) => Some(locations),
            PointsToValue::Unknown | PointsToValue::NoLocation => None,
        };
        locations.into_iter().flatten().copied()
    }
}
