use crate::body::OpId;
use lazy_static::lazy_static;
use std::collections::BTreeSet;
use std::fmt;

/// Kind of a [`DisposeValue`], in lattice order (bottom to top).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DisposeKind {
    NotDisposable,
    NotDisposed,
    Disposed,
    MaybeDisposed,
    Unknown,
}

impl fmt::Display for DisposeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotDisposable => write!(f, "⊥"),
            Self::NotDisposed => write!(f, "not-disposed"),
            Self::Disposed => write!(f, "disposed"),
            Self::MaybeDisposed => write!(f, "maybe-disposed"),
            Self::Unknown => write!(f, "⊤"),
        }
    }
}

/// Abstract dispose state of one location: a kind plus the set of
/// operations that acted to dispose it on some path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisposeValue {
    kind: DisposeKind,
    disposing_ops: BTreeSet<OpId>,
}

lazy_static! {
    pub static ref NOT_DISPOSABLE: DisposeValue =
        DisposeValue::new(DisposeKind::NotDisposable, BTreeSet::new());
    pub static ref NOT_DISPOSED: DisposeValue =
        DisposeValue::new(DisposeKind::NotDisposed, BTreeSet::new());
    pub static ref UNKNOWN: DisposeValue =
        DisposeValue::new(DisposeKind::Unknown, BTreeSet::new());
}

impl fmt::Display for DisposeValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.disposing_ops.is_empty() {
            write!(f, "[")?;
            for (i, op) in self.disposing_ops.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{op}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl DisposeValue {
    pub(crate) fn new(kind: DisposeKind, disposing_ops: BTreeSet<OpId>) -> Self {
        match kind {
            DisposeKind::Disposed | DisposeKind::MaybeDisposed => {
                assert!(!disposing_ops.is_empty());
            }
            DisposeKind::NotDisposable | DisposeKind::NotDisposed | DisposeKind::Unknown => {
                assert!(disposing_ops.is_empty());
            }
        }
        Self {
            kind,
            disposing_ops,
        }
    }

    #[must_use]
    pub fn kind(&self) -> DisposeKind {
        self.kind
    }

    #[must_use]
    pub fn disposing_ops(&self) -> &BTreeSet<OpId> {
        &self.disposing_ops
    }

    /// The value after one more disposing operation executed on this path.
    ///
    /// A single disposal of a `NotDisposed` location yields `Disposed`;
    /// any further (or uncertain) prior state yields `MaybeDisposed`.
    #[must_use]
    pub fn with_new_disposing_operation(&self, op: OpId) -> Self {
        let kind = if self.kind == DisposeKind::NotDisposed {
            DisposeKind::Disposed
        } else {
            DisposeKind::MaybeDisposed
        };
        let mut disposing_ops = self.disposing_ops.clone();
        disposing_ops.insert(op);
        Self {
            kind,
            disposing_ops,
        }
    }

    /// The value after ownership may have transferred elsewhere: the
    /// dispose obligation becomes indeterminate.
    #[must_use]
    pub fn with_new_escaping_operation(&self, op: OpId) -> Self {
        let mut disposing_ops = self.disposing_ops.clone();
        disposing_ops.insert(op);
        Self {
            kind: DisposeKind::MaybeDisposed,
            disposing_ops,
        }
    }

    #[must_use]
    pub(crate) fn subseteq(&self, other: &Self) -> bool {
        if self.kind == other.kind {
            self.disposing_ops.is_subset(&other.disposing_ops)
        } else {
            self.kind < other.kind
        }
    }

    /// The lattice merge.
    ///
    /// `NotDisposable` absorbs: a location that is non-disposable on any
    /// path is non-disposable, and downstream rules ignore it.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        if self.kind == DisposeKind::NotDisposable || other.kind == DisposeKind::NotDisposable {
            return NOT_DISPOSABLE.clone();
        }
        if self.kind == DisposeKind::NotDisposed && other.kind == DisposeKind::NotDisposed {
            return NOT_DISPOSED.clone();
        }

        let merged_ops: BTreeSet<OpId> = self
            .disposing_ops
            .union(&other.disposing_ops)
            .copied()
            .collect();
        if merged_ops.is_empty() {
            return UNKNOWN.clone();
        }
        let kind = if self.kind == DisposeKind::Disposed && other.kind == DisposeKind::Disposed {
            DisposeKind::Disposed
        } else {
            DisposeKind::MaybeDisposed
        };
        Self {
            kind,
            disposing_ops: merged_ops,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, Operation};

    fn ops(body: &mut Body, n: usize) -> Vec<OpId> {
        (0..n).map(|_| body.push(Operation::Other)).collect()
    }

    fn disposed(op: OpId) -> DisposeValue {
        NOT_DISPOSED.with_new_disposing_operation(op)
    }

    fn maybe_disposed(op: OpId) -> DisposeValue {
        UNKNOWN.with_new_escaping_operation(op)
    }

    #[test]
    fn disposing_transitions() {
        let mut body = Body::new();
        let ids = ops(&mut body, 2);

        let first = NOT_DISPOSED.with_new_disposing_operation(ids[0]);
        assert_eq!(DisposeKind::Disposed, first.kind());
        assert!(first.disposing_ops().contains(&ids[0]));

        let second = first.with_new_disposing_operation(ids[1]);
        assert_eq!(DisposeKind::MaybeDisposed, second.kind());
        assert_eq!(2, second.disposing_ops().len());

        let from_top = UNKNOWN.with_new_disposing_operation(ids[0]);
        assert_eq!(DisposeKind::MaybeDisposed, from_top.kind());
    }

    #[test]
    fn escaping_transition() {
        let mut body = Body::new();
        let ids = ops(&mut body, 1);

        let escaped = NOT_DISPOSED.with_new_escaping_operation(ids[0]);
        assert_eq!(DisposeKind::MaybeDisposed, escaped.kind());
        assert!(escaped.disposing_ops().contains(&ids[0]));

        let escaped_again = disposed(ids[0]).with_new_escaping_operation(ids[0]);
        assert_eq!(DisposeKind::MaybeDisposed, escaped_again.kind());
    }

    #[test]
    fn join_is_idempotent() {
        let mut body = Body::new();
        let ids = ops(&mut body, 1);
        for v in [
            NOT_DISPOSABLE.clone(),
            NOT_DISPOSED.clone(),
            UNKNOWN.clone(),
            disposed(ids[0]),
            maybe_disposed(ids[0]),
        ] {
            assert_eq!(v, v.join(&v));
        }
    }

    #[test]
    fn join_is_commutative() {
        let mut body = Body::new();
        let ids = ops(&mut body, 2);
        let values = [
            NOT_DISPOSABLE.clone(),
            NOT_DISPOSED.clone(),
            UNKNOWN.clone(),
            disposed(ids[0]),
            disposed(ids[1]),
            maybe_disposed(ids[1]),
        ];
        for v1 in &values {
            for v2 in &values {
                assert_eq!(v1.join(v2), v2.join(v1));
            }
        }
    }

    #[test]
    fn join_is_associative() {
        let mut body = Body::new();
        let ids = ops(&mut body, 3);
        let values = [
            NOT_DISPOSABLE.clone(),
            NOT_DISPOSED.clone(),
            UNKNOWN.clone(),
            disposed(ids[0]),
            disposed(ids[1]),
            maybe_disposed(ids[2]),
        ];
        for v1 in &values {
            for v2 in &values {
                for v3 in &values {
                    assert_eq!(v1.join(&v2.join(v3)), v1.join(v2).join(v3));
                }
            }
        }
    }

    #[test]
    fn not_disposable_absorbs() {
        let mut body = Body::new();
        let ids = ops(&mut body, 1);
        assert_eq!(*NOT_DISPOSABLE, NOT_DISPOSABLE.join(&disposed(ids[0])));
        assert_eq!(*NOT_DISPOSABLE, UNKNOWN.join(&NOT_DISPOSABLE));
    }

    #[test]
    fn branch_join_keeps_disposing_ops() {
        let mut body = Body::new();
        let ids = ops(&mut body, 2);

        let merged = NOT_DISPOSED.join(&disposed(ids[0]));
        assert_eq!(DisposeKind::MaybeDisposed, merged.kind());
        assert!(merged.disposing_ops().contains(&ids[0]));

        let both = disposed(ids[0]).join(&disposed(ids[1]));
        assert_eq!(DisposeKind::Disposed, both.kind());
        assert_eq!(2, both.disposing_ops().len());
    }

    #[test]
    fn empty_merged_ops_collapse_to_unknown() {
        assert_eq!(*UNKNOWN, UNKNOWN.join(&NOT_DISPOSED));
        assert_eq!(*UNKNOWN, NOT_DISPOSED.join(&UNKNOWN));
    }

    #[test]
    fn subseteq_follows_kind_order_and_op_sets() {
        let mut body = Body::new();
        let ids = ops(&mut body, 2);
        let d0 = disposed(ids[0]);
        let d01 = d0.with_new_disposing_operation(ids[1]);

        assert!(NOT_DISPOSABLE.subseteq(&NOT_DISPOSED));
        assert!(NOT_DISPOSED.subseteq(&d0));
        assert!(d0.subseteq(&UNKNOWN));
        assert!(d0.subseteq(&d0.join(&d01)));
        assert!(!d01.subseteq(&d0));
    }
}
