//! Lowered procedure body: an arena of operations in evaluation order.
//!
//! The front end lowers every expression and statement of the analyzed
//! procedure into one [`Operation`] node. Operations reference their
//! sub-expressions by [`OpId`]; a basic block lists its operations in
//! evaluation order, so children always precede their parents.

use crate::repo::MethodUid;
use std::fmt;

/// Index of an operation inside its [`Body`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpId(usize);

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "op{}", self.0)
    }
}

/// How an invocation target is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationKind {
    Method,
    Delegate,
    Lambda,
    LocalFunction,
}

/// The left-hand side shape of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentTarget {
    Local,
    Parameter,
    FieldReference,
    PropertyReference,
    ArrayElementReference,
}

/// One lowered operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// `new T(args...)`, referencing the invoked constructor.
    InstanceCreation {
        ctor: MethodUid,
        arguments: Vec<OpId>,
    },
    /// A method call on an optional receiver.
    Invocation {
        target: MethodUid,
        instance: Option<OpId>,
        arguments: Vec<OpId>,
        kind: InvocationKind,
    },
    /// `target = value`.
    Assignment {
        target: AssignmentTarget,
        value: OpId,
    },
    /// `return value?`.
    Return { value: Option<OpId> },
    /// A block guaranteeing release of its resources on all exit paths.
    /// Resources are the initializer expressions of the declared
    /// resources, or the single guarded expression.
    ScopedAcquisition { resources: Vec<OpId> },
    /// A conversion applied to an operand.
    Conversion { operand: OpId, user_defined: bool },
    /// A collection or object initializer writing `value` into an element
    /// of `instance`.
    ElementInitializer { instance: OpId, value: OpId },
    /// A reference to the current instance (`this`).
    InstanceReference,
    /// A reference to a local variable.
    LocalReference { index: usize },
    /// A reference to a formal parameter.
    ParameterReference { index: usize },
    /// A literal constant.
    Literal,
    /// Any operation shape the dispose analysis has no interest in.
    Other,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InstanceCreation { ctor, arguments } => {
                write!(f, "new[{ctor}](")?;
                fmt_ids(f, arguments)?;
                write!(f, ")")
            }
            Self::Invocation {
                target, instance, ..
            } => match instance {
                Some(recv) => write!(f, "call[{target}] on {recv}"),
                None => write!(f, "call[{target}]"),
            },
            Self::Assignment { target, value } => write!(f, "{target:?} := {value}"),
            Self::Return { value: Some(v) } => write!(f, "return {v}"),
            Self::Return { value: None } => write!(f, "return"),
            Self::ScopedAcquisition { resources } => {
                write!(f, "using(")?;
                fmt_ids(f, resources)?;
                write!(f, ")")
            }
            Self::Conversion { operand, .. } => write!(f, "conv {operand}"),
            Self::ElementInitializer { instance, value } => {
                write!(f, "{instance}[..] := {value}")
            }
            Self::InstanceReference => write!(f, "this"),
            Self::LocalReference { index } => write!(f, "local{index}"),
            Self::ParameterReference { index } => write!(f, "param{index}"),
            Self::Literal => write!(f, "lit"),
            Self::Other => write!(f, "other"),
        }
    }
}

fn fmt_ids(f: &mut fmt::Formatter, ids: &[OpId]) -> fmt::Result {
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{id}")?;
    }
    Ok(())
}

/// Arena of the operations of a single procedure body.
#[derive(Debug, Default)]
pub struct Body {
    ops: Vec<Operation>,
}

impl Body {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: Operation) -> OpId {
        let id = OpId(self.ops.len());
        self.ops.push(op);
        id
    }

    #[must_use]
    pub fn op(&self, id: OpId) -> Option<&Operation> {
        self.ops.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (OpId, &Operation)> {
        self.ops.iter().enumerate().map(|(i, op)| (OpId(i), op))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
