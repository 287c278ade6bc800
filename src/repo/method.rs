use crate::repo::{MethodUid, TypeUid};
use std::fmt;

/// Parameter passing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Value,
    Ref,
    Out,
}

/// A formal parameter of a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    ty: TypeUid,
    ref_kind: RefKind,
}

impl Param {
    #[must_use]
    pub fn new(ty: TypeUid) -> Self {
        Self {
            ty,
            ref_kind: RefKind::Value,
        }
    }

    #[must_use]
    pub fn by_ref(ty: TypeUid) -> Self {
        Self {
            ty,
            ref_kind: RefKind::Ref,
        }
    }

    #[must_use]
    pub fn out(ty: TypeUid) -> Self {
        Self {
            ty,
            ref_kind: RefKind::Out,
        }
    }

    #[must_use]
    pub fn ty(&self) -> TypeUid {
        self.ty
    }

    #[must_use]
    pub fn ref_kind(&self) -> RefKind {
        self.ref_kind
    }
}

/// Declaration of a method, as registered into the repo.
///
/// The `implements` field records which interface method this method is the
/// implementation of, when any; it backs the interface implementation lookup
/// used to recognize `Disposable.Dispose` implementations.
#[derive(Debug, Clone, Default)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub returns: Option<TypeUid>,
    pub is_static: bool,
    pub implements: Option<MethodUid>,
}

/// A method known to the symbol repository.
#[derive(Debug, Clone)]
pub struct MethodDef {
    uid: MethodUid,
    containing: TypeUid,
    name: String,
    params: Vec<Param>,
    returns: Option<TypeUid>,
    is_static: bool,
    implements: Option<MethodUid>,
}

impl fmt::Display for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}::{}", self.containing, self.name)
    }
}

impl MethodDef {
    pub(crate) fn new(uid: MethodUid, containing: TypeUid, decl: MethodDecl) -> Self {
        Self {
            uid,
            containing,
            name: decl.name,
            params: decl.params,
            returns: decl.returns,
            is_static: decl.is_static,
            implements: decl.implements,
        }
    }

    #[must_use]
    pub fn uid(&self) -> MethodUid {
        self.uid
    }

    #[must_use]
    pub fn containing(&self) -> TypeUid {
        self.containing
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    #[must_use]
    pub fn returns(&self) -> Option<TypeUid> {
        self.returns
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    #[must_use]
    pub fn implements(&self) -> Option<MethodUid> {
        self.implements
    }
}
