use crate::errors::{AnalysisError, AnalysisResult};
use crate::hierarchy::Hierarchy;
use crate::repo::uids::RepoCounters;
use crate::repo::{MethodDecl, MethodDef, MethodUid, TypeDef, TypeKind, TypeUid};
use std::collections::BTreeMap;

/// The symbol repository.
///
/// Holds every type and method the analyzed procedure can refer to, plus the
/// inheritance hierarchy between types. The dispose analysis only reads from
/// it; construction happens up front, from whatever front end lowered the
/// procedure.
#[derive(Default)]
pub struct Repo {
    counters: RepoCounters,
    hierarchy: Hierarchy,
    types: BTreeMap<TypeUid, TypeDef>,
    methods: BTreeMap<MethodUid, MethodDef>,
    methods_by_type: BTreeMap<TypeUid, Vec<MethodUid>>,
}

impl Repo {
    #[must_use]
    pub fn new() -> Self {
        Self {
            counters: RepoCounters::new(),
            hierarchy: Hierarchy::new(),
            types: BTreeMap::new(),
            methods: BTreeMap::new(),
            methods_by_type: BTreeMap::new(),
        }
    }

    pub fn add_type(&mut self, name: &str, kind: TypeKind) -> TypeUid {
        let uid = self.counters.new_type_uid();
        self.types.insert(uid, TypeDef::new(uid, name, kind));
        self.hierarchy
            .insert_type(uid)
            .expect("freshly allocated uid cannot collide");
        uid
    }

    /// Registers an `extends` link between two already registered types.
    ///
    /// # Errors
    ///
    /// Returns a [`AnalysisError::TypeNotFound`] error if either type is
    /// unknown to the repo.
    pub fn add_extends(&mut self, ty: TypeUid, supertype: TypeUid) -> AnalysisResult<()> {
        self.hierarchy.insert_extends(ty, supertype)
    }

    /// Registers an `implements` link between two already registered types.
    ///
    /// # Errors
    ///
    /// Returns a [`AnalysisError::TypeNotFound`] error if either type is
    /// unknown to the repo.
    pub fn add_implements(&mut self, ty: TypeUid, interface: TypeUid) -> AnalysisResult<()> {
        self.hierarchy.insert_implements(ty, interface)
    }

    /// Registers a method on an already registered containing type.
    ///
    /// # Errors
    ///
    /// Returns a [`AnalysisError::TypeNotFound`] error if the containing type
    /// is unknown to the repo.
    pub fn add_method(&mut self, containing: TypeUid, decl: MethodDecl) -> AnalysisResult<MethodUid> {
        if !self.hierarchy.contains_type(containing) {
            return Err(AnalysisError::TypeNotFound(containing));
        }
        let uid = self.counters.new_method_uid();
        self.methods
            .insert(uid, MethodDef::new(uid, containing, decl));
        self.methods_by_type.entry(containing).or_default().push(uid);
        Ok(uid)
    }

    #[must_use]
    pub fn type_def(&self, ty: TypeUid) -> Option<&TypeDef> {
        self.types.get(&ty)
    }

    #[must_use]
    pub fn method(&self, method: MethodUid) -> Option<&MethodDef> {
        self.methods.get(&method)
    }

    #[must_use]
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Tells whether `ty` is `other` or transitively inherits from it,
    /// through `extends` and `implements` links alike.
    #[must_use]
    pub fn derives_from(&self, ty: TypeUid, other: TypeUid) -> bool {
        self.hierarchy.all_parents(ty).contains(&other)
    }

    /// Looks up a method by name on the given type itself (declared methods
    /// only, no inherited ones).
    #[must_use]
    pub fn find_method(&self, ty: TypeUid, name: &str) -> Option<MethodUid> {
        self.methods_by_type.get(&ty)?.iter().copied().find(|uid| {
            self.methods
                .get(uid)
                .is_some_and(|def| def.name() == name)
        })
    }

    /// Finds the method of `ty` (or of one of its base classes) that
    /// implements the given interface method.
    #[must_use]
    pub fn find_interface_implementation(
        &self,
        ty: TypeUid,
        interface_method: MethodUid,
    ) -> Option<MethodUid> {
        for candidate_ty in self.hierarchy.extends_chain(ty) {
            let Some(methods) = self.methods_by_type.get(&candidate_ty) else {
                continue;
            };
            for uid in methods {
                let implements = self.methods.get(uid).and_then(MethodDef::implements);
                if implements == Some(interface_method) {
                    return Some(*uid);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_interface_implementation_through_base_class() {
        let mut repo = Repo::new();
        let iface = repo.add_type("IDisposable", TypeKind::Interface);
        let iface_dispose = repo
            .add_method(
                iface,
                MethodDecl {
                    name: "Dispose".to_string(),
                    ..MethodDecl::default()
                },
            )
            .unwrap();
        let base = repo.add_type("Stream", TypeKind::Class);
        repo.add_implements(base, iface).unwrap();
        let base_dispose = repo
            .add_method(
                base,
                MethodDecl {
                    name: "Dispose".to_string(),
                    implements: Some(iface_dispose),
                    ..MethodDecl::default()
                },
            )
            .unwrap();
        let leaf = repo.add_type("FileStream", TypeKind::Class);
        repo.add_extends(leaf, base).unwrap();

        assert_eq!(
            Some(base_dispose),
            repo.find_interface_implementation(leaf, iface_dispose)
        );
        assert_eq!(
            Some(base_dispose),
            repo.find_interface_implementation(base, iface_dispose)
        );
        assert_eq!(None, repo.find_interface_implementation(iface, base_dispose));
    }

    #[test]
    fn add_method_rejects_unknown_containing_type() {
        let mut repo = Repo::new();
        let ty = repo.add_type("D", TypeKind::Class);
        let mut other = Repo::new();
        let _ = other.add_type("padding", TypeKind::Class);
        let foreign = other.add_type("E", TypeKind::Class);

        assert!(repo.add_method(ty, MethodDecl::default()).is_ok());
        assert!(repo.add_method(foreign, MethodDecl::default()).is_err());
    }
}
