//! Type hierarchy graph representation.

use crate::errors::{AnalysisError, AnalysisResult};
use crate::repo::{Repo, TypeUid};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, PartialEq, Eq)]
pub enum Inheritance {
    Extends,
    Implements,
}

impl fmt::Display for Inheritance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Extends => write!(f, "<extends>"),
            Self::Implements => write!(f, "<implements>"),
        }
    }
}

#[derive(Debug, Default)]
pub struct Hierarchy {
    inner: DiGraph<TypeUid, Inheritance>,
    node_ids: BTreeMap<TypeUid, NodeIndex>,
}

impl Hierarchy {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_type(&mut self, ty: TypeUid) -> AnalysisResult<()> {
        if self.node_ids.contains_key(&ty) {
            return Err(AnalysisError::Internal(
                "duplicate type in hierarchy graph".to_string(),
            ));
        }

        let id = self.inner.add_node(ty);
        self.node_ids.insert(ty, id);
        Ok(())
    }

    pub(crate) fn contains_type(&self, ty: TypeUid) -> bool {
        self.node_ids.contains_key(&ty)
    }

    pub(crate) fn insert_extends(&mut self, ty: TypeUid, supertype: TypeUid) -> AnalysisResult<()> {
        self.insert_link(ty, supertype, Inheritance::Extends)
    }

    pub(crate) fn insert_implements(
        &mut self,
        ty: TypeUid,
        interface: TypeUid,
    ) -> AnalysisResult<()> {
        self.insert_link(ty, interface, Inheritance::Implements)
    }

    fn insert_link(&mut self, from: TypeUid, to: TypeUid, link: Inheritance) -> AnalysisResult<()> {
        let src = self
            .node_ids
            .get(&from)
            .ok_or(AnalysisError::TypeNotFound(from))?;
        let dst = self
            .node_ids
            .get(&to)
            .ok_or(AnalysisError::TypeNotFound(to))?;
        self.inner.add_edge(*src, *dst, link);
        Ok(())
    }

    /// Returns the set of transitive supertypes of the given type, the type
    /// itself included.
    #[must_use]
    pub fn all_parents(&self, ty: TypeUid) -> BTreeSet<TypeUid> {
        let mut parents = BTreeSet::new();
        let Some(id) = self.node_ids.get(&ty) else {
            return parents;
        };
        let mut dfs = Dfs::new(&self.inner, *id);
        while let Some(id) = dfs.next(&self.inner) {
            parents.insert(self.inner[id]);
        }
        parents
    }

    /// Returns the given type followed by its chain of `Extends` ancestors,
    /// nearest first.
    #[must_use]
    pub fn extends_chain(&self, ty: TypeUid) -> Vec<TypeUid> {
        let mut chain = Vec::new();
        let mut current = self.node_ids.get(&ty).copied();
        while let Some(id) = current {
            chain.push(self.inner[id]);
            current = self
                .inner
                .edges(id)
                .find(|edge| *edge.weight() == Inheritance::Extends)
                .map(|edge| edge.target());
        }
        chain
    }

    #[must_use]
    pub fn to_dot(&self, repo: &Repo) -> String {
        format!(
            "{}",
            Dot::with_attr_getters(
                &self.inner,
                &[Config::EdgeNoLabel, Config::NodeNoLabel],
                &|_, edge| {
                    let style = match edge.weight() {
                        Inheritance::Extends => "solid",
                        Inheritance::Implements => "dashed",
                    };
                    format!("arrowType=empty,style={style}")
                },
                &|_, (_, ty)| {
                    let label = repo
                        .type_def(*ty)
                        .map_or_else(|| format!("{ty}"), |def| def.name().to_string());
                    format!("shape=box,label=\"{label}\"")
                }
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::repo::{Repo, TypeKind};

    #[test]
    fn all_parents_is_transitive_and_reflexive() {
        let mut repo = Repo::new();
        let base = repo.add_type("Resource", TypeKind::Class);
        let mid = repo.add_type("Stream", TypeKind::Class);
        let leaf = repo.add_type("FileStream", TypeKind::Class);
        repo.add_extends(mid, base).unwrap();
        repo.add_extends(leaf, mid).unwrap();

        let parents = repo.hierarchy().all_parents(leaf);
        assert!(parents.contains(&leaf));
        assert!(parents.contains(&mid));
        assert!(parents.contains(&base));
    }

    #[test]
    fn all_parents_follows_interfaces() {
        let mut repo = Repo::new();
        let iface = repo.add_type("IDisposable", TypeKind::Interface);
        let base = repo.add_type("Stream", TypeKind::Class);
        let leaf = repo.add_type("FileStream", TypeKind::Class);
        repo.add_implements(base, iface).unwrap();
        repo.add_extends(leaf, base).unwrap();

        assert!(repo.hierarchy().all_parents(leaf).contains(&iface));
    }

    #[test]
    fn extends_chain_skips_interfaces() {
        let mut repo = Repo::new();
        let iface = repo.add_type("IDisposable", TypeKind::Interface);
        let base = repo.add_type("Stream", TypeKind::Class);
        let leaf = repo.add_type("FileStream", TypeKind::Class);
        repo.add_implements(leaf, iface).unwrap();
        repo.add_extends(leaf, base).unwrap();

        assert_eq!(vec![leaf, base], repo.hierarchy().extends_chain(leaf));
    }
}
