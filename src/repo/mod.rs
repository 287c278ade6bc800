//! Symbol repository: types, methods and their inheritance links.

mod method;
mod repository;
mod types;
mod uids;

pub use method::{MethodDecl, MethodDef, Param, RefKind};
pub use repository::Repo;
pub use types::{PrimitiveType, TypeDef, TypeKind};
pub use uids::{LocationUid, MethodUid, TypeUid};

pub(crate) use uids::{LocationCounter, RepoCounters};
