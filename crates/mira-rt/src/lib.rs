//! Mira runtime: dynamic member access over runtime values.
//!
//! Front-ends rewrite `value.field`, `value.field = x`, `value.method(args)`
//! and `value[i]` into calls against this crate without knowing the
//! receiver's shape when the access is written. Each static access site
//! owns a cache slot, so repeated access (typically inside a loop over a
//! homogeneous collection) pays for classification and lookup once.
//!
//! ## Modules
//!
//! - [`value`]: runtime value shapes and the generic-object interface
//! - [`class`]: class identities, predicates, field and method entries
//! - [`classify`]: ordered predicate-based classification
//! - [`registry`]: class registration and queries
//! - [`resolve`]: field and method resolution within a class
//! - [`cache`]: monomorphic per-site inline caches
//! - [`dispatch`]: the cached get/set/call/index protocol
//! - [`path`]: chained access (`a.b[1].c`)
//! - [`builtins`]: array, sequence, and text classes
//! - [`error`]: dispatch errors
//!
//! ## Threading
//!
//! Values are single-threaded. A populated [`ClassRegistry`] may be shared
//! across threads; cache slots belong to exactly one site.

pub mod builtins;
pub mod cache;
pub mod class;
pub mod classify;
pub mod dispatch;
pub mod error;
pub mod path;
pub mod registry;
pub mod resolve;
pub mod value;

pub use builtins::{IndexShape, ARRAY_CLASS, SEQUENCE_CLASS, TEXT_CLASS};
pub use cache::{CacheSlot, CacheStats, CallSite, FieldSite, IndexSite, StoreSite};
pub use class::{Accessor, ClassId, FieldEntry, MethodEntry, Method, Mutator, Predicate};
pub use classify::{Classifier, OBJECT_CLASS};
pub use error::DispatchError;
pub use path::{AccessPath, Hop, PathSite};
pub use registry::{global_registry, ClassRegistry};
pub use resolve::MutatorLookup;
pub use value::{GenericObject, Record, Value};
