//! Resource model and store abstractions for converge.
//!
//! - **Resources**: identity, metadata, finalizers and status conditions
//! - **Merge patches**: RFC 7386 diff/apply over serialized resources
//! - **Stores**: the async get/patch seam plus in-memory and tracing stores
//! - **Labels**: `app.kubernetes.io/*` naming conventions for owned objects

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod condition;
pub mod error;
pub mod labels;
pub mod patch;
pub mod resource;
pub mod result;
pub mod scheme;
pub mod store;
pub mod types;

// Re-export main types
pub use condition::{
    Condition, ConditionStatus, find_condition, find_condition_mut, is_condition_false,
    is_condition_true, remove_condition, set_status_condition, set_status_condition_at,
};
pub use error::Error;
pub use labels::{AppComponent, LabelProvider, merge_string_maps};
pub use patch::{apply_merge_patch, create_merge_patch};
pub use resource::Resource;
pub use result::{Result, ResultExt};
pub use scheme::Scheme;
pub use store::{InMemoryStore, Patch, ResourceStore, TracingStore};
pub use types::{ObjectKey, ObjectMeta, Subresource, TypeMeta};
