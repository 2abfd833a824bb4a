//! Client-side data layer between `galleria-api` and UI consumers.
//!
//! This crate owns the gallery application's model engine: typed REST
//! conversion, an identity-preserving instance cache, and change
//! notification:
//!
//! - **[`Registry`]** — One [`ModelService`] per entity type, sharing a
//!   single [`galleria_api::RestClient`]. Linked-object field conversion
//!   resolves its target service through the registry.
//!
//! - **[`ModelService`]** — Per-entity cache plus the REST operations
//!   (`list` / `retrieve` / `create` / `update` / `destroy` / `reorder`,
//!   with lazy variants served from the cache). The cache holds at most
//!   one [`Model`] allocation per primary key and merges new data into
//!   it in place, so every view of an object stays current.
//!
//! - **[`Model`]** — Shared handle to one entity instance. Field values
//!   are client-format [`Value`]s; linked objects are `Model`s, with
//!   reverse links (`piece.category` / `category.pieces`) maintained
//!   automatically.
//!
//! - **Field descriptors** ([`model::fields`]) — Declarative per-field
//!   conversion between wire JSON and client values: naming-convention
//!   renames, decimal prices, year-month dates, and linked objects.
//!
//! - **Services** ([`services`]) — The login session ([`UserSession`])
//!   and the editable site-copy table ([`string_table`]).

pub mod entities;
pub mod error;
pub mod model;
pub mod observer;
pub mod registry;
pub mod services;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use observer::{ObserverHandle, ObserverSet};
pub use registry::Registry;
pub use services::{StringTable, UserSession, string_table};
pub use store::ModelService;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ClientDict,
    EntityDescriptor,
    EntityKind,
    FieldDescriptor,
    FieldKind,
    FileUpload,
    Model,
    Pk,
    Value,
    WireValue,
    YearMonth,
};
