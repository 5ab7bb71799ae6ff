//! Resource model and list synchronization between `dhub-api` and UI
//! consumers (the `dhub` CLI, or any other front end).
//!
//! - **[`IdentityCache`]**: one live instance per device and per lot,
//!   shared by every list and relation that mentions it. Re-parsing a
//!   payload updates the instance in place.
//!
//! - **Resource model** ([`model`]): devices, events, lots, tags and users,
//!   read from wire payloads by their `type` discriminator and written
//!   back through [`Resources::post`] / [`Resources::patch`].
//!
//! - **[`ResourceListGetter`]**: paginated fetch engine merging filters
//!   from several sources. Responses superseded by a newer request are
//!   dropped, never merged.
//!
//! - **[`ResourceListSelector`]** and **[`Lots`]**: selection across pages
//!   and the lot navigation tree.
//!
//! - **Proofs** ([`proofs`]): transfer and proof workflows over the
//!   [`dhub_api::BlockchainService`] interface.

pub mod config;
pub mod error;
pub mod identity;
pub mod list_getter;
pub mod list_selector;
pub mod lot_tree;
pub mod model;
pub mod naming;
pub mod proofs;
pub mod resource_list;
pub mod resources;

#[cfg(test)]
mod test_support;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ClientConfig, DEFAULT_PER_PAGE};
pub use error::CoreError;
pub use identity::{Entity, EntityId, IdentityCache, IdentityMap, Relation};
pub use list_getter::{
    DeviceListing, FetchOutcome, ListingClass, NoProgress, Pagination, ProgressIndicator,
    ResourceListGetter,
};
pub use list_selector::{Identified, ResourceListSelector};
pub use lot_tree::{LotNode, Lots};
pub use naming::Naming;
pub use proofs::{
    BatchProof, ProofTransfer, TransferWorkflow, generate_proofs_concurrent,
    generate_proofs_sequential,
};
pub use resource_list::ResourceList;
pub use resources::Resources;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    DeliveryNote, Device, DeviceKind, Event, EventKind, Lot, ParseContext, Resource, ResourceKey,
    Severity, Tag, Teaser, Thing, User,
};
