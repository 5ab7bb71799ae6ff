// ── Resource factory ──
//
// Entry point for turning wire payloads into resources and for writing
// resources back. Owns the session cache and one server per collection.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

use dhub_api::{Collection, ResourceServer};

use crate::error::CoreError;
use crate::identity::{Entity, EntityId, IdentityCache};
use crate::model::{parse_resource, Lot, ParseContext, Resource, Thing};

/// Resource factory bound to one inventory.
pub struct Resources<S> {
    cache: Arc<IdentityCache>,
    base_url: Option<Url>,
    devices: S,
    events: S,
    lots: S,
    tags: S,
    users: S,
    proofs: S,
    deliverynotes: S,
}

impl<S: ResourceServer> Resources<S> {
    /// `make` is called once per collection to build its server.
    pub fn new(cache: Arc<IdentityCache>, mut make: impl FnMut(Collection) -> S) -> Self {
        Self {
            cache,
            base_url: None,
            devices: make(Collection::Devices),
            events: make(Collection::Events),
            lots: make(Collection::Lots),
            tags: make(Collection::Tags),
            users: make(Collection::Users),
            proofs: make(Collection::Proofs),
            deliverynotes: make(Collection::DeliveryNotes),
        }
    }

    /// Base URL relative resource links resolve against.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn cache(&self) -> &Arc<IdentityCache> {
        &self.cache
    }

    pub fn context(&self) -> ParseContext<'_> {
        let ctx = ParseContext::new(&self.cache);
        match &self.base_url {
            Some(base) => ctx.with_base_url(base),
            None => ctx,
        }
    }

    pub fn server(&self, collection: Collection) -> &S {
        match collection {
            Collection::Devices => &self.devices,
            Collection::Events => &self.events,
            Collection::Lots => &self.lots,
            Collection::Tags => &self.tags,
            Collection::Users => &self.users,
            Collection::Proofs => &self.proofs,
            Collection::DeliveryNotes => &self.deliverynotes,
        }
    }

    // ── Parsing ──────────────────────────────────────────────────────

    /// Parse any payload by its `type`. Devices and lots go through the
    /// cache; events, tags and users are built fresh.
    pub fn from_object(&self, payload: &Value) -> Result<Resource, CoreError> {
        parse_resource(payload, &self.context())
    }

    // ── Writing ──────────────────────────────────────────────────────

    /// Create `thing` on the server and re-define it from the response.
    pub async fn post<T: Thing>(&self, thing: &mut T) -> Result<(), CoreError> {
        if let Some(id) = thing.id() {
            return Err(CoreError::AlreadyPosted {
                type_name: thing.type_name().to_owned(),
                id: id.to_string(),
            });
        }
        let body = Value::Object(thing.post_body()?);
        debug!(type_name = thing.type_name(), "posting new resource");
        let response = self.server(T::COLLECTION).post(&body).await?;
        thing.define(&response, &self.context())
    }

    /// Create a lot, register it, and link it under its first parent.
    pub async fn post_lot(&self, mut lot: Lot) -> Result<Entity<Lot>, CoreError> {
        let parent = lot.parent_ids().first().cloned();
        self.post(&mut lot).await?;
        let lot_id = lot.id.clone().ok_or_else(|| CoreError::Invariant {
            message: "posted lot came back without an id".into(),
        })?;
        let entity = match self.cache.lots.lookup(&lot_id) {
            Some(existing) => {
                existing.define(lot);
                existing
            }
            None => {
                let entity = Entity::new(lot);
                self.cache.lots.insert(lot_id.clone(), entity.clone());
                entity
            }
        };
        if let Some(parent) = parent {
            self.add_children(&parent, std::slice::from_ref(&lot_id)).await?;
        }
        Ok(entity)
    }

    /// Send only `fields` of `thing`, by wire name. Unknown names are
    /// skipped.
    pub async fn patch<T: Thing>(&self, thing: &T, fields: &[&str]) -> Result<(), CoreError> {
        let Some(id) = thing.id() else {
            return Err(CoreError::NotPosted {
                type_name: thing.type_name().to_owned(),
            });
        };
        let raw = thing.raw_body()?;
        let body: Map<String, Value> = fields
            .iter()
            .filter_map(|field| raw.get(*field).map(|value| ((*field).to_owned(), value.clone())))
            .collect();
        debug!(type_name = thing.type_name(), %id, ?fields, "patching resource");
        self.server(T::COLLECTION)
            .patch(&Value::Object(body), &id.to_string())
            .await?;
        Ok(())
    }

    // ── Lot membership ───────────────────────────────────────────────

    /// Add devices to a lot, whether or not they were already in it.
    pub async fn add_devices(&self, lot: &EntityId, devices: &[EntityId]) -> Result<Entity<Lot>, CoreError> {
        let response = self
            .lots
            .post_at(&format!("{lot}/devices"), &json!({}), &id_params(devices))
            .await?;
        self.redefine_lot(&response)
    }

    /// Remove devices from a lot, whether or not they were in it.
    pub async fn remove_devices(&self, lot: &EntityId, devices: &[EntityId]) -> Result<Entity<Lot>, CoreError> {
        let response = self
            .lots
            .delete(&format!("{lot}/devices"), &id_params(devices))
            .await?;
        self.redefine_lot(&response)
    }

    pub async fn add_children(&self, lot: &EntityId, children: &[EntityId]) -> Result<Entity<Lot>, CoreError> {
        let response = self
            .lots
            .post_at(&format!("{lot}/children"), &json!({}), &id_params(children))
            .await?;
        self.redefine_lot(&response)
    }

    pub async fn remove_children(&self, lot: &EntityId, children: &[EntityId]) -> Result<Entity<Lot>, CoreError> {
        let response = self
            .lots
            .delete(&format!("{lot}/children"), &id_params(children))
            .await?;
        self.redefine_lot(&response)
    }

    fn redefine_lot(&self, payload: &Value) -> Result<Entity<Lot>, CoreError> {
        Lot::from_object(payload, &self.context())
    }
}

/// One `id` query pair per id.
fn id_params(ids: &[EntityId]) -> Vec<(&'static str, String)> {
    ids.iter().map(|id| ("id", id.to_string())).collect()
}
