// ── Lots ──
//
// Named groupings of devices and of other lots. Children and parents are
// kept as ids and resolved through the cache, which holds the full lot
// list once the tree has been fetched.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use dhub_api::Collection;

use super::{boolean, id, ids, string, to_body, ParseContext, Teaser, Thing, ThingMeta};
use crate::error::CoreError;
use crate::identity::{Entity, EntityId, IdentityCache, Relation};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Lot {
    #[serde(skip)]
    pub id: Option<EntityId>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(skip)]
    pub closed: Option<bool>,
    #[serde(skip)]
    pub devices: Vec<EntityId>,
    #[serde(skip)]
    children: Vec<EntityId>,
    #[serde(skip)]
    parents: Vec<EntityId>,
    #[serde(skip)]
    pub url: Option<Url>,
    #[serde(skip)]
    pub deliverynote: Option<DeliveryNote>,
    #[serde(skip)]
    pub meta: ThingMeta,
}

impl Lot {
    /// A new, unposted lot. It is linked under `parents[0]` once posted.
    pub fn draft(name: impl Into<String>, description: Option<String>, parents: Vec<EntityId>) -> Self {
        Self {
            name: Some(name.into()),
            description,
            parents,
            ..Self::default()
        }
    }

    /// Parse and register through the cache. A known id re-defines the
    /// cached lot and returns the same handle.
    pub fn from_object(payload: &Value, ctx: &ParseContext<'_>) -> Result<Entity<Self>, CoreError> {
        let Some(lot_id) = id(payload, "id") else {
            return Self::parse(payload, ctx).map(Entity::new);
        };
        ctx.cache
            .lots
            .get_or_create(lot_id, payload, |_, payload| Self::parse(payload, ctx))
    }

    pub fn parse(payload: &Value, ctx: &ParseContext<'_>) -> Result<Self, CoreError> {
        let deliverynote = match payload.get("deliverynote") {
            Some(note) if note.is_object() => Some(DeliveryNote::parse(note)),
            _ => None,
        };
        Ok(Self {
            id: id(payload, "id"),
            name: string(payload, "name"),
            description: string(payload, "description"),
            closed: boolean(payload, "closed"),
            devices: ids(payload, "devices"),
            children: ids(payload, "children"),
            parents: ids(payload, "parents"),
            url: string(payload, "url").and_then(|u| ctx.url(&u)),
            deliverynote,
            meta: ThingMeta::parse(payload),
        })
    }

    pub fn child_ids(&self) -> &[EntityId] {
        &self.children
    }

    pub fn parent_ids(&self) -> &[EntityId] {
        &self.parents
    }

    pub fn children(&self, cache: &IdentityCache) -> Vec<Relation<Lot>> {
        self.children.iter().map(|id| cache.lots.relation(id)).collect()
    }

    pub fn parents(&self, cache: &IdentityCache) -> Vec<Relation<Lot>> {
        self.parents.iter().map(|id| cache.lots.relation(id)).collect()
    }

    /// Every cached lot reachable through `children`, breadth first.
    pub fn descendants(&self, cache: &IdentityCache) -> Vec<Entity<Lot>> {
        walk(self, cache, Lot::child_ids)
    }

    /// Every cached lot reachable through `parents`, breadth first.
    pub fn ancestors(&self, cache: &IdentityCache) -> Vec<Entity<Lot>> {
        walk(self, cache, Lot::parent_ids)
    }

    /// Case-insensitive substring match on the name.
    pub fn has_text(&self, text: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(&text.to_lowercase()))
    }
}

/// Graph walk with a visited set; lots missing from the cache are skipped.
/// The backend does not guarantee acyclicity.
fn walk(start: &Lot, cache: &IdentityCache, next: fn(&Lot) -> &[EntityId]) -> Vec<Entity<Lot>> {
    let mut visited: HashSet<EntityId> = start.id.iter().cloned().collect();
    let mut queue: VecDeque<EntityId> = next(start).iter().cloned().collect();
    let mut found = Vec::new();
    while let Some(id) = queue.pop_front() {
        if !visited.insert(id.clone()) {
            continue;
        }
        if let Some(entity) = cache.lots.lookup(&id) {
            queue.extend(next(&entity.load()).iter().cloned());
            found.push(entity);
        }
    }
    found
}

impl Thing for Lot {
    const COLLECTION: Collection = Collection::Lots;

    fn type_name(&self) -> &'static str {
        "Lot"
    }

    fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn meta(&self) -> &ThingMeta {
        &self.meta
    }

    fn title(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.type_human())
    }

    fn teaser(&self) -> Teaser {
        Teaser {
            type_human: self.type_human(),
            title: self.title(),
            description: self.description.clone().unwrap_or_default(),
            date: self.meta.created,
            severity: None,
        }
    }

    /// Only `name` and `description` are posted.
    fn raw_body(&self) -> Result<Map<String, Value>, CoreError> {
        to_body(self, "Lot")
    }

    fn define(&mut self, payload: &Value, ctx: &ParseContext<'_>) -> Result<(), CoreError> {
        *self = Self::parse(payload, ctx)?;
        Ok(())
    }
}

// ── Delivery notes ──────────────────────────────────────────────────

/// Blockchain transfer record attached to a lot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeliveryNote {
    #[serde(skip)]
    pub id: Option<EntityId>,
    pub ethereum_address: Option<String>,
    pub deposit: Option<u64>,
    pub transfer_state: Option<String>,
    #[serde(skip)]
    pub supplier_id: Option<EntityId>,
    #[serde(skip)]
    pub receiver_id: Option<EntityId>,
    #[serde(skip)]
    pub receiver_address: Option<String>,
    #[serde(skip)]
    pub meta: ThingMeta,
}

impl DeliveryNote {
    pub fn parse(payload: &Value) -> Self {
        Self {
            id: id(payload, "id"),
            ethereum_address: string(payload, "ethereum_address"),
            deposit: payload.get("deposit").and_then(Value::as_u64),
            transfer_state: string(payload, "transfer_state"),
            supplier_id: id(payload, "supplier"),
            receiver_id: id(payload, "receiver"),
            receiver_address: payload
                .get("receiver")
                .and_then(|receiver| string(receiver, "ethereum_address")),
            meta: ThingMeta::parse(payload),
        }
    }
}

impl Thing for DeliveryNote {
    const COLLECTION: Collection = Collection::DeliveryNotes;

    fn type_name(&self) -> &'static str {
        "Deliverynote"
    }

    fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn meta(&self) -> &ThingMeta {
        &self.meta
    }

    fn raw_body(&self) -> Result<Map<String, Value>, CoreError> {
        to_body(self, "Deliverynote")
    }

    fn define(&mut self, payload: &Value, _ctx: &ParseContext<'_>) -> Result<(), CoreError> {
        *self = Self::parse(payload);
        Ok(())
    }
}
