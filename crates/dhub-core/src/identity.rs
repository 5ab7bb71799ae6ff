// ── Identity cache ──
//
// One live instance per (family, id). Devices and lots are held behind
// shared `Entity<T>` handles; re-parsing a payload for a known id swaps
// new contents into the existing handle instead of creating a second one,
// so every holder of the handle observes the update.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::trace;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{Device, Lot};

// ── EntityId ────────────────────────────────────────────────────────

/// Server-assigned identifier.
///
/// Devices use integers, lots use UUIDs, tags and events use free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Numeric(i64),
    Uuid(Uuid),
    Text(String),
}

impl EntityId {
    /// Read an id from a JSON number or string. `None` for anything else.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Numeric),
            Value::String(s) if !s.is_empty() => Some(Self::from(s.as_str())),
            _ => None,
        }
    }

    /// Read the `id` member of an object, or the value itself if it is a
    /// bare id.
    pub fn from_ref(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => map.get("id").and_then(Self::from_value),
            other => Self::from_value(other),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Numeric(n) => Value::from(*n),
            Self::Uuid(u) => Value::String(u.to_string()),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        Self::Numeric(n)
    }
}

impl From<Uuid> for EntityId {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        if let Ok(n) = s.parse::<i64>() {
            return Self::Numeric(n);
        }
        match Uuid::parse_str(s) {
            Ok(u) => Self::Uuid(u),
            Err(_) => Self::Text(s.to_owned()),
        }
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

// ── Entity handle ───────────────────────────────────────────────────

/// Shared, identity-carrying handle to a cached resource.
///
/// Clones share the same slot: `define` on one is visible through all.
pub struct Entity<T> {
    slot: Arc<ArcSwap<T>>,
}

impl<T> Entity<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Arc::new(ArcSwap::from_pointee(value)),
        }
    }

    /// Current contents.
    pub fn load(&self) -> Arc<T> {
        self.slot.load_full()
    }

    /// Replace the contents in place.
    pub fn define(&self, value: T) {
        self.slot.store(Arc::new(value));
    }

    /// Whether both handles point at the same cached instance.
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<T> Clone for Entity<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Entity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Entity").field(&self.slot.load_full()).finish()
    }
}

// ── Relation ────────────────────────────────────────────────────────

/// A lazily resolved relationship.
///
/// `Unresolved` means the referenced resource has not been fetched into
/// the cache yet; it is not an absence.
#[derive(Debug, Clone)]
pub enum Relation<T> {
    Resolved(Entity<T>),
    Unresolved(EntityId),
}

impl<T> Relation<T> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn resolved(&self) -> Option<&Entity<T>> {
        match self {
            Self::Resolved(entity) => Some(entity),
            Self::Unresolved(_) => None,
        }
    }
}

// ── IdentityMap ─────────────────────────────────────────────────────

/// Per-family map from id to live instance.
///
/// Every mutation bumps a `watch` version so views can re-render.
pub struct IdentityMap<T: Send + Sync + 'static> {
    family: &'static str,
    entries: DashMap<EntityId, Entity<T>>,
    version: watch::Sender<u64>,
}

impl<T: Send + Sync + 'static> IdentityMap<T> {
    pub fn new(family: &'static str) -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            family,
            entries: DashMap::new(),
            version,
        }
    }

    /// Return the instance for `id`, creating or re-defining it.
    ///
    /// `parse` receives the current contents (if any) and the payload, and
    /// returns the new contents. No map lock is held while it runs, so it
    /// may register nested entities in this or other maps.
    pub fn get_or_create<P, F>(&self, id: EntityId, payload: P, parse: F) -> Result<Entity<T>, CoreError>
    where
        F: FnOnce(Option<&T>, P) -> Result<T, CoreError>,
    {
        if let Some(entity) = self.lookup(&id) {
            let current = entity.load();
            let next = parse(Some(&current), payload)?;
            entity.define(next);
            trace!(family = self.family, %id, "redefined cached instance");
            self.bump_version();
            return Ok(entity);
        }

        let value = parse(None, payload)?;
        let entity = match self.entries.entry(id) {
            // Registered by a nested parse in the meantime.
            Entry::Occupied(occupied) => {
                let entity = occupied.get().clone();
                entity.define(value);
                entity
            }
            Entry::Vacant(vacant) => {
                trace!(family = self.family, id = %vacant.key(), "registered instance");
                vacant.insert(Entity::new(value)).clone()
            }
        };
        self.bump_version();
        Ok(entity)
    }

    /// Register an existing handle under `id`, replacing any previous one.
    pub fn insert(&self, id: EntityId, entity: Entity<T>) {
        self.entries.insert(id, entity);
        self.bump_version();
    }

    pub fn lookup(&self, id: &EntityId) -> Option<Entity<T>> {
        self.entries.get(id).map(|r| r.value().clone())
    }

    /// `Resolved` when cached, otherwise `Unresolved(id)`.
    pub fn relation(&self, id: &EntityId) -> Relation<T> {
        self.lookup(id)
            .map_or_else(|| Relation::Unresolved(id.clone()), Relation::Resolved)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current contents of every cached instance, in no particular order.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries.iter().map(|r| r.value().load()).collect()
    }

    /// Subscribe to the mutation counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.bump_version();
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for IdentityMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityMap")
            .field("family", &self.family)
            .field("len", &self.entries.len())
            .finish()
    }
}

// ── IdentityCache ───────────────────────────────────────────────────

/// Session-scoped cache of devices and lots.
///
/// Created at session start and shared (`Arc`) by every component that
/// parses or resolves resources. `clear` is the logout hook; there is no
/// eviction.
#[derive(Debug)]
pub struct IdentityCache {
    pub devices: IdentityMap<Device>,
    pub lots: IdentityMap<Lot>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self {
            devices: IdentityMap::new("devices"),
            lots: IdentityMap::new("lots"),
        }
    }

    pub fn clear(&self) {
        self.devices.clear();
        self.lots.clear();
    }
}

impl Default for IdentityCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Named(String);

    fn parse_named(_: Option<&Named>, payload: &Value) -> Result<Named, CoreError> {
        Ok(Named(payload["name"].as_str().unwrap_or_default().to_owned()))
    }

    #[test]
    fn entity_id_parses_numbers_uuids_and_text() {
        assert_eq!(EntityId::from_value(&json!(7)), Some(EntityId::Numeric(7)));
        assert_eq!(EntityId::from("42"), EntityId::Numeric(42));
        assert!(matches!(
            EntityId::from("550e8400-e29b-41d4-a716-446655440000"),
            EntityId::Uuid(_)
        ));
        assert_eq!(EntityId::from("tag-1"), EntityId::Text("tag-1".into()));
        assert_eq!(EntityId::from_value(&json!(null)), None);
        assert_eq!(EntityId::from_ref(&json!({ "id": 3 })), Some(EntityId::Numeric(3)));
    }

    #[test]
    fn entity_id_serde_is_untagged() {
        let id: EntityId = serde_json::from_value(json!(5)).unwrap();
        assert_eq!(id, EntityId::Numeric(5));
        assert_eq!(serde_json::to_value(EntityId::Text("x".into())).unwrap(), json!("x"));
    }

    #[test]
    fn get_or_create_keeps_one_instance_per_id() {
        let map: IdentityMap<Named> = IdentityMap::new("test");
        let first = map
            .get_or_create(EntityId::Numeric(1), &json!({ "name": "a" }), parse_named)
            .unwrap();
        let second = map
            .get_or_create(EntityId::Numeric(1), &json!({ "name": "b" }), parse_named)
            .unwrap();

        assert!(first.same_instance(&second));
        assert_eq!(first.load().0, "b");
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn parse_receives_current_contents() {
        let map: IdentityMap<Named> = IdentityMap::new("test");
        map.get_or_create(EntityId::Numeric(1), "a", |_, p: &str| Ok(Named(p.into())))
            .unwrap();
        let entity = map
            .get_or_create(EntityId::Numeric(1), "b", |current, p: &str| {
                Ok(Named(format!("{}{p}", current.unwrap().0)))
            })
            .unwrap();
        assert_eq!(entity.load().0, "ab");
    }

    #[test]
    fn parse_errors_leave_cache_untouched() {
        let map: IdentityMap<Named> = IdentityMap::new("test");
        let result = map.get_or_create(EntityId::Numeric(1), (), |_, ()| {
            Err(CoreError::Invariant { message: "nope".into() })
        });
        assert!(result.is_err());
        assert!(map.is_empty());
    }

    #[test]
    fn relation_is_unresolved_until_cached() {
        let map: IdentityMap<Named> = IdentityMap::new("test");
        let id = EntityId::Numeric(9);
        assert!(matches!(map.relation(&id), Relation::Unresolved(ref u) if *u == id));
        map.insert(id.clone(), Entity::new(Named("x".into())));
        assert!(map.relation(&id).is_resolved());
    }

    #[test]
    fn mutations_bump_version_and_clear_empties() {
        let map: IdentityMap<Named> = IdentityMap::new("test");
        let rx = map.subscribe();
        map.insert(EntityId::Numeric(1), Entity::new(Named("x".into())));
        map.clear();
        assert_eq!(*rx.borrow(), 2);
        assert!(map.is_empty());
    }
}
