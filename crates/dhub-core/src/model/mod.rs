// ── Resource model ──
//
// Closed variant sets per resource family. Each family reads its wire
// payload by hand (normalizing and resolving relationships against the
// identity cache) and writes itself back through serde for posting.

pub mod device;
pub mod event;
pub mod lot;
pub mod tag;
pub mod user;

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use url::Url;

use dhub_api::Collection;

use crate::error::CoreError;
use crate::identity::{Entity, EntityId, IdentityCache};
use crate::naming::Naming;

pub use device::{
    AccessoryDetail, ComponentDetail, ComponentSpec, ComputerDetail, DataStorageSpec, Device,
    DeviceDetail, DeviceFamily, DeviceKind, GraphicCardSpec, MobileDetail, MotherboardSpec,
    NetworkAdapterSpec, ProcessorSpec, RamModuleSpec,
};
pub use event::{Event, EventDetail, EventKind, EventTarget, RatingRange, Severity};
pub use lot::{DeliveryNote, Lot};
pub use tag::Tag;
pub use user::{Inventory, User};

// ── Parse context ───────────────────────────────────────────────────

/// What parsing needs besides the payload: the cache nested devices and
/// lots register into, and the base URL relative links resolve against.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub cache: &'a IdentityCache,
    pub base_url: Option<&'a Url>,
}

impl<'a> ParseContext<'a> {
    pub fn new(cache: &'a IdentityCache) -> Self {
        Self {
            cache,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: &'a Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Resolve a possibly relative link.
    pub(crate) fn url(&self, raw: &str) -> Option<Url> {
        match self.base_url {
            Some(base) => base.join(raw).ok(),
            None => Url::parse(raw).ok(),
        }
    }
}

// ── Common fields ───────────────────────────────────────────────────

/// Fields every server-backed resource carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThingMeta {
    pub same_as: Option<String>,
    pub updated: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
}

impl ThingMeta {
    pub(crate) fn parse(payload: &Value) -> Self {
        Self {
            same_as: string(payload, "sameAs"),
            updated: timestamp(payload, "updated"),
            created: timestamp(payload, "created"),
        }
    }
}

/// Compact rendering of a resource: type, title, short description, date.
#[derive(Debug, Clone, PartialEq)]
pub struct Teaser {
    pub type_human: String,
    pub title: String,
    pub description: String,
    pub date: Option<DateTime<Utc>>,
    pub severity: Option<Severity>,
}

// ── Thing capability ────────────────────────────────────────────────

/// Behavior shared by every resource family.
pub trait Thing {
    /// Collection the resource is posted to.
    const COLLECTION: Collection;

    /// Concrete type discriminator, e.g. `Laptop`.
    fn type_name(&self) -> &'static str;

    fn id(&self) -> Option<&EntityId>;

    fn meta(&self) -> &ThingMeta;

    fn title(&self) -> String {
        self.type_human()
    }

    fn type_human(&self) -> String {
        Naming::humanize(self.type_name())
    }

    fn teaser(&self) -> Teaser {
        Teaser {
            type_human: self.type_human(),
            title: self.title(),
            description: String::new(),
            date: self.meta().created,
            severity: None,
        }
    }

    /// Every own field under its wire name, before cleanup.
    fn raw_body(&self) -> Result<Map<String, Value>, CoreError>;

    /// Relationship ids appended after cleanup (kept even when empty).
    fn post_relations(&self) -> Vec<(&'static str, Value)> {
        Vec::new()
    }

    /// Body for `POST`: cleaned own fields plus `type` and relationship ids.
    fn post_body(&self) -> Result<Map<String, Value>, CoreError> {
        let mut body = clean_body(self.raw_body()?);
        body.insert("type".into(), Value::String(self.type_name().into()));
        for (key, value) in self.post_relations() {
            body.insert(key.into(), value);
        }
        Ok(body)
    }

    /// Re-apply a payload onto this instance. The type does not change.
    fn define(&mut self, payload: &Value, ctx: &ParseContext<'_>) -> Result<(), CoreError>;
}

/// Drop absent values and internal keys.
///
/// Absent means `null`, `false`, `""`, `[]` or `{}`; `0` is kept. Keys
/// starting with `_` are internal and never sent.
pub fn clean_body(raw: Map<String, Value>) -> Map<String, Value> {
    raw.into_iter()
        .filter(|(key, value)| !key.starts_with('_') && is_present(value))
        .collect()
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(true) | Value::Number(_) => true,
    }
}

pub(crate) fn to_body<T: Serialize>(value: &T, what: &str) -> Result<Map<String, Value>, CoreError> {
    match serde_json::to_value(value).map_err(|e| CoreError::parse(what, e))? {
        Value::Object(map) => Ok(map),
        other => Err(CoreError::parse(what, format!("expected an object, got {other}"))),
    }
}

// ── Type registry ───────────────────────────────────────────────────

/// Resource family of a stored resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString)]
pub enum ResourceFamily {
    Device,
    Event,
    Lot,
    Tag,
    User,
}

/// Concrete type resolved from a `type` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Device(DeviceKind),
    Event(EventKind),
    Lot,
    Tag,
    User,
}

impl ResourceKind {
    pub fn family(self) -> ResourceFamily {
        match self {
            Self::Device(_) => ResourceFamily::Device,
            Self::Event(_) => ResourceFamily::Event,
            Self::Lot => ResourceFamily::Lot,
            Self::Tag => ResourceFamily::Tag,
            Self::User => ResourceFamily::User,
        }
    }
}

/// Resolve a type string (optionally prefixed, e.g. `devices:Snapshot`).
pub fn resource_kind(type_name: &str) -> Result<ResourceKind, CoreError> {
    let name = Naming::pop_prefix(type_name).map_or(type_name, |(_, name)| name);
    if let Ok(kind) = name.parse::<DeviceKind>() {
        return Ok(ResourceKind::Device(kind));
    }
    if let Ok(kind) = name.parse::<EventKind>() {
        return Ok(ResourceKind::Event(kind));
    }
    match name {
        "Lot" => Ok(ResourceKind::Lot),
        "Tag" => Ok(ResourceKind::Tag),
        "User" => Ok(ResourceKind::User),
        _ => Err(CoreError::UnknownType {
            type_name: type_name.to_owned(),
        }),
    }
}

// ── Resource ────────────────────────────────────────────────────────

/// Any parsed resource in transit through lists and selections.
///
/// Devices and lots are cache handles; the other families are immutable
/// once parsed.
#[derive(Debug, Clone)]
pub enum Resource {
    Device(Entity<Device>),
    Lot(Entity<Lot>),
    Event(Arc<Event>),
    Tag(Arc<Tag>),
    User(Arc<User>),
}

/// Identity of a resource for selection: family plus id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub family: ResourceFamily,
    pub id: Option<EntityId>,
}

impl Resource {
    pub fn family(&self) -> ResourceFamily {
        match self {
            Self::Device(_) => ResourceFamily::Device,
            Self::Lot(_) => ResourceFamily::Lot,
            Self::Event(_) => ResourceFamily::Event,
            Self::Tag(_) => ResourceFamily::Tag,
            Self::User(_) => ResourceFamily::User,
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        match self {
            Self::Device(d) => d.load().id.clone(),
            Self::Lot(l) => l.load().id.clone(),
            Self::Event(e) => e.id.clone(),
            Self::Tag(t) => Some(t.id.clone()),
            Self::User(u) => u.id.clone(),
        }
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            family: self.family(),
            id: self.id(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Device(d) => d.load().type_name(),
            Self::Lot(l) => l.load().type_name(),
            Self::Event(e) => e.type_name(),
            Self::Tag(t) => t.type_name(),
            Self::User(u) => u.type_name(),
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::Device(d) => d.load().title(),
            Self::Lot(l) => l.load().title(),
            Self::Event(e) => e.title(),
            Self::Tag(t) => t.title(),
            Self::User(u) => u.title(),
        }
    }

    pub fn teaser(&self) -> Teaser {
        match self {
            Self::Device(d) => d.load().teaser(),
            Self::Lot(l) => l.load().teaser(),
            Self::Event(e) => e.teaser(),
            Self::Tag(t) => t.teaser(),
            Self::User(u) => u.teaser(),
        }
    }

    pub fn as_device(&self) -> Option<&Entity<Device>> {
        match self {
            Self::Device(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_lot(&self) -> Option<&Entity<Lot>> {
        match self {
            Self::Lot(l) => Some(l),
            _ => None,
        }
    }
}

/// Parse any payload by its `type`, routing devices and lots through the
/// cache.
pub fn parse_resource(payload: &Value, ctx: &ParseContext<'_>) -> Result<Resource, CoreError> {
    let type_name = payload
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::parse("resource", "payload has no type"))?;
    match resource_kind(type_name)? {
        ResourceKind::Device(_) => Device::from_object(payload, ctx).map(Resource::Device),
        ResourceKind::Lot => Lot::from_object(payload, ctx).map(Resource::Lot),
        ResourceKind::Event(_) => Event::parse(payload, ctx).map(|e| Resource::Event(Arc::new(e))),
        ResourceKind::Tag => Tag::parse(payload, ctx).map(|t| Resource::Tag(Arc::new(t))),
        ResourceKind::User => User::parse(payload, ctx).map(|u| Resource::User(Arc::new(u))),
    }
}

// ── Payload readers ─────────────────────────────────────────────────
//
// Missing and `null` fields read as `None`; wrong JSON kinds too.

pub(crate) fn has_type(value: &Value) -> bool {
    value.get("type").is_some_and(Value::is_string)
}

pub(crate) fn type_of(payload: &Value) -> Option<&str> {
    payload.get("type").and_then(Value::as_str)
}

pub(crate) fn string(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn number(payload: &Value, key: &str) -> Option<f64> {
    payload.get(key).and_then(Value::as_f64)
}

pub(crate) fn boolean(payload: &Value, key: &str) -> Option<bool> {
    payload.get(key).and_then(Value::as_bool)
}

pub(crate) fn id(payload: &Value, key: &str) -> Option<EntityId> {
    payload.get(key).and_then(EntityId::from_ref)
}

pub(crate) fn list<'a>(payload: &'a Value, key: &str) -> &'a [Value] {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

pub(crate) fn ids(payload: &Value, key: &str) -> Vec<EntityId> {
    list(payload, key).iter().filter_map(EntityId::from_ref).collect()
}

/// RFC 3339, or the server's naive `YYYY-MM-DDTHH:MM:SS[.f]` read as UTC.
pub(crate) fn timestamp(payload: &Value, key: &str) -> Option<DateTime<Utc>> {
    let raw = payload.get(key)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc())
        })
        .ok()
}

/// Deserialize the typed fields of a variant out of the whole payload.
pub(crate) fn typed<T: DeserializeOwned>(payload: &Value, what: &str) -> Result<T, CoreError> {
    T::deserialize(payload).map_err(|e| CoreError::parse(what, e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_body_keeps_zero_and_drops_empties() {
        let raw = json!({
            "a": 0, "b": false, "c": "", "d": [], "e": {}, "f": null,
            "_internal": 1, "g": true, "h": "x", "i": [1]
        });
        let Value::Object(raw) = raw else { unreachable!() };
        let cleaned = clean_body(raw);
        let keys: Vec<&str> = cleaned.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "g", "h", "i"]);
    }

    #[test]
    fn resource_kind_resolves_every_family() {
        assert_eq!(
            resource_kind("Laptop").unwrap(),
            ResourceKind::Device(DeviceKind::Laptop)
        );
        assert_eq!(
            resource_kind("devices:Snapshot").unwrap(),
            ResourceKind::Event(EventKind::Snapshot)
        );
        assert_eq!(resource_kind("SAI").unwrap(), ResourceKind::Device(DeviceKind::Sai));
        assert_eq!(resource_kind("Lot").unwrap().family(), ResourceFamily::Lot);
        assert_eq!(resource_kind("Tag").unwrap(), ResourceKind::Tag);
    }

    #[test]
    fn unknown_type_is_a_data_shape_error() {
        let err = resource_kind("Spaceship").unwrap_err();
        assert!(matches!(err, CoreError::UnknownType { ref type_name } if type_name == "Spaceship"));
    }

    #[test]
    fn timestamps_accept_naive_server_format() {
        let payload = json!({ "a": "2018-06-06T10:20:05", "b": "2018-06-06T10:20:05+02:00", "c": "nope" });
        assert_eq!(timestamp(&payload, "a").unwrap().to_rfc3339(), "2018-06-06T10:20:05+00:00");
        assert_eq!(timestamp(&payload, "b").unwrap().to_rfc3339(), "2018-06-06T08:20:05+00:00");
        assert_eq!(timestamp(&payload, "c"), None);
        assert_eq!(timestamp(&payload, "missing"), None);
    }

    #[test]
    fn parse_resource_requires_type() {
        let cache = IdentityCache::new();
        let err = parse_resource(&json!({ "id": 1 }), &ParseContext::new(&cache)).unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
    }
}
