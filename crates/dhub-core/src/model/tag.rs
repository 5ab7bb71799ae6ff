use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use dhub_api::Collection;

use super::device::device_ref;
use super::{boolean, id, string, to_body, Device, ParseContext, Thing, ThingMeta};
use crate::error::CoreError;
use crate::identity::{EntityId, IdentityCache, Relation};

/// Identifier label physically attached to a device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub id: EntityId,
    pub org: Option<String>,
    pub secondary: Option<String>,
    pub printable: Option<bool>,
    #[serde(skip)]
    device: Option<EntityId>,
    #[serde(skip)]
    pub url: Option<Url>,
    /// Base URL of the tag provider.
    #[serde(skip)]
    pub provider: Option<Url>,
    /// The tag's own URL at the provider.
    #[serde(skip)]
    pub provider_url: Option<Url>,
    #[serde(skip)]
    pub meta: ThingMeta,
}

impl Tag {
    pub fn parse(payload: &Value, ctx: &ParseContext<'_>) -> Result<Self, CoreError> {
        let tag_id = id(payload, "id").ok_or_else(|| CoreError::Invariant {
            message: "Tag requires an ID.".into(),
        })?;
        let provider = string(payload, "provider").and_then(|p| Url::parse(&p).ok());
        let provider_url = provider
            .as_ref()
            .and_then(|p| p.join(&tag_id.to_string()).ok());
        let url = match string(payload, "url") {
            Some(raw) => ctx.url(&raw),
            None => ctx.base_url.cloned(),
        };
        Ok(Self {
            org: org(payload),
            secondary: string(payload, "secondary"),
            printable: boolean(payload, "printable"),
            device: device_ref(payload.get("device"), ctx)?,
            url,
            provider,
            provider_url,
            meta: ThingMeta::parse(payload),
            id: tag_id,
        })
    }

    pub fn device(&self, cache: &IdentityCache) -> Option<Relation<Device>> {
        self.device.as_ref().map(|id| cache.devices.relation(id))
    }

    /// URL to print on the label: the provider's if known, else ours.
    pub fn printable_url(&self) -> Option<&Url> {
        self.provider_url.as_ref().or(self.url.as_ref())
    }
}

/// The organization comes either as a name or as an embedded object.
fn org(payload: &Value) -> Option<String> {
    match payload.get("org")? {
        org @ Value::Object(_) => string(org, "name"),
        _ => string(payload, "org"),
    }
}

impl Thing for Tag {
    const COLLECTION: Collection = Collection::Tags;

    fn type_name(&self) -> &'static str {
        "Tag"
    }

    fn id(&self) -> Option<&EntityId> {
        Some(&self.id)
    }

    fn meta(&self) -> &ThingMeta {
        &self.meta
    }

    /// Uppercased id; the first hyphen becomes non-breaking.
    fn title(&self) -> String {
        self.id.to_string().to_uppercase().replacen('-', "\u{2011}", 1)
    }

    fn raw_body(&self) -> Result<Map<String, Value>, CoreError> {
        to_body(self, "Tag")
    }

    fn define(&mut self, payload: &Value, ctx: &ParseContext<'_>) -> Result<(), CoreError> {
        *self = Self::parse(payload, ctx)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requires_an_id() {
        let cache = IdentityCache::new();
        let err = Tag::parse(&json!({ "type": "Tag" }), &ParseContext::new(&cache)).unwrap_err();
        assert!(err.is_assertion());
    }

    #[test]
    fn provider_url_wins_for_printing() {
        let cache = IdentityCache::new();
        let base = Url::parse("https://hub.example.org/db1/").unwrap();
        let ctx = ParseContext::new(&cache).with_base_url(&base);

        let local = Tag::parse(&json!({ "id": "a-1", "url": "tags/a-1" }), &ctx).unwrap();
        assert_eq!(local.printable_url().unwrap().as_str(), "https://hub.example.org/db1/tags/a-1");

        let remote = Tag::parse(
            &json!({ "id": "a-1", "url": "tags/a-1", "provider": "https://tags.example.org/" }),
            &ctx,
        )
        .unwrap();
        assert_eq!(remote.printable_url().unwrap().as_str(), "https://tags.example.org/a-1");
    }

    #[test]
    fn title_uses_non_breaking_hyphen_once() {
        let cache = IdentityCache::new();
        let tag = Tag::parse(&json!({ "id": "ab-12-c", "org": { "name": "Acme" } }), &ParseContext::new(&cache)).unwrap();
        assert_eq!(tag.title(), "AB\u{2011}12-C");
        assert_eq!(tag.org.as_deref(), Some("Acme"));
    }

    #[test]
    fn device_relation_is_lazy() {
        let cache = IdentityCache::new();
        let tag = Tag::parse(&json!({ "id": "t1", "device": 5 }), &ParseContext::new(&cache)).unwrap();
        assert!(matches!(tag.device(&cache), Some(Relation::Unresolved(EntityId::Numeric(5)))));
    }
}
