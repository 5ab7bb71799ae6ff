use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use dhub_api::Collection;

use super::{id, list, string, to_body, typed, ParseContext, Thing, ThingMeta};
use crate::error::CoreError;
use crate::identity::EntityId;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Option<EntityId>,
    pub email: Option<String>,
    pub individuals: Vec<Value>,
    pub name: Option<String>,
    #[serde(skip)]
    pub token: Option<SecretString>,
    pub inventories: Vec<Inventory>,
    #[serde(flatten)]
    pub meta: ThingMeta,
}

/// An inventory the user has access to, with its tag provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Inventory {
    pub id: Option<String>,
    pub name: Option<String>,
    pub tag_provider: Option<String>,
    #[serde(skip_serializing)]
    pub tag_token: Option<String>,
}

impl User {
    pub fn parse(payload: &Value, _ctx: &ParseContext<'_>) -> Result<Self, CoreError> {
        let inventories = list(payload, "inventories")
            .iter()
            .map(|inventory| typed::<Inventory>(inventory, "Inventory"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: id(payload, "id"),
            email: string(payload, "email"),
            individuals: list(payload, "individuals").to_vec(),
            name: string(payload, "name"),
            token: string(payload, "token").map(SecretString::from),
            inventories,
            meta: ThingMeta::parse(payload),
        })
    }
}

impl Thing for User {
    const COLLECTION: Collection = Collection::Users;

    fn type_name(&self) -> &'static str {
        "User"
    }

    fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn meta(&self) -> &ThingMeta {
        &self.meta
    }

    fn title(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.type_human())
    }

    fn raw_body(&self) -> Result<Map<String, Value>, CoreError> {
        to_body(self, "User")
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
    use crate::identity::IdentityCache;
    use secrecy::ExposeSecret;
    use serde_json::json;

    #[test]
    fn title_falls_back_to_email() {
        let cache = IdentityCache::new();
        let user = User::parse(
            &json!({ "id": "u1", "email": "a@example.org", "token": "s3cr3t",
                     "inventories": [{ "id": "db1", "name": "Main", "tagProvider": "https://tags.example.org" }] }),
            &ParseContext::new(&cache),
        )
        .unwrap();
        assert_eq!(user.title(), "a@example.org");
        assert_eq!(user.token.as_ref().unwrap().expose_secret(), "s3cr3t");
        assert_eq!(user.inventories[0].tag_provider.as_deref(), Some("https://tags.example.org"));
    }

    #[test]
    fn token_is_never_serialized() {
        let cache = IdentityCache::new();
        let user = User::parse(&json!({ "email": "a@example.org", "token": "s3cr3t" }), &ParseContext::new(&cache)).unwrap();
        let body = user.post_body().unwrap();
        assert!(body.get("token").is_none());
        assert_eq!(body["type"], "User");
    }
}
