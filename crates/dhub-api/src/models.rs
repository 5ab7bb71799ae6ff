// Wire types shared by every DeviceHub collection endpoint.
//
// Resource payloads themselves stay as `serde_json::Value`: the `type`
// discriminator decides how they are read, and that happens in
// `dhub-core`. Only the envelopes and query shapes are typed here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A DeviceHub collection endpoint, relative to the server base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Devices,
    Events,
    Lots,
    Tags,
    Users,
    Proofs,
    DeliveryNotes,
}

impl Collection {
    /// Path segment with a trailing slash, e.g. `devices/`.
    pub fn path(self) -> &'static str {
        match self {
            Self::Devices => "devices/",
            Self::Events => "events/",
            Self::Lots => "lots/",
            Self::Tags => "tags/",
            Self::Users => "users/",
            Self::Proofs => "proofs/",
            Self::DeliveryNotes => "deliverynotes/",
        }
    }
}

/// Pagination block of a list response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPagination {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub total: Option<u64>,
    pub previous: Option<u32>,
    pub next: Option<u32>,
}

impl RawPagination {
    /// Whether the server has pages after this one.
    ///
    /// Prefers the explicit `next` cursor; falls back to comparing
    /// `page * perPage` against `total` when the cursor is absent.
    pub fn has_more(&self) -> bool {
        if self.next.is_some() {
            return true;
        }
        match (self.page, self.per_page, self.total) {
            (Some(page), Some(per_page), Some(total)) => {
                u64::from(page) * u64::from(per_page) < total
            }
            _ => false,
        }
    }
}

/// `GET /{collection}/` response: `{ items, pagination, url }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawList {
    pub items: Vec<Value>,
    pub pagination: RawPagination,
    pub url: Option<String>,
}

/// Query for a list request.
///
/// Serialized as `?filter={json}&search=...&sort={json}&page=N`. Empty
/// parts are omitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filter: Option<Value>,
    pub search: Option<String>,
    pub sort: Option<Value>,
    pub page: Option<u32>,
}

impl ListQuery {
    /// Query selecting resources by id, as used for lot label lookups.
    pub fn by_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Value>,
    {
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        Self {
            filter: Some(serde_json::json!({ "id": ids })),
            ..Self::default()
        }
    }

    /// Flatten into URL query pairs.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(filter) = self.filter.as_ref().filter(|f| !is_empty_value(f)) {
            pairs.push(("filter", filter.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_owned()));
        }
        if let Some(sort) = self.sort.as_ref().filter(|s| !is_empty_value(s)) {
            pairs.push(("sort", sort.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        pairs
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
