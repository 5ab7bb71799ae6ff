// ── Lot tree ──
//
// Navigation view over lots. The server sends the lots keyed by id plus a
// nested `tree` of ids; nodes only carry ids and resolve their lot through
// the identity cache on demand.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use dhub_api::{Collection, ResourceServer};

use crate::error::CoreError;
use crate::identity::{Entity, EntityId, IdentityCache};
use crate::model::Lot;
use crate::resources::Resources;

/// One node of the lot tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotNode {
    pub id: EntityId,
    pub nodes: Vec<LotNode>,
    pub is_visible: bool,
}

#[derive(Deserialize)]
struct RawNode {
    id: Value,
    #[serde(default)]
    nodes: Vec<RawNode>,
}

impl LotNode {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            nodes: Vec::new(),
            is_visible: true,
        }
    }

    fn from_raw(raw: RawNode) -> Result<Self, CoreError> {
        let id = EntityId::from_value(&raw.id)
            .ok_or_else(|| CoreError::parse("lot tree", format!("bad node id {}", raw.id)))?;
        let nodes = raw
            .nodes
            .into_iter()
            .map(Self::from_raw)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            id,
            nodes,
            is_visible: true,
        })
    }

    /// The cached lot of this node. A miss means the cache fell out of
    /// sync with the tree and is reported, never repaired.
    pub fn lot(&self, cache: &IdentityCache) -> Result<Entity<Lot>, CoreError> {
        cache.lots.lookup(&self.id).ok_or_else(|| CoreError::LotNotCached {
            id: self.id.to_string(),
        })
    }

    pub fn has_text(&self, text: &str, cache: &IdentityCache) -> Result<bool, CoreError> {
        Ok(self.lot(cache)?.load().has_text(text))
    }

    /// Post-order: visible when the lot matches or any descendant does.
    fn update_visibility(&mut self, text: &str, cache: &IdentityCache) -> Result<bool, CoreError> {
        let mut any_child = false;
        for node in &mut self.nodes {
            any_child |= node.update_visibility(text, cache)?;
        }
        self.is_visible = any_child || self.has_text(text, cache)?;
        Ok(self.is_visible)
    }

    fn show_all(&mut self) {
        self.is_visible = true;
        for node in &mut self.nodes {
            node.show_all();
        }
    }
}

/// Every lot of the inventory plus the navigation tree.
#[derive(Debug, Clone)]
pub struct Lots {
    pub lots: Vec<Entity<Lot>>,
    pub tree: Vec<LotNode>,
    pub url: Option<String>,
}

impl Lots {
    /// Build from a `GET /lots/` payload, registering every lot in the
    /// cache.
    pub fn from_server<S: ResourceServer>(payload: &Value, resources: &Resources<S>) -> Result<Self, CoreError> {
        let ctx = resources.context();
        let lots = match payload.get("items") {
            Some(Value::Object(items)) => items
                .values()
                .map(|item| Lot::from_object(item, &ctx))
                .collect::<Result<Vec<_>, _>>()?,
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| Lot::from_object(item, &ctx))
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };
        let raw_tree: Vec<RawNode> = match payload.get("tree") {
            Some(tree) => Vec::<RawNode>::deserialize(tree).map_err(|e| CoreError::parse("lot tree", e))?,
            None => Vec::new(),
        };
        let tree = raw_tree
            .into_iter()
            .map(LotNode::from_raw)
            .collect::<Result<_, _>>()?;
        let url = payload.get("url").and_then(Value::as_str).map(str::to_owned);
        debug!(lots = lots.len(), "lot tree loaded");
        Ok(Self { lots, tree, url })
    }

    /// Fetch the whole lot tree.
    pub async fn fetch<S: ResourceServer>(resources: &Resources<S>) -> Result<Self, CoreError> {
        let payload = resources.server(Collection::Lots).get("").await?;
        Self::from_server(&payload, resources)
    }

    /// Recompute node visibility for `text`. An empty text shows every
    /// node.
    pub fn make_nodes_with_text_visible(&mut self, text: &str, cache: &IdentityCache) -> Result<(), CoreError> {
        if text.is_empty() {
            self.tree.iter_mut().for_each(LotNode::show_all);
            return Ok(());
        }
        for node in &mut self.tree {
            node.update_visibility(text, cache)?;
        }
        Ok(())
    }

    /// Flat filter over the lot list, ignoring the hierarchy.
    pub fn filter_lots(&self, text: &str) -> Vec<Entity<Lot>> {
        self.lots
            .iter()
            .filter(|lot| text.is_empty() || lot.load().has_text(text))
            .cloned()
            .collect()
    }

    /// Lots that are delivery notes.
    pub fn delivery_notes(&self) -> Vec<Entity<Lot>> {
        self.lots
            .iter()
            .filter(|lot| lot.load().deliverynote.is_some())
            .cloned()
            .collect()
    }

    /// Lots that are not delivery notes.
    pub fn temporary(&self) -> Vec<Entity<Lot>> {
        self.lots
            .iter()
            .filter(|lot| lot.load().deliverynote.is_none())
            .cloned()
            .collect()
    }

    /// Add a root node for a lot created after the tree was fetched.
    pub fn add_to_tree(&mut self, lot_id: EntityId) {
        self.tree.push(LotNode::new(lot_id));
    }

    /// Root nodes that are currently visible.
    pub fn visible_roots(&self) -> impl Iterator<Item = &LotNode> {
        self.tree.iter().filter(|node| node.is_visible)
    }
}
