// ── Device listings ──
//
// Flat, display-ready rows derived from device list payloads: a coarse
// class, a title, the newest event as status, parent lots with labels and
// hardware totals read from the components.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::identity::{EntityId, IdentityCache};
use crate::model::{id, list, number, string, timestamp, RatingRange};
use crate::naming::Naming;

/// Pseudo lot id shown when a device is in no lot.
pub const NO_PARENT: &str = "NoParent";

const COMPONENTS: &[&str] = &[
    "Motherboard",
    "RamModule",
    "SoundCard",
    "GraphicCard",
    "OpticalDrive",
    "HardDrive",
    "SolidStateDrive",
    "Processor",
    "NetworkAdapter",
];
const COMPUTERS: &[&str] = &["Desktop", "Laptop", "Server"];
const DATA_STORAGE: &[&str] = &["DataStorage", "HardDrive", "SolidStateDrive"];
const LOT_TYPES: &[&str] = &["Lot", "Package", "Pallet"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum ListingClass {
    Component,
    Computer,
    Peripheral,
    Placeholder,
}

/// A lot a listed device belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParentLot {
    pub id: String,
    pub label: String,
}

impl ParentLot {
    pub fn is_placeholder(&self) -> bool {
        self.id == NO_PARENT
    }
}

/// One row of a device list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListing {
    pub id: Option<EntityId>,
    pub class: ListingClass,
    pub type_name: String,
    pub title: String,
    pub status: String,
    pub parent_lots: Vec<ParentLot>,
    pub processor_model: Option<String>,
    pub total_ram_size: Option<f64>,
    pub total_data_storage_size: Option<f64>,
    pub score_range: Option<RatingRange>,
    pub created: Option<DateTime<Utc>>,
}

impl DeviceListing {
    /// Build a row from a raw payload. Lot labels are provisional
    /// (`"<id> (Deleted)"`) unless the cache knows the lot's name.
    pub fn from_payload(payload: &Value, cache: &IdentityCache) -> Self {
        let type_name = string(payload, "type").unwrap_or_else(|| "Device".to_owned());
        let class = if type_name == "Device" {
            ListingClass::Placeholder
        } else if COMPONENTS.contains(&type_name.as_str()) {
            ListingClass::Component
        } else if COMPUTERS.contains(&type_name.as_str()) {
            ListingClass::Computer
        } else {
            ListingClass::Peripheral
        };

        let title = if class == ListingClass::Placeholder {
            "Placeholder".to_owned()
        } else {
            let mut parts = vec![type_name.clone()];
            parts.extend(string(payload, "manufacturer").map(|m| Naming::titleize(&m)));
            parts.extend(string(payload, "model").map(|m| Naming::titleize(&m)));
            parts.join(" ")
        };

        let status = list(payload, "events")
            .first()
            .and_then(|event| string(event, "type"))
            .map_or_else(
                || "Registered".to_owned(),
                |t| Naming::pop_prefix(&t).map_or_else(|| t.clone(), |(_, name)| name.to_owned()),
            );

        let components = list(payload, "components");
        let of_type = |types: &'static [&'static str]| {
            components
                .iter()
                .filter(move |c| string(c, "type").is_some_and(|t| types.contains(&t.as_str())))
        };
        let total = |types: &'static [&'static str]| {
            let mut found = of_type(types).peekable();
            found.peek()?;
            Some(found.filter_map(|c| number(c, "size")).sum::<f64>())
        };

        Self {
            id: id(payload, "id"),
            class,
            title,
            status,
            parent_lots: parent_lots(payload, cache),
            processor_model: of_type(&["Processor"]).next().and_then(|c| string(c, "model")),
            total_ram_size: total(&["RamModule"]),
            total_data_storage_size: total(DATA_STORAGE),
            score_range: payload
                .get("rate")
                .and_then(|rate| number(rate, "rating"))
                .map(RatingRange::from_score),
            created: timestamp(payload, "created"),
            type_name,
        }
    }

    /// Lot ids whose label is still provisional.
    pub(crate) fn unlabeled_lots(&self) -> impl Iterator<Item = &str> {
        self.parent_lots
            .iter()
            .filter(|lot| lot.label == provisional_label(&lot.id))
            .map(|lot| lot.id.as_str())
    }

    pub(crate) fn apply_labels(&mut self, labels: &HashMap<String, String>) {
        for lot in &mut self.parent_lots {
            if let Some(label) = labels.get(&lot.id) {
                lot.label.clone_from(label);
            }
        }
    }
}

fn provisional_label(id: &str) -> String {
    format!("{id} (Deleted)")
}

/// Ancestor lots (typed `Lot`, `Package` or `Pallet`) followed by direct
/// lots, without repeats. A device in no lot gets the `Without lot`
/// placeholder.
fn parent_lots(payload: &Value, cache: &IdentityCache) -> Vec<ParentLot> {
    let ancestors = list(payload, "ancestors")
        .iter()
        .filter(|a| string(a, "type").is_some_and(|t| LOT_TYPES.contains(&t.as_str())))
        .filter_map(|a| id(a, "id").or_else(|| id(a, "_id")));
    let direct = list(payload, "lots").iter().filter_map(EntityId::from_ref);

    let mut lots: Vec<ParentLot> = Vec::new();
    for lot_id in ancestors.chain(direct) {
        let key = lot_id.to_string();
        if lots.iter().any(|l| l.id == key) {
            continue;
        }
        let label = cache
            .lots
            .lookup(&lot_id)
            .and_then(|lot| lot.load().name.clone())
            .unwrap_or_else(|| provisional_label(&key));
        lots.push(ParentLot { id: key, label });
    }
    if lots.is_empty() {
        lots.push(ParentLot {
            id: NO_PARENT.to_owned(),
            label: "Without lot".to_owned(),
        });
    }
    lots
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Lot, ParseContext};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SHELF: &str = "00000000-0000-0000-0000-000000000001";
    const GONE: &str = "00000000-0000-0000-0000-000000000002";

    #[test]
    fn computer_row_sums_components() {
        let cache = IdentityCache::new();
        let row = DeviceListing::from_payload(
            &json!({
                "id": 1, "type": "Laptop", "manufacturer": "lenovo", "model": "x1",
                "events": [{ "type": "devices:Ready" }, { "type": "Snapshot" }],
                "components": [
                    { "type": "Processor", "model": "Intel Atom" },
                    { "type": "RamModule", "size": 1024 },
                    { "type": "RamModule", "size": 2048 },
                    { "type": "HardDrive", "size": 500 },
                    { "type": "SolidStateDrive", "size": 250 }
                ],
                "rate": { "type": "AggregateRate", "rating": 4.5 }
            }),
            &cache,
        );
        assert_eq!(row.class, ListingClass::Computer);
        assert_eq!(row.title, "Laptop Lenovo X1");
        assert_eq!(row.status, "Ready");
        assert_eq!(row.processor_model.as_deref(), Some("Intel Atom"));
        assert_eq!(row.total_ram_size, Some(3072.0));
        assert_eq!(row.total_data_storage_size, Some(750.0));
        assert_eq!(row.score_range, Some(RatingRange::High));
        assert_eq!(row.parent_lots, vec![ParentLot { id: NO_PARENT.into(), label: "Without lot".into() }]);
    }

    #[test]
    fn rows_serialize_with_their_score_band() {
        let cache = IdentityCache::new();
        let row = DeviceListing::from_payload(
            &json!({ "id": 5, "type": "Desktop", "rate": { "type": "AggregateRate", "rating": 1.5 } }),
            &cache,
        );
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["scoreRange"], json!("VeryLow"));
        assert_eq!(value["typeName"], json!("Desktop"));
        assert_eq!(value["class"], json!("Computer"));
    }

    #[test]
    fn placeholder_and_peripheral_classes() {
        let cache = IdentityCache::new();
        let placeholder = DeviceListing::from_payload(&json!({ "id": 2, "type": "Device" }), &cache);
        assert_eq!(placeholder.class, ListingClass::Placeholder);
        assert_eq!(placeholder.title, "Placeholder");
        assert_eq!(placeholder.status, "Registered");
        assert_eq!(placeholder.total_ram_size, None);

        let mouse = DeviceListing::from_payload(&json!({ "id": 3, "type": "Mouse" }), &cache);
        assert_eq!(mouse.class, ListingClass::Peripheral);
    }

    #[test]
    fn lot_labels_come_from_cache_or_stay_provisional() {
        let cache = IdentityCache::new();
        Lot::from_object(&json!({ "id": SHELF, "type": "Lot", "name": "Shelf" }), &ParseContext::new(&cache)).unwrap();

        let mut row = DeviceListing::from_payload(
            &json!({
                "id": 4, "type": "Mouse",
                "ancestors": [{ "type": "Lot", "id": SHELF }, { "type": "Device", "id": 9 }],
                "lots": [{ "id": GONE }, { "id": SHELF }]
            }),
            &cache,
        );
        assert_eq!(row.parent_lots.len(), 2);
        assert_eq!(row.parent_lots[0].label, "Shelf");
        assert_eq!(row.unlabeled_lots().collect::<Vec<_>>(), vec![GONE]);

        row.apply_labels(&HashMap::from([(GONE.to_owned(), "Archive".to_owned())]));
        assert_eq!(row.parent_lots[1].label, "Archive");
        assert_eq!(row.unlabeled_lots().count(), 0);
    }
}
