// ── Filter merging ──
//
// Filters arrive from several sources (sidebar, lot navigation, the search
// widget) and are merged into a single server filter object.

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Source tag of the search widget; it wins over every other source.
pub const SEARCH: &str = "search";

/// Recursively merge `source` into `target`. Objects merge key by key;
/// any other value replaces what was there.
pub fn deep_merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value);
                    }
                    _ => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}

/// Merge every source in insertion order, then `search` again, then the
/// defaults. Defaults can never be overridden.
pub fn merge_sources(by_source: &IndexMap<String, Value>, defaults: &Value) -> Value {
    let mut merged = Value::Object(Map::new());
    for filters in by_source.values() {
        deep_merge(&mut merged, filters);
    }
    if let Some(search) = by_source.get(SEARCH) {
        deep_merge(&mut merged, search);
    }
    if defaults.is_object() {
        deep_merge(&mut merged, defaults);
    }
    merged
}

/// Translate the search widget encoding into server filters.
///
/// Groups flagged `isNested` flatten into dotted paths, `_meta` is dropped,
/// `{min, max}` ranges become `[min, max]`, `brand` is renamed to
/// `manufacturer`, and rating labels become their 1..5 score.
pub fn map_search_filters(filters: &Value) -> Value {
    let mut mapped = Map::new();
    if let Value::Object(filters) = filters {
        map_into(&mut mapped, filters, None);
    }
    Value::Object(mapped)
}

fn map_into(out: &mut Map<String, Value>, filters: &Map<String, Value>, parent: Option<&str>) {
    for (key, value) in filters {
        let mut path = parent.map_or_else(|| key.clone(), |parent| format!("{parent}.{key}"));

        if let Value::Object(group) = value {
            if group.get("isNested").is_some_and(is_truthy) {
                let mut group = group.clone();
                group.remove("isNested");
                map_into(out, &group, Some(&path));
                continue;
            }
        }

        let mut value = value.clone();
        if let Value::Object(object) = &mut value {
            object.remove("_meta");
            let min = object.get("min").cloned().unwrap_or(Value::Null);
            let max = object.get("max").cloned().unwrap_or(Value::Null);
            if is_truthy(&min) || is_truthy(&max) {
                value = Value::Array(vec![min, max]);
            }
        }

        match path.as_str() {
            "brand" => path = "manufacturer".to_owned(),
            "rating.rating" => {
                if let Value::Array(labels) = &value {
                    value = Value::Array(labels.iter().map(rating_score).collect());
                }
            }
            _ => {}
        }
        set_path(out, &path, value);
    }
}

fn rating_score(label: &Value) -> Value {
    match label.as_str() {
        Some("Very low") => 1.into(),
        Some("Low") => 2.into(),
        Some("Medium") => 3.into(),
        Some("High") => 4.into(),
        Some("Very high") => 5.into(),
        _ => Value::Null,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Set `value` at a dotted path, creating intermediate objects.
fn set_path(out: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            out.insert(path.to_owned(), value);
        }
        Some((head, rest)) => {
            let child = out
                .entry(head.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                set_path(child, rest, value);
            }
        }
    }
}
