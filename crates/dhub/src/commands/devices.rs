//! Device list handler: drives a `ResourceListGetter` page by page.

use std::sync::Arc;

use serde_json::Value;
use tabled::Tabled;

use dhub_api::Collection;
use dhub_core::{DeviceListing, FetchOutcome, ProgressIndicator, ResourceListGetter};

use super::HttpResources;
use crate::cli::{DevicesArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

// ── Progress ────────────────────────────────────────────────────────

/// Reports fetches through the tracing subscriber (`-v` to see them).
struct LogProgress;

impl ProgressIndicator for LogProgress {
    fn start(&self) {
        tracing::info!("fetching devices");
    }

    fn complete(&self) {
        tracing::info!("devices received");
    }
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Lots")]
    lots: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "RAM (MB)")]
    ram: String,
    #[tabled(rename = "Storage (MB)")]
    storage: String,
    #[tabled(rename = "Score")]
    score: String,
}

fn size(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.0}")).unwrap_or_default()
}

fn device_row(d: &DeviceListing) -> DeviceRow {
    DeviceRow {
        id: listing_id(d),
        kind: d.type_name.clone(),
        title: d.title.clone(),
        status: d.status.clone(),
        lots: d
            .parent_lots
            .iter()
            .filter(|lot| !lot.is_placeholder())
            .map(|lot| lot.label.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        cpu: d.processor_model.clone().unwrap_or_default(),
        ram: size(d.total_ram_size),
        storage: size(d.total_data_storage_size),
        score: d.score_range.map(|r| r.to_string()).unwrap_or_default(),
    }
}

fn listing_id(d: &DeviceListing) -> String {
    d.id.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn parse_json(field: &str, raw: &str) -> Result<Value, CliError> {
    serde_json::from_str(raw).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: e.to_string(),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(resources: Arc<HttpResources>, args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let sort = parse_json("sort", &args.sort)?;
    let filter = args
        .filter
        .as_deref()
        .map(|raw| parse_json("filter", raw))
        .transpose()?
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    let search_filter = args
        .search_filter
        .as_deref()
        .map(|raw| parse_json("search-filter", raw))
        .transpose()?;

    let getter = ResourceListGetter::with_progress(resources, Collection::Devices, Value::Null, LogProgress);

    // Nothing is fetched until filters and sort are both in; the sort
    // goes last so the first page is requested exactly once.
    if let Some(query) = args.search {
        getter.update_search_query(query).await?;
    }
    if let Some(search_filter) = &search_filter {
        getter.update_filters_from_search(search_filter).await?;
    }
    getter.update_filters("cli", filter).await?;
    let outcome = getter.update_sort(sort).await?;
    if !matches!(outcome, FetchOutcome::Applied(_)) {
        getter.get_resources(false, true).await?;
    }

    let mut fetched = 1;
    while (args.all || fetched < args.pages) && getter.pagination().await.more_pages_available {
        getter.get_resources(true, true).await?;
        fetched += 1;
    }

    let listings = getter.listings().await;
    let out = output::render_list(&global.output, &listings, device_row, listing_id)?;
    output::print_output(&out, global.quiet);

    if matches!(global.output, OutputFormat::Table) && !global.quiet {
        eprintln!(
            "{} of {} devices",
            listings.len(),
            getter.total_number_resources().await
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use dhub_core::{IdentityCache, ListingClass};
    use serde_json::json;

    use super::*;

    #[test]
    fn rows_hide_the_no_lot_placeholder() {
        let cache = IdentityCache::new();
        let listing = DeviceListing::from_payload(
            &json!({
                "id": 7,
                "type": "Laptop",
                "manufacturer": "Lenovo",
                "model": "X1",
                "parent": null,
                "components": []
            }),
            &cache,
        );
        assert_eq!(listing.class, ListingClass::Computer);

        let row = device_row(&listing);
        assert_eq!(row.id, "7");
        assert_eq!(row.kind, "Laptop");
        assert_eq!(row.lots, "");
    }
}
