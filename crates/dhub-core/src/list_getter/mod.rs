// ── Resource list getter ──
//
// Paginated, filterable, sortable fetch engine over one collection.
// Filters and sort start unset; the first fetch waits until both are known.
// Every fetch is tagged with a generation number at dispatch time, and a
// response is only merged if no newer fetch was dispatched meanwhile.

pub mod filters;
pub mod listing;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use dhub_api::{Collection, ListQuery, RawList, RawPagination, ResourceServer};

use crate::error::CoreError;
use crate::model::{Lot, Thing};
use crate::resource_list::ResourceList;
use crate::resources::Resources;

pub use filters::{SEARCH, deep_merge, map_search_filters, merge_sources};
pub use listing::{DeviceListing, ListingClass, NO_PARENT, ParentLot};

// ── Progress ────────────────────────────────────────────────────────

/// Progress bar collaborator. Completed on success and on superseded
/// responses; on errors the caller owns it.
pub trait ProgressIndicator: Send + Sync {
    fn start(&self);
    fn complete(&self);
}

/// Progress indicator that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressIndicator for NoProgress {
    fn start(&self) {}
    fn complete(&self) {}
}

// ── State ───────────────────────────────────────────────────────────

/// Pagination as seen by list views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub more_pages_available: bool,
    pub pages_available: Option<u64>,
    pub total_resources: Option<u64>,
    pub page_number: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            more_pages_available: true,
            pages_available: None,
            total_resources: None,
            page_number: 1,
        }
    }
}

impl Pagination {
    fn from_raw(raw: &RawPagination, page_number: u32) -> Self {
        let pages_available = match (raw.total, raw.per_page) {
            (Some(total), Some(per_page)) if per_page > 0 => Some(total.div_ceil(u64::from(per_page))),
            _ => None,
        };
        Self {
            more_pages_available: raw.has_more(),
            pages_available,
            total_resources: raw.total,
            page_number,
        }
    }
}

/// What a fetch-triggering call ended up doing.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Filters or sort are not set yet; nothing was fetched.
    NotReady,
    /// Sort did not change; nothing was fetched.
    Unchanged,
    /// The response was merged; this is the resulting list.
    Applied(ResourceList),
    /// A newer fetch was dispatched before this response arrived, so it
    /// was dropped.
    Superseded { generation: u64 },
}

type GettingCallback = Box<dyn Fn(&ResourceList, &Pagination, bool) + Send + Sync>;

struct GetterState {
    filters_by_source: IndexMap<String, Value>,
    filters: Option<Value>,
    sort: Option<Value>,
    query: Option<String>,
    pagination: Pagination,
    total_number_resources: u64,
    resources: ResourceList,
    listings: Vec<DeviceListing>,
    callbacks: Vec<GettingCallback>,
}

/// Request parameters captured at dispatch.
struct Dispatch {
    generation: u64,
    page_number: u32,
    query: ListQuery,
}

// ── Getter ──────────────────────────────────────────────────────────

/// Fetch engine for one collection.
///
/// Shareable behind an `Arc`; the state lock is never held across a
/// network call.
pub struct ResourceListGetter<S, P = NoProgress> {
    resources: Arc<Resources<S>>,
    collection: Collection,
    default_filters: Value,
    progress: P,
    generation: AtomicU64,
    state: Mutex<GetterState>,
}

impl<S: ResourceServer> ResourceListGetter<S, NoProgress> {
    pub fn new(resources: Arc<Resources<S>>, collection: Collection) -> Self {
        Self::with_progress(resources, collection, Value::Null, NoProgress)
    }
}

impl<S: ResourceServer, P: ProgressIndicator> ResourceListGetter<S, P> {
    /// `default_filters` are merged last on every update and always win.
    pub fn with_progress(
        resources: Arc<Resources<S>>,
        collection: Collection,
        default_filters: Value,
        progress: P,
    ) -> Self {
        Self {
            resources,
            collection,
            default_filters,
            progress,
            generation: AtomicU64::new(0),
            state: Mutex::new(GetterState {
                filters_by_source: IndexMap::new(),
                filters: None,
                sort: None,
                query: None,
                pagination: Pagination::default(),
                total_number_resources: 0,
                resources: ResourceList::default(),
                listings: Vec::new(),
                callbacks: Vec::new(),
            }),
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    // ── Updates ──────────────────────────────────────────────────────

    /// Store the filters of `source` and re-merge. Fetches the first page
    /// once sort is set too.
    pub async fn update_filters(&self, source: &str, filters: Value) -> Result<FetchOutcome, CoreError> {
        let ready = {
            let mut state = self.state.lock().await;
            state.filters_by_source.insert(source.to_owned(), filters);
            let merged = merge_sources(&state.filters_by_source, &self.default_filters);
            state.filters = Some(merged);
            state.sort.is_some()
        };
        if ready {
            self.get_resources(false, true).await
        } else {
            Ok(FetchOutcome::NotReady)
        }
    }

    /// Map the search widget encoding and store it as the `search` source.
    pub async fn update_filters_from_search(&self, filters: &Value) -> Result<FetchOutcome, CoreError> {
        self.update_filters(SEARCH, map_search_filters(filters)).await
    }

    /// Set the free-text query. Fetches the first page once filters and
    /// sort are both set.
    pub async fn update_search_query(&self, query: impl Into<String>) -> Result<FetchOutcome, CoreError> {
        let ready = {
            let mut state = self.state.lock().await;
            state.query = Some(query.into());
            state.filters.is_some() && state.sort.is_some()
        };
        if ready {
            self.get_resources(false, true).await
        } else {
            Ok(FetchOutcome::NotReady)
        }
    }

    /// Replace the sort. Fetches when the sort changed and filters are
    /// already set.
    pub async fn update_sort(&self, sort: Value) -> Result<FetchOutcome, CoreError> {
        let (changed, ready) = {
            let mut state = self.state.lock().await;
            let changed = state.sort.as_ref() != Some(&sort);
            state.sort = Some(sort);
            (changed, state.filters.is_some())
        };
        match (ready, changed) {
            (false, _) => Ok(FetchOutcome::NotReady),
            (true, false) => Ok(FetchOutcome::Unchanged),
            (true, true) => self.get_resources(false, true).await,
        }
    }

    /// Register a callback run after every merged fetch with the full
    /// list, the pagination and whether the fetch was a next page.
    pub async fn callback_on_getting<F>(&self, callback: F)
    where
        F: Fn(&ResourceList, &Pagination, bool) + Send + Sync + 'static,
    {
        self.state.lock().await.callbacks.push(Box::new(callback));
    }

    // ── Fetching ─────────────────────────────────────────────────────

    /// Fetch the first page (`next_page == false`) or the next one.
    ///
    /// Asking for a next page when none is left fails with
    /// `CoreError::NoMorePages` before any request is made. Transport
    /// errors propagate and leave the progress indicator to the caller,
    /// unless a newer request already replaced this one.
    pub async fn get_resources(&self, next_page: bool, show_progress: bool) -> Result<FetchOutcome, CoreError> {
        let dispatch = {
            let state = self.state.lock().await;
            if next_page && !state.pagination.more_pages_available {
                return Err(CoreError::NoMorePages);
            }
            let page_number = if next_page {
                state.pagination.page_number + 1
            } else {
                1
            };
            Dispatch {
                generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
                page_number,
                query: ListQuery {
                    filter: state.filters.clone(),
                    search: state.query.clone(),
                    sort: state.sort.clone(),
                    page: Some(page_number),
                },
            }
        };
        if show_progress {
            self.progress.start();
        }
        debug!(
            collection = self.collection.path(),
            generation = dispatch.generation,
            page = dispatch.page_number,
            "fetching resources"
        );

        let raw = match self.resources.server(self.collection).get_list(&dispatch.query).await {
            Ok(raw) => raw,
            Err(_) if self.is_stale(dispatch.generation) => {
                return Ok(self.superseded(dispatch.generation, show_progress));
            }
            Err(err) => return Err(err.into()),
        };
        if self.is_stale(dispatch.generation) {
            return Ok(self.superseded(dispatch.generation, show_progress));
        }

        let listings = if self.collection == Collection::Devices {
            self.device_listings(&raw).await?
        } else {
            Vec::new()
        };

        // Generations are bumped under this lock, so nothing can supersede
        // the response between the check and the merge. Parsing registers
        // devices in the shared cache and must only happen for a current
        // response.
        let mut state = self.state.lock().await;
        if self.is_stale(dispatch.generation) {
            drop(state);
            return Ok(self.superseded(dispatch.generation, show_progress));
        }
        let page = ResourceList::from_server(raw, &self.resources)?;
        let pagination = Pagination::from_raw(&page.pagination, dispatch.page_number);
        state.total_number_resources = pagination.total_resources.unwrap_or(0);
        state.pagination = pagination;
        if next_page {
            state.resources.add(page);
            state.listings.extend(listings);
        } else {
            state.resources.set(page);
            state.listings = listings;
        }
        for callback in &state.callbacks {
            callback(&state.resources, &state.pagination, next_page);
        }
        let list = state.resources.clone();
        drop(state);

        if show_progress {
            self.progress.complete();
        }
        Ok(FetchOutcome::Applied(list))
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    fn superseded(&self, generation: u64, show_progress: bool) -> FetchOutcome {
        debug!(
            collection = self.collection.path(),
            generation, "discarding superseded response"
        );
        if show_progress {
            self.progress.complete();
        }
        FetchOutcome::Superseded { generation }
    }

    /// Rows for a device page, with lot labels backfilled from the lots
    /// collection for every lot the cache could not name. The lookup pages
    /// until the server reports no more results.
    async fn device_listings(&self, raw: &RawList) -> Result<Vec<DeviceListing>, CoreError> {
        let cache = self.resources.cache();
        let mut listings: Vec<DeviceListing> = raw
            .items
            .iter()
            .map(|item| DeviceListing::from_payload(item, cache))
            .collect();

        let missing: BTreeSet<String> = listings
            .iter()
            .flat_map(DeviceListing::unlabeled_lots)
            .map(str::to_owned)
            .collect();
        if missing.is_empty() {
            return Ok(listings);
        }

        debug!(count = missing.len(), "looking up lot labels");
        let mut query = ListQuery::by_ids(missing);
        let mut labels = HashMap::new();
        let mut page_number = 1;
        loop {
            query.page = Some(page_number);
            let found = self.resources.server(Collection::Lots).get_list(&query).await?;
            let ctx = self.resources.context();
            for item in &found.items {
                let lot = Lot::from_object(item, &ctx)?.load();
                if let Some(lot_id) = lot.id() {
                    labels.insert(lot_id.to_string(), lot.title());
                }
            }
            if found.items.is_empty() || !found.pagination.has_more() {
                break;
            }
            page_number += 1;
        }
        for listing in &mut listings {
            listing.apply_labels(&labels);
        }
        Ok(listings)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub async fn resources(&self) -> ResourceList {
        self.state.lock().await.resources.clone()
    }

    /// Display rows of the devices fetched so far (device lists only).
    pub async fn listings(&self) -> Vec<DeviceListing> {
        self.state.lock().await.listings.clone()
    }

    pub async fn pagination(&self) -> Pagination {
        self.state.lock().await.pagination.clone()
    }

    /// Merged filters; `None` until a source has been set.
    pub async fn filters(&self) -> Option<Value> {
        self.state.lock().await.filters.clone()
    }

    pub async fn total_number_resources(&self) -> u64 {
        self.state.lock().await.total_number_resources
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::identity::{EntityId, IdentityCache};
    use crate::test_support::{MockServer, Request};

    #[derive(Default)]
    struct CountingProgress {
        started: AtomicUsize,
        completed: AtomicUsize,
    }

    impl ProgressIndicator for Arc<CountingProgress> {
        fn start(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        fn complete(&self) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn devices(range: std::ops::Range<i64>) -> Vec<Value> {
        range.map(|id| json!({ "id": id, "type": "Mouse" })).collect()
    }

    fn page(items: Vec<Value>, page: u32, per_page: u32, total: u64) -> RawList {
        RawList {
            items,
            pagination: RawPagination {
                page: Some(page),
                per_page: Some(per_page),
                total: Some(total),
                ..RawPagination::default()
            },
            url: None,
        }
    }

    fn setup() -> (MockServer, Arc<ResourceListGetter<MockServer>>) {
        let server = MockServer::new();
        let resources = Arc::new(Resources::new(Arc::new(IdentityCache::new()), |c| server.for_collection(c)));
        let getter = Arc::new(ResourceListGetter::new(resources, Collection::Devices));
        (server, getter)
    }

    async fn ready(getter: &ResourceListGetter<MockServer>) {
        getter.update_sort(json!({ "created": -1 })).await.unwrap();
    }

    #[tokio::test]
    async fn waits_for_filters_and_sort() {
        let (server, getter) = setup();
        assert!(matches!(getter.update_sort(json!({})).await.unwrap(), FetchOutcome::NotReady));
        assert!(server.requests().is_empty());

        server.respond_list(Collection::Devices, page(devices(0..2), 1, 10, 2));
        let outcome = getter.update_filters("sidebar", json!({ "type": ["Mouse"] })).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Applied(ref list) if list.len() == 2));
    }

    #[tokio::test]
    async fn search_query_and_widget_filters_reach_the_server() {
        let (server, getter) = setup();
        server.respond_list(Collection::Devices, page(Vec::new(), 1, 10, 0));
        server.respond_list(Collection::Devices, page(Vec::new(), 1, 10, 0));

        getter.update_search_query("thinkpad").await.unwrap();
        ready(&getter).await;
        getter.update_filters_from_search(&json!({ "brand": ["Lenovo"] })).await.unwrap();
        getter.update_filters("sidebar", json!({ "type": ["Laptop"] })).await.unwrap();

        let Some(Request::List { query, .. }) = server.requests().pop() else { panic!("expected a list request") };
        assert_eq!(query.search.as_deref(), Some("thinkpad"));
        assert_eq!(query.filter, Some(json!({ "manufacturer": ["Lenovo"], "type": ["Laptop"] })));
        assert_eq!(query.sort, Some(json!({ "created": -1 })));
    }

    #[tokio::test]
    async fn filter_precedence_defaults_then_search() {
        let server = MockServer::new();
        let resources = Arc::new(Resources::new(Arc::new(IdentityCache::new()), |c| server.for_collection(c)));
        let getter = ResourceListGetter::with_progress(resources, Collection::Lots, json!({ "x": 4 }), NoProgress);

        getter.update_filters("a", json!({ "x": 1 })).await.unwrap();
        getter.update_filters("b", json!({ "x": 2 })).await.unwrap();
        getter.update_filters(SEARCH, json!({ "x": 3 })).await.unwrap();
        assert_eq!(getter.filters().await.unwrap()["x"], 4);
    }

    #[tokio::test]
    async fn pages_accumulate_in_server_order() {
        let (server, getter) = setup();
        ready(&getter).await;
        server.respond_list(Collection::Devices, page(devices(0..10), 1, 10, 15));
        server.respond_list(Collection::Devices, page(devices(10..15), 2, 10, 15));

        getter.update_filters("sidebar", json!({})).await.unwrap();
        let outcome = getter.get_resources(true, true).await.unwrap();

        let FetchOutcome::Applied(list) = outcome else { panic!("expected applied") };
        let ids: Vec<String> = list.iter().map(|r| r.id().unwrap().to_string()).collect();
        let expected: Vec<String> = (0..15).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);

        let pagination = getter.pagination().await;
        assert_eq!(pagination.total_resources, Some(15));
        assert_eq!(pagination.page_number, 2);
        assert!(!pagination.more_pages_available);
        assert_eq!(getter.total_number_resources().await, 15);
        assert_eq!(getter.listings().await.len(), 15);

        let pages: Vec<Option<u32>> = server
            .requests()
            .iter()
            .filter_map(|r| match r {
                Request::List { query, .. } => Some(query.page),
                _ => None,
            })
            .collect();
        assert_eq!(pages, vec![Some(1), Some(2)]);
    }

    #[tokio::test]
    async fn exhausted_list_fails_without_a_request() {
        let (server, getter) = setup();
        ready(&getter).await;
        server.respond_list(Collection::Devices, page(devices(0..3), 1, 10, 3));
        getter.update_filters("sidebar", json!({})).await.unwrap();
        assert_eq!(server.list_requests(Collection::Devices), 1);

        let err = getter.get_resources(true, true).await.unwrap_err();
        assert!(matches!(err, CoreError::NoMorePages));
        assert_eq!(server.list_requests(Collection::Devices), 1);
    }

    #[tokio::test]
    async fn superseded_response_is_discarded() {
        let (server, getter) = setup();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        getter
            .callback_on_getting(move |_, _, _| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        ready(&getter).await;

        let release = server.respond_list_gated(Collection::Devices, page(devices(0..10), 1, 10, 10));
        server.respond_list(Collection::Devices, page(devices(100..102), 1, 10, 2));

        let first = tokio::spawn({
            let getter = Arc::clone(&getter);
            async move { getter.update_filters("sidebar", json!({ "a": 1 })).await }
        });
        while server.list_requests(Collection::Devices) == 0 {
            tokio::task::yield_now().await;
        }

        let second = getter.update_filters("sidebar", json!({ "a": 2 })).await.unwrap();
        assert!(matches!(second, FetchOutcome::Applied(ref list) if list.len() == 2));

        release.send(()).unwrap();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, FetchOutcome::Superseded { generation: 1 }));

        assert_eq!(getter.resources().await.len(), 2);
        assert_eq!(getter.pagination().await.total_resources, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sort_change_refetches_only_when_changed() {
        let (server, getter) = setup();
        server.respond_list(Collection::Devices, page(devices(0..1), 1, 10, 1));
        server.respond_list(Collection::Devices, page(devices(0..1), 1, 10, 1));

        getter.update_filters("sidebar", json!({})).await.unwrap();
        assert!(matches!(getter.update_sort(json!({ "a": 1 })).await.unwrap(), FetchOutcome::Applied(_)));
        assert!(matches!(getter.update_sort(json!({ "a": 1 })).await.unwrap(), FetchOutcome::Unchanged));
        assert_eq!(server.list_requests(Collection::Devices), 1);
    }

    #[tokio::test]
    async fn progress_is_left_running_on_errors() {
        let server = MockServer::new();
        let resources = Arc::new(Resources::new(Arc::new(IdentityCache::new()), |c| server.for_collection(c)));
        let progress = Arc::new(CountingProgress::default());
        let getter = ResourceListGetter::with_progress(resources, Collection::Events, Value::Null, Arc::clone(&progress));

        server.fail_list(
            Collection::Events,
            dhub_api::Error::Status { status: 500, message: "boom".into() },
        );
        assert!(matches!(getter.update_search_query("disk").await.unwrap(), FetchOutcome::NotReady));
        let err = getter.get_resources(false, true).await.unwrap_err();
        assert!(matches!(err, CoreError::Api { status: Some(500), .. }));
        assert_eq!(progress.started.load(Ordering::SeqCst), 1);
        assert_eq!(progress.completed.load(Ordering::SeqCst), 0);

        server.respond_list(Collection::Events, page(Vec::new(), 1, 10, 0));
        getter.get_resources(false, true).await.unwrap();
        assert_eq!(progress.completed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_lot_labels_are_backfilled() {
        let (server, getter) = setup();
        let lot = "00000000-0000-0000-0000-000000000007";
        server.respond_list(
            Collection::Devices,
            page(vec![json!({ "id": 1, "type": "Mouse", "lots": [{ "id": lot }] })], 1, 10, 1),
        );
        server.respond_list(
            Collection::Lots,
            page(vec![json!({ "id": lot, "type": "Lot", "name": "Donations" })], 1, 10, 1),
        );
        ready(&getter).await;
        getter.update_filters("sidebar", json!({})).await.unwrap();

        let listings = getter.listings().await;
        assert_eq!(listings[0].parent_lots[0].label, "Donations");
        assert!(matches!(
            server.requests().last(),
            Some(Request::List { collection: Collection::Lots, query }) if query.filter == Some(json!({ "id": [lot] }))
        ));
    }

    #[tokio::test]
    async fn superseded_response_leaves_the_cache_alone() {
        let server = MockServer::new();
        let resources = Arc::new(Resources::new(Arc::new(IdentityCache::new()), |c| server.for_collection(c)));
        let getter = Arc::new(ResourceListGetter::new(Arc::clone(&resources), Collection::Devices));
        ready(&getter).await;

        let lot = "00000000-0000-0000-0000-000000000008";
        server.respond_list(
            Collection::Devices,
            page(vec![json!({ "id": 1, "type": "Laptop", "model": "old", "lots": [{ "id": lot }] })], 1, 10, 1),
        );
        let release = server.respond_list_gated(
            Collection::Lots,
            page(vec![json!({ "id": lot, "type": "Lot", "name": "Shelf" })], 1, 10, 1),
        );
        server.respond_list(
            Collection::Devices,
            page(vec![json!({ "id": 1, "type": "Laptop", "model": "new" })], 1, 10, 1),
        );

        let first = tokio::spawn({
            let getter = Arc::clone(&getter);
            async move { getter.update_filters("sidebar", json!({ "a": 1 })).await }
        });
        while server.list_requests(Collection::Lots) == 0 {
            tokio::task::yield_now().await;
        }

        let second = getter.update_filters("sidebar", json!({ "a": 2 })).await.unwrap();
        assert!(matches!(second, FetchOutcome::Applied(_)));

        release.send(()).unwrap();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, FetchOutcome::Superseded { generation: 1 }));

        let device = resources.cache().devices.lookup(&EntityId::from(1_i64)).unwrap();
        assert_eq!(device.load().model.as_deref(), Some("New"));
        let listings = getter.listings().await;
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].title, "Laptop New");
    }

    #[tokio::test]
    async fn superseded_failure_is_not_reported() {
        let (server, getter) = setup();
        ready(&getter).await;
        let release = server.fail_list_gated(
            Collection::Devices,
            dhub_api::Error::Status { status: 502, message: "bad gateway".into() },
        );
        server.respond_list(Collection::Devices, page(devices(0..2), 1, 10, 2));

        let first = tokio::spawn({
            let getter = Arc::clone(&getter);
            async move { getter.update_filters("sidebar", json!({ "a": 1 })).await }
        });
        while server.list_requests(Collection::Devices) == 0 {
            tokio::task::yield_now().await;
        }

        let second = getter.update_filters("sidebar", json!({ "a": 2 })).await.unwrap();
        assert!(matches!(second, FetchOutcome::Applied(ref list) if list.len() == 2));

        release.send(()).unwrap();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, FetchOutcome::Superseded { generation: 1 }));
        assert_eq!(getter.resources().await.len(), 2);
    }

    #[tokio::test]
    async fn lot_label_lookup_reads_every_page() {
        let (server, getter) = setup();
        let shelf = "00000000-0000-0000-0000-000000000011";
        let archive = "00000000-0000-0000-0000-000000000012";
        server.respond_list(
            Collection::Devices,
            page(
                vec![json!({ "id": 1, "type": "Mouse", "lots": [{ "id": shelf }, { "id": archive }] })],
                1,
                10,
                1,
            ),
        );
        server.respond_list(
            Collection::Lots,
            page(vec![json!({ "id": shelf, "type": "Lot", "name": "Shelf" })], 1, 1, 2),
        );
        server.respond_list(
            Collection::Lots,
            page(vec![json!({ "id": archive, "type": "Lot", "name": "Archive" })], 2, 1, 2),
        );
        ready(&getter).await;
        getter.update_filters("sidebar", json!({})).await.unwrap();

        let labels: Vec<String> = getter.listings().await[0]
            .parent_lots
            .iter()
            .map(|lot| lot.label.clone())
            .collect();
        assert_eq!(labels, vec!["Shelf".to_owned(), "Archive".to_owned()]);

        let lot_pages: Vec<Option<u32>> = server
            .requests()
            .iter()
            .filter_map(|r| match r {
                Request::List { collection: Collection::Lots, query } => Some(query.page),
                _ => None,
            })
            .collect();
        assert_eq!(lot_pages, vec![Some(1), Some(2)]);
    }
}
