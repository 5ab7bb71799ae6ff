// Collaborator interface for a DeviceHub collection.
//
// The core engine is generic over this trait so it can run against the
// HTTP implementation or an in-memory double in tests.

use std::future::Future;

use serde_json::Value;

use crate::error::Error;
use crate::models::{ListQuery, RawList};

/// One DeviceHub collection endpoint (`/devices/`, `/lots/`, ...).
///
/// `path` arguments are relative to the collection, e.g. `"{id}/children"`.
pub trait ResourceServer: Send + Sync {
    /// `GET /{collection}/?filter=..&search=..`
    fn get_list(&self, query: &ListQuery) -> impl Future<Output = Result<RawList, Error>> + Send;

    /// `GET /{collection}/{path}`
    fn get(&self, path: &str) -> impl Future<Output = Result<Value, Error>> + Send;

    /// `POST /{collection}/` with a JSON body.
    fn post(&self, body: &Value) -> impl Future<Output = Result<Value, Error>> + Send;

    /// `POST /{collection}/{path}?{params}` with a JSON body.
    fn post_at(
        &self,
        path: &str,
        body: &Value,
        params: &[(&str, String)],
    ) -> impl Future<Output = Result<Value, Error>> + Send;

    /// `PATCH /{collection}/{id}` with only the changed fields.
    fn patch(&self, body: &Value, id: &str) -> impl Future<Output = Result<Value, Error>> + Send;

    /// `DELETE /{collection}/{path}?{params}`
    fn delete(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> impl Future<Output = Result<Value, Error>> + Send;
}
