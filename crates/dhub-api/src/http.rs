// HTTP implementation of `ResourceServer`
//
// Wraps `reqwest::Client` with DeviceHub URL construction (base URL,
// optional inventory database segment, collection path), token auth,
// and response-status mapping.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::{Collection, ListQuery, RawList};
use crate::server::ResourceServer;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Session token, sent as `Authorization: Basic <token>`.
    pub token: Option<SecretString>,
    /// Accept self-signed certificates (local DeviceHub instances).
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            token: None,
            accept_invalid_certs: false,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(&format!("Basic {}", token.expose_secret()))
                .map_err(|e| Error::Authentication {
                    message: format!("token is not a valid header value: {e}"),
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("dhub/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()
            .map_err(Error::Transport)
    }
}

/// HTTP client for a single DeviceHub collection.
///
/// Cheap to clone: `reqwest::Client` is reference-counted, so one client
/// can back every collection of a session.
#[derive(Debug, Clone)]
pub struct HttpResourceServer {
    http: reqwest::Client,
    base_url: Url,
    collection: Collection,
}

impl HttpResourceServer {
    /// Create a server for `collection` under `base_url`.
    ///
    /// When `database` is set, it is inserted as the first path segment
    /// (`https://host/{database}/devices/`), matching inventories that are
    /// not the server default.
    pub fn new(
        base_url: &Url,
        database: Option<&str>,
        collection: Collection,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url, database, collection)
    }

    /// Create a server sharing an existing `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &Url,
        database: Option<&str>,
        collection: Collection,
    ) -> Result<Self, Error> {
        let mut base = with_trailing_slash(base_url.as_str());
        if let Some(db) = database.filter(|db| !db.is_empty()) {
            base = format!("{base}{}/", db.trim_matches('/'));
        }
        Ok(Self {
            http,
            base_url: Url::parse(&base)?,
            collection,
        })
    }

    /// The same client and base URL, pointed at another collection.
    pub fn for_collection(&self, collection: Collection) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            collection,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Build `{base}{collection}{path}`.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        let collection = self.base_url.join(self.collection.path())?;
        Ok(collection.join(path.trim_start_matches('/'))?)
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Value, Error> {
        let resp = builder.send().await.map_err(Error::Transport)?;
        parse_response(resp).await
    }
}

impl ResourceServer for HttpResourceServer {
    async fn get_list(&self, query: &ListQuery) -> Result<RawList, Error> {
        let url = self.url("")?;
        let pairs = query.to_pairs();
        debug!(%url, ?pairs, "GET list");
        let body = self.send(self.http.get(url).query(&pairs)).await?;
        serde_json::from_value(body.clone()).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.to_string(),
        })
    }

    async fn get(&self, path: &str) -> Result<Value, Error> {
        let url = self.url(path)?;
        debug!(%url, "GET");
        self.send(self.http.get(url)).await
    }

    async fn post(&self, body: &Value) -> Result<Value, Error> {
        let url = self.url("")?;
        debug!(%url, "POST");
        self.send(self.http.post(url).json(body)).await
    }

    async fn post_at(
        &self,
        path: &str,
        body: &Value,
        params: &[(&str, String)],
    ) -> Result<Value, Error> {
        let url = self.url(path)?;
        debug!(%url, ?params, "POST");
        self.send(self.http.post(url).query(params).json(body)).await
    }

    async fn patch(&self, body: &Value, id: &str) -> Result<Value, Error> {
        let url = self.url(id)?;
        debug!(%url, "PATCH");
        self.send(self.http.patch(url).json(body)).await
    }

    async fn delete(&self, path: &str, params: &[(&str, String)]) -> Result<Value, Error> {
        let url = self.url(path)?;
        debug!(%url, ?params, "DELETE");
        self.send(self.http.delete(url).query(params)).await
    }
}

/// Map the HTTP status and decode the JSON body.
///
/// `204 No Content` and empty bodies decode to `Value::Null`.
async fn parse_response(resp: reqwest::Response) -> Result<Value, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: "token expired or invalid".into(),
        });
    }

    let body = resp.text().await.map_err(Error::Transport)?;

    if !status.is_success() {
        return Err(Error::Status {
            status: status.as_u16(),
            message: preview(&body).to_owned(),
        });
    }

    if body.trim().is_empty() {
        trace!(%status, "empty response body");
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body,
    })
}

fn preview(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    &body[..end]
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_owned()
    } else {
        format!("{url}/")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn server(base: &str, db: Option<&str>) -> HttpResourceServer {
        HttpResourceServer::with_client(
            reqwest::Client::new(),
            &Url::parse(base).unwrap(),
            db,
            Collection::Lots,
        )
        .unwrap()
    }

    #[test]
    fn url_joins_collection_and_path() {
        let s = server("http://127.0.0.1:5000", None);
        assert_eq!(
            s.url("abc/children").unwrap().as_str(),
            "http://127.0.0.1:5000/lots/abc/children"
        );
        assert_eq!(s.url("").unwrap().as_str(), "http://127.0.0.1:5000/lots/");
    }

    #[test]
    fn url_includes_database_segment() {
        let s = server("http://127.0.0.1:5000/", Some("/db1/"));
        assert_eq!(s.url("").unwrap().as_str(), "http://127.0.0.1:5000/db1/lots/");
        let devices = s.for_collection(Collection::Devices);
        assert_eq!(
            devices.url("7").unwrap().as_str(),
            "http://127.0.0.1:5000/db1/devices/7"
        );
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        assert_eq!(preview(&long).chars().count(), 200);
        assert_eq!(preview("short"), "short");
    }
}
