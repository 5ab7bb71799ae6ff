// In-memory doubles for the collaborator traits.
//
// Replies are queued per (collection, method) and served in order. A reply
// can be gated so a test controls exactly when it resolves.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::oneshot;

use dhub_api::{
    AcceptTransfer, BlockchainService, Collection, Error, InitTransfer, ListQuery, ProofRequest,
    RawList, ResourceServer, TransferHashes,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Method {
    List,
    Get,
    Post,
    Patch,
    Delete,
}

/// A request as the server saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    List { collection: Collection, query: ListQuery },
    Get { collection: Collection, path: String },
    Post { collection: Collection, path: String, body: Value, params: Vec<(String, String)> },
    Patch { collection: Collection, id: String, body: Value },
    Delete { collection: Collection, path: String, params: Vec<(String, String)> },
}

struct Reply {
    result: Result<Value, Error>,
    gate: Option<oneshot::Receiver<()>>,
}

#[derive(Default)]
struct State {
    requests: Vec<Request>,
    replies: HashMap<(Collection, Method), VecDeque<Reply>>,
}

/// Scripted `ResourceServer`. Clones share state; `for_collection` binds
/// a clone to one collection.
#[derive(Clone)]
pub struct MockServer {
    collection: Collection,
    state: Arc<Mutex<State>>,
}

impl MockServer {
    pub fn new() -> Self {
        Self {
            collection: Collection::Devices,
            state: Arc::default(),
        }
    }

    pub fn for_collection(&self, collection: Collection) -> Self {
        Self {
            collection,
            state: Arc::clone(&self.state),
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn list_requests(&self, collection: Collection) -> usize {
        self.requests()
            .iter()
            .filter(|r| matches!(r, Request::List { collection: c, .. } if *c == collection))
            .count()
    }

    fn push(&self, collection: Collection, method: Method, result: Result<Value, Error>, gated: bool) -> Option<oneshot::Sender<()>> {
        let (tx, rx) = oneshot::channel();
        let reply = Reply {
            result,
            gate: gated.then_some(rx),
        };
        self.state
            .lock()
            .unwrap()
            .replies
            .entry((collection, method))
            .or_default()
            .push_back(reply);
        gated.then_some(tx)
    }

    pub fn respond_list(&self, collection: Collection, list: RawList) {
        self.push(collection, Method::List, Ok(serde_json::to_value(list).unwrap()), false);
    }

    /// Queue a list reply that resolves only once the returned sender fires.
    pub fn respond_list_gated(&self, collection: Collection, list: RawList) -> oneshot::Sender<()> {
        self.push(collection, Method::List, Ok(serde_json::to_value(list).unwrap()), true)
            .unwrap()
    }

    pub fn fail_list(&self, collection: Collection, error: Error) {
        self.push(collection, Method::List, Err(error), false);
    }

    /// Queue a failing list reply that resolves only once the returned
    /// sender fires.
    pub fn fail_list_gated(&self, collection: Collection, error: Error) -> oneshot::Sender<()> {
        self.push(collection, Method::List, Err(error), true).unwrap()
    }

    pub fn respond_get(&self, collection: Collection, value: Value) {
        self.push(collection, Method::Get, Ok(value), false);
    }

    pub fn respond_post(&self, collection: Collection, value: Value) {
        self.push(collection, Method::Post, Ok(value), false);
    }

    pub fn respond_delete(&self, collection: Collection, value: Value) {
        self.push(collection, Method::Delete, Ok(value), false);
    }

    fn record(&self, method: Method, request: Request) -> Option<Reply> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request);
        state
            .replies
            .get_mut(&(self.collection, method))
            .and_then(VecDeque::pop_front)
    }

    async fn reply(&self, method: Method, request: Request) -> Result<Value, Error> {
        let Some(reply) = self.record(method, request) else {
            return match method {
                Method::Patch | Method::Delete => Ok(Value::Null),
                _ => Err(Error::Status {
                    status: 404,
                    message: format!("no reply queued for {}", self.collection.path()),
                }),
            };
        };
        if let Some(gate) = reply.gate {
            let _ = gate.await;
        }
        reply.result
    }
}

fn owned(params: &[(&str, String)]) -> Vec<(String, String)> {
    params.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
}

impl ResourceServer for MockServer {
    async fn get_list(&self, query: &ListQuery) -> Result<RawList, Error> {
        let request = Request::List {
            collection: self.collection,
            query: query.clone(),
        };
        let value = self.reply(Method::List, request).await?;
        Ok(serde_json::from_value(value).unwrap())
    }

    async fn get(&self, path: &str) -> Result<Value, Error> {
        let request = Request::Get {
            collection: self.collection,
            path: path.to_owned(),
        };
        self.reply(Method::Get, request).await
    }

    async fn post(&self, body: &Value) -> Result<Value, Error> {
        let request = Request::Post {
            collection: self.collection,
            path: String::new(),
            body: body.clone(),
            params: Vec::new(),
        };
        self.reply(Method::Post, request).await
    }

    async fn post_at(&self, path: &str, body: &Value, params: &[(&str, String)]) -> Result<Value, Error> {
        let request = Request::Post {
            collection: self.collection,
            path: path.to_owned(),
            body: body.clone(),
            params: owned(params),
        };
        self.reply(Method::Post, request).await
    }

    async fn patch(&self, body: &Value, id: &str) -> Result<Value, Error> {
        let request = Request::Patch {
            collection: self.collection,
            id: id.to_owned(),
            body: body.clone(),
        };
        self.reply(Method::Patch, request).await
    }

    async fn delete(&self, path: &str, params: &[(&str, String)]) -> Result<Value, Error> {
        let request = Request::Delete {
            collection: self.collection,
            path: path.to_owned(),
            params: owned(params),
        };
        self.reply(Method::Delete, request).await
    }
}

// ── Blockchain double ───────────────────────────────────────────────

/// Scripted `BlockchainService`. Proof replies are served in order; once
/// the script runs out every proof succeeds with `hash-<device>`.
#[derive(Default)]
pub struct MockChain {
    pub address: String,
    pub hashes: TransferHashes,
    proofs: Mutex<VecDeque<Result<String, Error>>>,
    calls: Mutex<Vec<String>>,
}

impl MockChain {
    pub fn script_proof(&self, result: Result<String, Error>) {
        self.proofs.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl BlockchainService for MockChain {
    async fn init_transfer(&self, request: &InitTransfer) -> Result<String, Error> {
        self.log(format!("init {} -> {}", request.sender, request.receiver));
        Ok(self.address.clone())
    }

    async fn accept_transfer(&self, request: &AcceptTransfer) -> Result<TransferHashes, Error> {
        self.log(format!("accept {}", request.deliverynote_address));
        Ok(self.hashes.clone())
    }

    async fn generate_proof(&self, request: &ProofRequest) -> Result<String, Error> {
        self.log(format!("proof {} {}", request.kind, request.device));
        let scripted = self.proofs.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(format!("hash-{}", request.device)))
    }
}
