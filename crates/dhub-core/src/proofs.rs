// ── Blockchain proofs and transfers ──
//
// Thin orchestration over `BlockchainService`: proof batches, opening a
// delivery note for a lot, and accepting one. Nothing here is rolled back;
// a failure midway leaves every completed on-chain step in place.

use futures_util::future::try_join_all;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use dhub_api::{AcceptTransfer, BlockchainService, Collection, InitTransfer, ProofRequest, ResourceServer};

use crate::error::CoreError;
use crate::identity::{Entity, EntityId};
use crate::model::{DeliveryNote, Lot, ParseContext, Thing, ThingMeta, to_body};
use crate::resources::Resources;

// ── Proof batches ───────────────────────────────────────────────────

/// Generate proofs one after another, stopping at the first failure.
///
/// The error carries the failing index and the hashes already generated.
pub async fn generate_proofs_sequential<B: BlockchainService>(
    service: &B,
    requests: &[ProofRequest],
) -> Result<Vec<String>, CoreError> {
    let mut completed = Vec::with_capacity(requests.len());
    for (index, request) in requests.iter().enumerate() {
        match service.generate_proof(request).await {
            Ok(hash) => {
                debug!(index, kind = %request.kind, "proof generated");
                completed.push(hash);
            }
            Err(err) => {
                warn!(index, completed = completed.len(), "proof batch stopped");
                return Err(CoreError::ProofBatch {
                    index,
                    completed,
                    source: Box::new(err.into()),
                });
            }
        }
    }
    Ok(completed)
}

/// Generate every proof at once. Fails if any of them fails; hashes come
/// back in request order.
pub async fn generate_proofs_concurrent<B: BlockchainService>(
    service: &B,
    requests: &[ProofRequest],
) -> Result<Vec<String>, CoreError> {
    let hashes = try_join_all(requests.iter().map(|request| service.generate_proof(request))).await?;
    Ok(hashes)
}

// ── Proof resources ─────────────────────────────────────────────────

/// Record of one device's transfer, as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProofTransfer {
    #[serde(rename = "type")]
    type_name: &'static str,
    #[serde(rename = "ethereumHash")]
    pub ethereum_hash: Option<String>,
    #[serde(rename = "deviceID")]
    pub device_id: Value,
    #[serde(rename = "supplierID")]
    pub supplier_id: Option<Value>,
    #[serde(rename = "receiverID")]
    pub receiver_id: Option<Value>,
    pub deposit: Option<u64>,
}

impl ProofTransfer {
    pub fn new(device: &EntityId, ethereum_hash: Option<String>, note: &DeliveryNote) -> Self {
        Self {
            type_name: "ProofTransfer",
            ethereum_hash,
            device_id: device.to_value(),
            supplier_id: note.supplier_id.as_ref().map(EntityId::to_value),
            receiver_id: note.receiver_id.as_ref().map(EntityId::to_value),
            deposit: note.deposit,
        }
    }
}

/// Several proofs posted in one request to `proofs/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchProof {
    #[serde(skip)]
    pub id: Option<EntityId>,
    pub proofs: Vec<ProofTransfer>,
    #[serde(skip)]
    pub meta: ThingMeta,
}

impl BatchProof {
    pub fn new(proofs: Vec<ProofTransfer>) -> Self {
        Self {
            proofs,
            ..Self::default()
        }
    }
}

impl Thing for BatchProof {
    const COLLECTION: Collection = Collection::Proofs;

    fn type_name(&self) -> &'static str {
        "BatchProof"
    }

    fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn meta(&self) -> &ThingMeta {
        &self.meta
    }

    fn raw_body(&self) -> Result<Map<String, Value>, CoreError> {
        to_body(self, "BatchProof")
    }

    /// The server answers with the created ids only.
    fn define(&mut self, payload: &Value, _ctx: &ParseContext<'_>) -> Result<(), CoreError> {
        self.id = payload.get("id").and_then(EntityId::from_value);
        self.meta = ThingMeta::parse(payload);
        Ok(())
    }
}

// ── Transfers ───────────────────────────────────────────────────────

/// Transfer of a lot's devices between two parties through a delivery
/// note.
pub struct TransferWorkflow<'a, S, B> {
    resources: &'a Resources<S>,
    chain: &'a B,
}

impl<'a, S: ResourceServer, B: BlockchainService> TransferWorkflow<'a, S, B> {
    pub fn new(resources: &'a Resources<S>, chain: &'a B) -> Self {
        Self { resources, chain }
    }

    fn cached_lot(&self, lot: &EntityId) -> Result<Entity<Lot>, CoreError> {
        self.resources
            .cache()
            .lots
            .lookup(lot)
            .ok_or_else(|| CoreError::LotNotCached { id: lot.to_string() })
    }

    /// Open a delivery note for `devices` and store its address on the
    /// cached lot. Returns the address.
    pub async fn init_transfer(
        &self,
        lot: &EntityId,
        sender: &str,
        receiver: &str,
        devices: &[EntityId],
    ) -> Result<String, CoreError> {
        let entity = self.cached_lot(lot)?;
        let request = InitTransfer {
            sender: sender.to_owned(),
            receiver: receiver.to_owned(),
            devices: devices.iter().map(EntityId::to_value).collect(),
        };
        let address = self.chain.init_transfer(&request).await?;
        debug!(%lot, %address, "delivery note deployed");

        let mut updated = Lot::clone(&entity.load());
        updated
            .deliverynote
            .get_or_insert_with(DeliveryNote::default)
            .ethereum_address = Some(address.clone());
        entity.define(updated);
        Ok(address)
    }

    /// Accept the lot's delivery note for `devices`: accept on chain, post
    /// one transfer proof per device, then mark the note `Accepted`.
    pub async fn accept_delivery_note(&self, lot: &EntityId, devices: &[EntityId]) -> Result<BatchProof, CoreError> {
        let entity = self.cached_lot(lot)?;
        let mut note = entity
            .load()
            .deliverynote
            .clone()
            .ok_or_else(|| CoreError::Invariant {
                message: format!("lot {lot} has no delivery note"),
            })?;
        let (Some(address), Some(receiver)) = (note.ethereum_address.clone(), note.receiver_address.clone()) else {
            return Err(CoreError::Invariant {
                message: format!("delivery note of lot {lot} is not deployed"),
            });
        };

        let request = AcceptTransfer {
            deliverynote_address: address,
            receiver,
            deposit: note.deposit.unwrap_or(0),
            devices: devices.iter().map(EntityId::to_value).collect(),
        };
        let hashes = self.chain.accept_transfer(&request).await?;

        let proofs = devices
            .iter()
            .map(|device| ProofTransfer::new(device, hashes.get(&device.to_string()).cloned(), &note))
            .collect();
        let mut batch = BatchProof::new(proofs);
        self.resources.post(&mut batch).await?;

        note.transfer_state = Some("Accepted".to_owned());
        self.resources.patch(&note, &["transfer_state"]).await?;
        debug!(%lot, proofs = batch.proofs.len(), "delivery note accepted");

        let mut updated = Lot::clone(&entity.load());
        updated.deliverynote = Some(note);
        entity.define(updated);
        Ok(batch)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use dhub_api::ProofKind;

    use super::*;
    use crate::identity::IdentityCache;
    use crate::test_support::{MockChain, MockServer, Request};

    const LOT: &str = "00000000-0000-0000-0000-0000000000d1";

    fn proof(device: i64) -> ProofRequest {
        ProofRequest {
            kind: ProofKind::Wipe,
            device: json!(device),
            data: json!({}),
        }
    }

    fn setup(deliverynote: Value) -> (MockServer, Resources<MockServer>) {
        let server = MockServer::new();
        let resources = Resources::new(Arc::new(IdentityCache::new()), |c| server.for_collection(c));
        Lot::from_object(
            &json!({ "id": LOT, "type": "Lot", "name": "Outgoing", "deliverynote": deliverynote }),
            &resources.context(),
        )
        .unwrap();
        (server, resources)
    }

    #[tokio::test]
    async fn sequential_batch_stops_at_first_failure() {
        let chain = MockChain::default();
        chain.script_proof(Ok("h1".into()));
        chain.script_proof(Err(dhub_api::Error::Blockchain("out of gas".into())));

        let err = generate_proofs_sequential(&chain, &[proof(1), proof(2), proof(3)])
            .await
            .unwrap_err();
        let CoreError::ProofBatch { index, completed, .. } = err else {
            panic!("expected a batch error");
        };
        assert_eq!(index, 1);
        assert_eq!(completed, vec!["h1".to_owned()]);
        assert_eq!(chain.calls().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_batch_keeps_request_order() {
        let chain = MockChain::default();
        let hashes = generate_proofs_concurrent(&chain, &[proof(1), proof(2)]).await.unwrap();
        assert_eq!(hashes, vec!["hash-1".to_owned(), "hash-2".to_owned()]);

        chain.script_proof(Err(dhub_api::Error::Blockchain("rejected".into())));
        assert!(generate_proofs_concurrent(&chain, &[proof(1)]).await.is_err());
    }

    #[tokio::test]
    async fn init_transfer_stores_the_address() {
        let (_, resources) = setup(Value::Null);
        let mut chain = MockChain::default();
        chain.address = "0xnote".into();
        let workflow = TransferWorkflow::new(&resources, &chain);
        let lot = EntityId::from(LOT);

        let address = workflow
            .init_transfer(&lot, "0xsender", "0xreceiver", &[EntityId::from(1)])
            .await
            .unwrap();
        assert_eq!(address, "0xnote");

        let cached = resources.cache().lots.lookup(&lot).unwrap().load();
        let note = cached.deliverynote.as_ref().unwrap();
        assert_eq!(note.ethereum_address.as_deref(), Some("0xnote"));
        assert_eq!(chain.calls(), vec!["init 0xsender -> 0xreceiver".to_owned()]);
    }

    #[tokio::test]
    async fn accepting_posts_proofs_then_patches_the_note() {
        let (server, resources) = setup(json!({
            "id": 7, "type": "Deliverynote", "ethereum_address": "0xnote", "deposit": 50,
            "supplier": { "id": 11 }, "receiver": { "id": 12, "ethereum_address": "0xme" }
        }));
        server.respond_post(Collection::Proofs, json!({ "id": 99, "type": "BatchProof" }));
        let mut chain = MockChain::default();
        chain.hashes.insert("1".to_owned(), "0xh1".to_owned());
        let workflow = TransferWorkflow::new(&resources, &chain);
        let lot = EntityId::from(LOT);

        let batch = workflow
            .accept_delivery_note(&lot, &[EntityId::from(1), EntityId::from(2)])
            .await
            .unwrap();
        assert_eq!(batch.id, Some(EntityId::from(99)));

        let requests = server.requests();
        let Request::Post { collection, body, .. } = &requests[0] else { panic!("expected a post") };
        assert_eq!(*collection, Collection::Proofs);
        assert_eq!(body["type"], "BatchProof");
        assert_eq!(
            body["proofs"][0],
            json!({
                "type": "ProofTransfer", "ethereumHash": "0xh1", "deviceID": 1,
                "supplierID": 11, "receiverID": 12, "deposit": 50
            })
        );
        assert_eq!(body["proofs"][1]["ethereumHash"], Value::Null);
        assert_eq!(
            requests[1],
            Request::Patch {
                collection: Collection::DeliveryNotes,
                id: "7".into(),
                body: json!({ "transfer_state": "Accepted" }),
            }
        );

        let cached = resources.cache().lots.lookup(&lot).unwrap().load();
        assert_eq!(cached.deliverynote.as_ref().unwrap().transfer_state.as_deref(), Some("Accepted"));
    }

    #[tokio::test]
    async fn accepting_without_a_note_is_an_invariant_error() {
        let (server, resources) = setup(Value::Null);
        let chain = MockChain::default();
        let err = TransferWorkflow::new(&resources, &chain)
            .accept_delivery_note(&EntityId::from(LOT), &[])
            .await
            .unwrap_err();
        assert!(err.is_assertion());
        assert!(server.requests().is_empty());
        assert!(chain.calls().is_empty());
    }
}
