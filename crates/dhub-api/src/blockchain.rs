// Blockchain collaborator interface.
//
// The smart contracts live outside this workspace; the engine only calls
// these three operations and folds their results into resources.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Proof families a device can accumulate on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofKind {
    Wipe,
    Function,
    Transfer,
    Recycle,
    Reuse,
}

impl ProofKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wipe => "wipe",
            Self::Function => "function",
            Self::Transfer => "transfer",
            Self::Recycle => "recycle",
            Self::Reuse => "reuse",
        }
    }
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `initTransfer` arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitTransfer {
    /// Ethereum address of the sender (and transaction emitter).
    pub sender: String,
    pub receiver: String,
    /// Device ids to deploy into the delivery note.
    pub devices: Vec<Value>,
}

/// `acceptTransfer` arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptTransfer {
    pub deliverynote_address: String,
    pub receiver: String,
    pub deposit: u64,
    pub devices: Vec<Value>,
}

/// Ethereum transaction hashes keyed by device id.
pub type TransferHashes = HashMap<String, String>;

/// `generateProof` arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofRequest {
    pub kind: ProofKind,
    /// Device id the proof is attached to.
    pub device: Value,
    /// Proof-specific payload (erasure steps, rate, receiver, ...).
    pub data: Value,
}

/// Web3-backed service. Implementations are opaque to the engine.
pub trait BlockchainService: Send + Sync {
    /// Deploy the devices and open a delivery note; resolves to its address.
    fn init_transfer(
        &self,
        request: &InitTransfer,
    ) -> impl Future<Output = Result<String, Error>> + Send;

    /// Accept a delivery note; resolves to one transaction hash per device.
    fn accept_transfer(
        &self,
        request: &AcceptTransfer,
    ) -> impl Future<Output = Result<TransferHashes, Error>> + Send;

    /// Generate one proof; resolves to its hash.
    fn generate_proof(
        &self,
        request: &ProofRequest,
    ) -> impl Future<Output = Result<String, Error>> + Send;
}
