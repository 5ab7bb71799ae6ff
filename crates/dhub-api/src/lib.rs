// dhub-api: Async transport for the DeviceHub REST API and blockchain bridge

pub mod blockchain;
pub mod error;
pub mod http;
pub mod models;
pub mod server;

pub use blockchain::{
    AcceptTransfer, BlockchainService, InitTransfer, ProofKind, ProofRequest, TransferHashes,
};
pub use error::Error;
pub use http::{HttpResourceServer, TransportConfig};
pub use models::{Collection, ListQuery, RawList, RawPagination};
pub use server::ResourceServer;
