//! Protocol layer for x402: wire payloads, EVM/SVM authorization
//! construction, verification, settlement, batch settlement, the client
//! interceptor, and the server middleware.
//!
//! Chain-specific code lives under [`eip155`] (EVM/EIP-3009/EIP-712) and
//! [`solana`] (SVM/SPL token); everything chain-agnostic (wire types,
//! errors, dispatch) lives at the crate root.

pub mod address;
pub mod batch;
pub mod client;
pub mod codec;
pub mod eip155;
pub mod errors;
pub mod middleware;
pub mod network;
pub mod nonce_manager;
pub mod payload;
pub mod scheme;
pub mod signer_registry;
pub mod solana;
pub mod types;
pub mod utils;

pub use errors::{Result, X402Error};
pub use payload::PaymentPayload;
pub use scheme::{ChainSettler, ChainVerifier, Settler, Verifier};
pub use types::{PaymentRequirements, SettleResponse, VerifyResponse, X402_VERSION};
