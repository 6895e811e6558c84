//! The "exact" scheme for Solana: a facilitator-fee-paid SPL Token
//! `TransferChecked`, partially signed by the payer and completed by the
//! facilitator's fee-payer signature before submission.
//!
//! There is no teacher precedent for this chain family — `niklabh-x402-rs`
//! is EVM-only — so this module is grounded on
//! `other_examples/dbcd8896_qntx-r402__r402-svm-src-exact-client.rs.rs`'s
//! instruction-assembly pattern (compute-unit-limit/price, ATA lookup,
//! `TransferChecked`) instead.

pub mod client;
pub mod settler;
pub mod types;
pub mod verifier;
