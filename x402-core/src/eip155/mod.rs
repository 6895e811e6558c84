//! The "exact" scheme for EIP-155 (EVM) chains: EIP-3009
//! `transferWithAuthorization`, signed by the payer and settled gaslessly by
//! the facilitator.

pub mod client;
pub mod domain;
pub mod erc20;
pub mod settler;
pub mod verifier;
