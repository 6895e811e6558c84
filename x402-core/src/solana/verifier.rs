//! SVM verifier: introspects a partially-signed transfer transaction's
//! instruction list and simulates it against the RPC before the
//! facilitator agrees to cosign.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSimulateTransactionConfig;
use solana_sdk::compute_budget;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use std::str::FromStr;

use crate::errors::{Result, X402Error};
use crate::payload::{ChainPayload, PaymentPayload};
use crate::scheme::ChainVerifier;
use crate::solana::types::fetch_mint;
use crate::types::{PaymentRequirements, VerifyResponse};
use async_trait::async_trait;

/// Discriminator byte for `ComputeBudgetInstruction::SetComputeUnitLimit`.
const SET_COMPUTE_UNIT_LIMIT_TAG: u8 = 2;
/// Discriminator byte for `ComputeBudgetInstruction::SetComputeUnitPrice`.
const SET_COMPUTE_UNIT_PRICE_TAG: u8 = 3;
/// Maximum allowed priority fee, in micro-lamports per compute unit.
const MAX_COMPUTE_UNIT_PRICE: u64 = 5;

/// An SVM verifier bound to one RPC endpoint.
pub struct SvmVerifier {
    rpc_client: RpcClient,
}

impl SvmVerifier {
    pub fn new(rpc_url: &str) -> Self {
        SvmVerifier {
            rpc_client: RpcClient::new(rpc_url.to_string()),
        }
    }

    fn decode_transaction(transaction_b64: &str) -> Result<Transaction> {
        let bytes = BASE64
            .decode(transaction_b64)
            .map_err(X402Error::Base64Error)?;
        bincode::deserialize(&bytes)
            .map_err(|e| X402Error::InvalidPayload(format!("not a valid transaction: {e}")))
    }
}

#[async_trait]
impl ChainVerifier for SvmVerifier {
    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse> {
        let svm = match &payload.payload {
            ChainPayload::Svm(svm) => svm,
            ChainPayload::Evm(_) => {
                return Err(X402Error::InvalidNetwork(
                    "EVM payload presented against SVM requirements".into(),
                ))
            }
        };

        if payload.scheme != requirements.scheme {
            return Ok(VerifyResponse::invalid("invalid_scheme", None));
        }
        if payload.network != requirements.network {
            return Ok(VerifyResponse::invalid("invalid_network", None));
        }

        let tx = match Self::decode_transaction(&svm.transaction) {
            Ok(tx) => tx,
            Err(_) => return Ok(VerifyResponse::invalid("invalid_payload", None)),
        };

        let instructions = &tx.message.instructions;
        if instructions.is_empty() || instructions.len() > 4 {
            return Ok(VerifyResponse::invalid("invalid_instructions", None));
        }

        let account_keys = &tx.message.account_keys;
        let compute_budget_program = compute_budget::id();

        let mut saw_compute_limit = false;
        let mut saw_compute_price = false;
        let mut transfer_checked_accounts: Option<(Pubkey, Pubkey, Pubkey, Pubkey)> = None;
        let mut amount_seen: Option<u64> = None;
        let mut decimals_seen: Option<u8> = None;
        let mut ata_creation_target: Option<Pubkey> = None;

        for ix in instructions {
            let program_id = account_keys[ix.program_id_index as usize];
            if program_id == compute_budget_program {
                match ix.data.first() {
                    Some(&SET_COMPUTE_UNIT_LIMIT_TAG) => saw_compute_limit = true,
                    Some(&SET_COMPUTE_UNIT_PRICE_TAG) => {
                        saw_compute_price = true;
                        if ix.data.len() >= 9 {
                            let mut price_bytes = [0u8; 8];
                            price_bytes.copy_from_slice(&ix.data[1..9]);
                            let price = u64::from_le_bytes(price_bytes);
                            if price > MAX_COMPUTE_UNIT_PRICE {
                                return Ok(VerifyResponse::invalid("invalid_instructions", None));
                            }
                        }
                    }
                    _ => return Ok(VerifyResponse::invalid("invalid_instructions", None)),
                }
            } else if program_id == spl_associated_token_account::id() {
                let accounts: Vec<Pubkey> = ix
                    .accounts
                    .iter()
                    .map(|i| account_keys[*i as usize])
                    .collect();
                if let Some(wallet) = accounts.get(2) {
                    ata_creation_target = Some(*wallet);
                }
            } else if program_id == spl_token::id() {
                if ix.data.first() != Some(&12u8) {
                    // 12 == TransferChecked discriminator
                    return Ok(VerifyResponse::invalid("invalid_instructions", None));
                }
                let accounts: Vec<Pubkey> = ix
                    .accounts
                    .iter()
                    .map(|i| account_keys[*i as usize])
                    .collect();
                if accounts.len() < 4 {
                    return Ok(VerifyResponse::invalid("invalid_instructions", None));
                }
                transfer_checked_accounts = Some((accounts[0], accounts[1], accounts[2], accounts[3]));
                if ix.data.len() >= 10 {
                    let mut amount_bytes = [0u8; 8];
                    amount_bytes.copy_from_slice(&ix.data[1..9]);
                    amount_seen = Some(u64::from_le_bytes(amount_bytes));
                    decimals_seen = Some(ix.data[9]);
                }
            } else {
                return Ok(VerifyResponse::invalid("invalid_instructions", None));
            }
        }

        if !saw_compute_limit || !saw_compute_price {
            return Ok(VerifyResponse::invalid("invalid_instructions", None));
        }

        let (source_ata, mint_account, destination_ata, authority) = match transfer_checked_accounts {
            Some(accounts) => accounts,
            None => return Ok(VerifyResponse::invalid("invalid_instructions", None)),
        };
        let payer = authority.to_string();

        let expected_mint = match requirements.asset.parse::<crate::address::SvmAddress>() {
            Ok(addr) => addr.inner(),
            Err(_) => return Ok(VerifyResponse::invalid("invalid_asset", Some(payer))),
        };
        if mint_account != expected_mint {
            return Ok(VerifyResponse::invalid("invalid_asset", Some(payer)));
        }

        let expected_destination_owner = match requirements.pay_to.parse::<crate::address::SvmAddress>() {
            Ok(addr) => addr.inner(),
            Err(_) => return Ok(VerifyResponse::invalid("invalid_asset", Some(payer))),
        };
        let mint = match fetch_mint(&self.rpc_client, expected_mint).await {
            Ok(mint) => mint,
            Err(_) => return Ok(VerifyResponse::invalid("invalid_asset", Some(payer))),
        };
        let expected_destination_ata = get_associated_token_address(&expected_destination_owner, &expected_mint);
        if destination_ata != expected_destination_ata {
            return Ok(VerifyResponse::invalid("invalid_asset", Some(payer)));
        }
        let expected_source_ata = get_associated_token_address(&authority, &expected_mint);
        if source_ata != expected_source_ata {
            return Ok(VerifyResponse::invalid("invalid_asset", Some(payer)));
        }

        if let Some(target) = ata_creation_target {
            if target != expected_destination_owner {
                return Ok(VerifyResponse::invalid("invalid_instructions", Some(payer)));
            }
        }

        if decimals_seen != Some(mint.decimals) {
            return Ok(VerifyResponse::invalid("invalid_asset", Some(payer)));
        }

        let expected_amount: u64 = match requirements.max_amount_required.as_str().parse() {
            Ok(amount) => amount,
            Err(_) => return Ok(VerifyResponse::invalid("invalid_amount", Some(payer))),
        };
        if amount_seen != Some(expected_amount) {
            return Ok(VerifyResponse::invalid("invalid_amount", Some(payer)));
        }

        let sim = self
            .rpc_client
            .simulate_transaction_with_config(
                &tx,
                RpcSimulateTransactionConfig {
                    sig_verify: false,
                    replace_recent_blockhash: true,
                    ..RpcSimulateTransactionConfig::default()
                },
            )
            .await;
        match sim {
            Ok(response) if response.value.err.is_none() => Ok(VerifyResponse::valid(payer)),
            Ok(_) => Ok(VerifyResponse::invalid("simulation_failed", Some(payer))),
            Err(e) => Err(X402Error::UnexpectedVerifyError(format!("simulation RPC call failed: {e}"))),
        }
    }
}
