//! Builds the SPL `TransferChecked` transaction a Solana payer signs.
//!
//! Grounded on
//! `other_examples/dbcd8896_qntx-r402__r402-svm-src-exact-client.rs.rs`'s
//! `build_signed_transfer_transaction`, simplified to a legacy (non-v0)
//! `Message`/`Transaction` — this crate has no need for address lookup
//! tables, and the legacy `Transaction::partial_sign` API is the more
//! direct fit for "payer signs now, facilitator fee-payer signs later".

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::{get_associated_token_address, instruction::create_associated_token_account};

use std::str::FromStr;

use crate::errors::{Result, X402Error};
use crate::payload::{ChainPayload, PaymentPayload, SvmPayload};
use crate::solana::types::fetch_mint;
use crate::types::{PaymentRequirements, X402_VERSION};

/// Default compute unit limit requested for the transfer; generous enough
/// that simulation-driven adjustment isn't needed for a single
/// `TransferChecked` (+ optional `CreateAssociatedTokenAccount`).
const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 150_000;

/// Priority fee, in micro-lamports per compute unit. Requirements allow up
/// to 5; this crate asks for 3, leaving headroom under the verifier's cap.
const DEFAULT_COMPUTE_UNIT_PRICE: u64 = 3;

fn fee_payer_from_requirements(requirements: &PaymentRequirements) -> Result<Pubkey> {
    let fee_payer_str = requirements
        .extra
        .as_ref()
        .and_then(|extra| extra.get("feePayer"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| X402Error::InvalidPaymentRequirements("missing extra.feePayer for SVM network".into()))?;
    Pubkey::from_str(fee_payer_str).map_err(|e| X402Error::InvalidAddress(format!("{fee_payer_str}: {e}")))
}

/// Builds and partially signs (payer-only) the transfer transaction,
/// producing the full [`PaymentPayload`] a client attaches to its retried
/// request.
pub async fn generate_payload(
    requirements: &PaymentRequirements,
    payer: &Keypair,
    rpc_client: &RpcClient,
) -> Result<PaymentPayload> {
    let mint_pubkey = requirements
        .asset
        .parse::<crate::address::SvmAddress>()?
        .inner();
    let destination_owner = requirements
        .pay_to
        .parse::<crate::address::SvmAddress>()?
        .inner();
    let fee_payer = fee_payer_from_requirements(requirements)?;

    let amount: u64 = requirements
        .max_amount_required
        .as_str()
        .parse()
        .map_err(|_| X402Error::InvalidAmount(requirements.max_amount_required.to_string()))?;

    let mint = fetch_mint(rpc_client, mint_pubkey).await?;

    let source_ata = get_associated_token_address(&payer.pubkey(), &mint_pubkey);
    let destination_ata = get_associated_token_address(&destination_owner, &mint_pubkey);

    let mut instructions: Vec<Instruction> = vec![
        ComputeBudgetInstruction::set_compute_unit_limit(DEFAULT_COMPUTE_UNIT_LIMIT),
        ComputeBudgetInstruction::set_compute_unit_price(DEFAULT_COMPUTE_UNIT_PRICE),
    ];

    let destination_exists = rpc_client.get_account(&destination_ata).await.is_ok();
    if !destination_exists {
        instructions.push(create_associated_token_account(
            &fee_payer,
            &destination_owner,
            &mint_pubkey,
            &mint.token_program,
        ));
    }

    let transfer_ix = spl_token::instruction::transfer_checked(
        &mint.token_program,
        &source_ata,
        &mint_pubkey,
        &destination_ata,
        &payer.pubkey(),
        &[],
        amount,
        mint.decimals,
    )
    .map_err(|e| X402Error::InvalidInstructions(e.to_string()))?;
    instructions.push(transfer_ix);

    let recent_blockhash = rpc_client
        .get_latest_blockhash()
        .await
        .map_err(|e| X402Error::BlockchainError(format!("get_latest_blockhash: {e}")))?;

    let message = Message::new_with_blockhash(&instructions, Some(&fee_payer), &recent_blockhash);
    let mut tx = Transaction::new_unsigned(message);
    tx.partial_sign(&[payer], recent_blockhash);

    let serialized = bincode::serialize(&tx).map_err(|e| X402Error::InvalidPayload(e.to_string()))?;
    let transaction_b64 = BASE64.encode(serialized);

    Ok(PaymentPayload {
        x402_version: X402_VERSION,
        scheme: "exact".to_string(),
        network: requirements.network.clone(),
        payload: ChainPayload::Svm(SvmPayload {
            transaction: transaction_b64,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_unit_defaults_are_under_verifier_cap() {
        assert!(DEFAULT_COMPUTE_UNIT_PRICE <= 5);
    }
}
