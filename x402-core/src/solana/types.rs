//! Mint introspection shared by the SVM client, verifier, and settler.

use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;

use crate::errors::{Result, X402Error};

/// Decimals and owning token program for an SPL mint.
///
/// Token-2022 mints are recognized (so a clear error is raised instead of a
/// silent misparse) but transfer-fee/interest-bearing extensions are not
/// implemented — only the plain `TransferChecked` path is, matching the
/// grounding example's scope.
#[derive(Debug, Clone, Copy)]
pub struct Mint {
    pub decimals: u8,
    pub token_program: Pubkey,
}

/// Fetches and unpacks a mint account, determining its owning token
/// program (classic SPL Token vs. Token-2022) from the account owner.
pub async fn fetch_mint(
    rpc_client: &solana_client::nonblocking::rpc_client::RpcClient,
    mint_address: Pubkey,
) -> Result<Mint> {
    let account = rpc_client
        .get_account(&mint_address)
        .await
        .map_err(|e| X402Error::BlockchainError(format!("failed to fetch mint {mint_address}: {e}")))?;

    if account.owner == spl_token::id() {
        let mint = spl_token::state::Mint::unpack(&account.data)
            .map_err(|e| X402Error::InvalidAsset(format!("failed to unpack mint {mint_address}: {e}")))?;
        Ok(Mint {
            decimals: mint.decimals,
            token_program: spl_token::id(),
        })
    } else {
        Err(X402Error::InvalidAsset(format!(
            "mint {mint_address} is owned by an unsupported token program (Token-2022 not implemented)"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_carries_token_program() {
        let mint = Mint {
            decimals: 6,
            token_program: spl_token::id(),
        };
        assert_eq!(mint.token_program, spl_token::id());
        assert_eq!(mint.decimals, 6);
    }
}
