//! Shared application state: the verifier/settler pair for this instance's
//! configured network, the durable ledger, and the bits of config the
//! handlers need to answer `/supported` and `/discovery/resources`.

use std::sync::Arc;

use ethers::signers::LocalWallet;
use solana_sdk::signature::Keypair;
use x402_core::errors::X402Error;
use x402_core::network::ChainFamily;
use x402_core::scheme::{Settler, Verifier};
use x402_ledger::Ledger;

use crate::config::FacilitatorConfig;

pub struct AppState {
    pub verifier: Verifier,
    pub settler: Settler,
    pub ledger: Arc<Ledger>,
    pub config: FacilitatorConfig,
}

impl AppState {
    pub async fn build(config: FacilitatorConfig) -> Result<Self, X402Error> {
        let ledger = Ledger::connect(&config.database_url)
            .await
            .map_err(X402Error::Internal)?;

        let (verifier, settler) = match ChainFamily::of(&config.network) {
            ChainFamily::Evm => {
                let key = config.private_key.clone().ok_or_else(|| {
                    X402Error::ConfigError("PRIVATE_KEY required for an EVM network".into())
                })?;
                let wallet: LocalWallet = key
                    .parse()
                    .map_err(|e| X402Error::ConfigError(format!("invalid PRIVATE_KEY: {e}")))?;
                let verifier = x402_core::eip155::verifier::EvmVerifier::new(&config.rpc_url)?;
                let settler = x402_core::eip155::settler::EvmSettler::new(&config.rpc_url, wallet)?;
                (Verifier::Evm(verifier), Settler::Evm(settler))
            }
            ChainFamily::Svm => {
                let key = config.solana_private_key.clone().ok_or_else(|| {
                    X402Error::ConfigError("SOLANA_PRIVATE_KEY required for a Solana network".into())
                })?;
                let bytes = bs58::decode(&key)
                    .into_vec()
                    .map_err(|e| X402Error::ConfigError(format!("invalid SOLANA_PRIVATE_KEY: {e}")))?;
                let keypair = Keypair::from_bytes(&bytes)
                    .map_err(|e| X402Error::ConfigError(format!("invalid SOLANA_PRIVATE_KEY: {e}")))?;
                let verifier = x402_core::solana::verifier::SvmVerifier::new(&config.rpc_url);
                let settler = x402_core::solana::settler::SvmSettler::new(&config.rpc_url, keypair);
                (Verifier::Svm(verifier), Settler::Svm(settler))
            }
        };

        Ok(AppState {
            verifier,
            settler,
            ledger: Arc::new(ledger),
            config,
        })
    }
}
