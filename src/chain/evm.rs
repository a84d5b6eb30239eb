//! EVM adapter backed by alloy.
//!
//! Writes go out as signed transactions through the provider's filler
//! stack (gas, nonce, chain id); reads are `eth_call`s decoded with the
//! dynamic ABI. Confirmation polls `eth_getTransactionReceipt` under the
//! shared [`WaitOptions`] budget; revert is the receipt status field.

use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::json_abi::Function;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{B256, Bytes};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};
use url::Url;

use crate::address::CanonicalAddress;
use crate::error::{ConfigError, TransactionError};
use crate::network::ChainFamily;

use super::{ChainAdapter, LogEntry, TxReceipt, WaitOptions};

pub struct EvmAdapter {
    provider: DynProvider,
    signer_address: Option<CanonicalAddress>,
}

impl EvmAdapter {
    /// Connect to an EVM JSON-RPC endpoint, optionally with a signer.
    /// Without a signer the adapter is read-only and writes fail fast.
    pub fn connect(
        rpc_endpoint: &str,
        signer: Option<PrivateKeySigner>,
    ) -> Result<Self, ConfigError> {
        let url: Url = rpc_endpoint
            .parse()
            .map_err(|_| ConfigError::InvalidRpcEndpoint(rpc_endpoint.to_string()))?;

        let (provider, signer_address) = match signer {
            Some(key) => {
                let address = CanonicalAddress::from(key.address());
                let wallet = EthereumWallet::from(key);
                let provider = ProviderBuilder::new().wallet(wallet).connect_http(url).erased();
                (provider, Some(address))
            }
            None => {
                let provider = ProviderBuilder::new().connect_http(url).erased();
                (provider, None)
            }
        };

        Ok(EvmAdapter { provider, signer_address })
    }

    fn normalize_receipt(receipt: &alloy::rpc::types::TransactionReceipt) -> TxReceipt {
        let success = receipt.status();
        let logs = receipt
            .inner
            .logs()
            .iter()
            .map(|log| LogEntry {
                address: Some(CanonicalAddress::from(log.address())),
                topics: log.topics().to_vec(),
                data: log.data().data.to_vec(),
            })
            .collect();
        TxReceipt {
            tx_id: format!("{:#x}", receipt.transaction_hash),
            success,
            status_marker: if success { "0x1" } else { "0x0" }.to_string(),
            block_number: receipt.block_number,
            logs,
        }
    }
}

#[async_trait]
impl ChainAdapter for EvmAdapter {
    fn family(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    fn signer_address(&self) -> Option<CanonicalAddress> {
        self.signer_address
    }

    async fn submit(
        &self,
        contract: CanonicalAddress,
        function: &Function,
        args: &[DynSolValue],
    ) -> Result<String, TransactionError> {
        if self.signer_address.is_none() {
            return Err(TransactionError::SignerRequired);
        }

        let calldata = function
            .abi_encode_input(args)
            .map_err(|e| TransactionError::Encode {
                method: function.signature(),
                reason: e.to_string(),
            })?;

        let tx = TransactionRequest::default()
            .with_to(contract.to_evm())
            .with_input(Bytes::from(calldata));

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| TransactionError::Rpc(e.to_string()))?;
        let tx_hash = format!("{:#x}", pending.tx_hash());

        info!(method = %function.signature(), tx = %tx_hash, "transaction submitted");
        Ok(tx_hash)
    }

    async fn call(
        &self,
        contract: CanonicalAddress,
        function: &Function,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, TransactionError> {
        let calldata = function
            .abi_encode_input(args)
            .map_err(|e| TransactionError::Encode {
                method: function.signature(),
                reason: e.to_string(),
            })?;

        let tx = TransactionRequest::default()
            .with_to(contract.to_evm())
            .with_input(Bytes::from(calldata));

        debug!(method = %function.signature(), "read call");
        let output = self
            .provider
            .call(tx)
            .await
            .map_err(|e| TransactionError::Rpc(e.to_string()))?;

        function
            .abi_decode_output(&output)
            .map_err(|e| TransactionError::Decode {
                method: function.signature(),
                reason: e.to_string(),
            })
    }

    async fn wait_for_transaction(
        &self,
        tx_id: &str,
        options: &WaitOptions,
    ) -> Result<TxReceipt, TransactionError> {
        let hash: B256 = tx_id
            .parse()
            .map_err(|_| TransactionError::Rpc(format!("malformed transaction hash '{tx_id}'")))?;

        let started = Instant::now();
        loop {
            let fetched = self
                .provider
                .get_transaction_receipt(hash)
                .await
                .map_err(|e| TransactionError::Rpc(e.to_string()))?;

            if let Some(raw) = fetched {
                let receipt = Self::normalize_receipt(&raw);
                if !receipt.success && options.throw_on_revert {
                    return Err(TransactionError::Reverted {
                        tx_id: receipt.tx_id,
                        marker: receipt.status_marker,
                    });
                }
                return Ok(receipt);
            }

            if started.elapsed() >= options.timeout {
                return Err(TransactionError::Timeout {
                    tx_id: tx_id.to_string(),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            sleep(options.poll_interval).await;
        }
    }
}
