//! TRON adapter over the wallet HTTP API.
//!
//! TRON has no eth-style JSON-RPC for contract work; calls go through
//! `triggerconstantcontract` / `triggersmartcontract` with a selector
//! string plus raw ABI-encoded parameters, and every write must declare
//! a fee ceiling up front. Confirmation polls `gettransactioninfobyid`
//! until it returns a non-empty body; the receipt's result string is the
//! terminal-state marker, compared case-insensitively against `SUCCESS`.

use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy::json_abi::Function;
use alloy::primitives::{B256, I256, U256};
use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::address::CanonicalAddress;
use crate::error::{ConfigError, TransactionError};
use crate::network::ChainFamily;

use super::{ChainAdapter, LogEntry, TxReceipt, WaitOptions};

/// Default fee ceiling (in sun) for writes when the caller sets none.
pub const DEFAULT_FEE_LIMIT: u64 = 10_000_000;

const SUCCESS_MARKER: &str = "SUCCESS";

pub struct TronAdapter {
    http: reqwest::Client,
    base: String,
    fee_limit: u64,
    signer: Option<PrivateKeySigner>,
    signer_address: Option<CanonicalAddress>,
}

#[derive(Serialize)]
struct TriggerRequest<'a> {
    owner_address: String,
    contract_address: String,
    function_selector: &'a str,
    parameter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fee_limit: Option<u64>,
}

#[derive(Deserialize, Default)]
struct TriggerResponse {
    #[serde(default)]
    result: TriggerStatus,
    #[serde(default)]
    constant_result: Vec<String>,
    #[serde(default)]
    transaction: Option<serde_json::Value>,
}

#[derive(Deserialize, Default)]
struct TriggerStatus {
    #[serde(default)]
    result: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct BroadcastResponse {
    #[serde(default)]
    result: bool,
    #[serde(default)]
    txid: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl TronAdapter {
    /// Connect to a TRON wallet API endpoint. The fee limit is the
    /// per-write resource budget this chain requires up front.
    pub fn connect(
        rpc_endpoint: &str,
        signer: Option<PrivateKeySigner>,
        fee_limit: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let base = rpc_endpoint.trim_end_matches('/').to_string();
        if url::Url::parse(&base).is_err() {
            return Err(ConfigError::InvalidRpcEndpoint(rpc_endpoint.to_string()));
        }
        // TRON addresses share the EVM key-to-address derivation; only
        // the rendering differs.
        let signer_address = signer.as_ref().map(|k| CanonicalAddress::from(k.address()));
        Ok(TronAdapter {
            http: reqwest::Client::new(),
            base,
            fee_limit: fee_limit.unwrap_or(DEFAULT_FEE_LIMIT),
            signer,
            signer_address,
        })
    }

    fn owner_hex(&self) -> String {
        self.signer_address
            .unwrap_or(CanonicalAddress::ZERO)
            .to_tron_hex()
    }

    /// ABI-encoded parameters without the 4-byte selector; the wallet API
    /// takes the selector separately as a signature string.
    fn encode_parameter(
        function: &Function,
        args: &[DynSolValue],
    ) -> Result<String, TransactionError> {
        let full = function
            .abi_encode_input(args)
            .map_err(|e| TransactionError::Encode {
                method: function.signature(),
                reason: e.to_string(),
            })?;
        Ok(alloy::hex::encode(&full[4..]))
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, TransactionError> {
        let url = format!("{}{path}", self.base);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| TransactionError::Rpc(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransactionError::Rpc(format!("{url} returned {status}")));
        }
        response
            .json()
            .await
            .map_err(|e| TransactionError::Rpc(e.to_string()))
    }

    /// Decode a constant-call result.
    ///
    /// This chain's nodes sometimes return numeric words wider than the
    /// declared output type (aggregate counters in particular). The
    /// strict path rejects any integer outside its declared width; the
    /// fallback then re-decodes with the integer outputs widened to 256
    /// bits so the oversized value still comes through instead of
    /// failing the whole read.
    fn decode_output(
        function: &Function,
        data: &[u8],
    ) -> Result<Vec<DynSolValue>, TransactionError> {
        match Self::decode_strict(function, data) {
            Ok(values) => Ok(values),
            Err(strict_err) => {
                warn!(
                    method = %function.signature(),
                    error = %strict_err,
                    "strict decode failed, retrying with widened output types"
                );
                Self::decode_widened(function, data)
            }
        }
    }

    fn decode_strict(
        function: &Function,
        data: &[u8],
    ) -> Result<Vec<DynSolValue>, TransactionError> {
        let values = function
            .abi_decode_output(data)
            .map_err(|e| TransactionError::Decode {
                method: function.signature(),
                reason: e.to_string(),
            })?;
        for value in &values {
            let fits = match value {
                DynSolValue::Uint(v, bits) if *bits < 256 => {
                    *v < (U256::from(1u8) << *bits)
                }
                DynSolValue::Int(v, bits) if *bits < 256 => {
                    let bound = I256::ONE << (*bits - 1);
                    *v < bound && *v >= -bound
                }
                _ => true,
            };
            if !fits {
                return Err(TransactionError::Decode {
                    method: function.signature(),
                    reason: "value exceeds its declared integer width".to_string(),
                });
            }
        }
        Ok(values)
    }

    fn decode_widened(
        function: &Function,
        data: &[u8],
    ) -> Result<Vec<DynSolValue>, TransactionError> {
        let types = function
            .outputs
            .iter()
            .map(|param| param.resolve().map(widen_integer))
            .collect::<Result<Vec<DynSolType>, _>>()
            .map_err(|e| TransactionError::Decode {
                method: function.signature(),
                reason: e.to_string(),
            })?;
        let decoded = DynSolType::Tuple(types)
            .abi_decode_params(data)
            .map_err(|e| TransactionError::Decode {
                method: function.signature(),
                reason: e.to_string(),
            })?;
        Ok(match decoded {
            DynSolValue::Tuple(values) => values,
            single => vec![single],
        })
    }

    fn decode_api_message(message: Option<&str>) -> String {
        // API error messages arrive hex-encoded.
        message
            .and_then(|m| alloy::hex::decode(m).ok())
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .unwrap_or_else(|| "unspecified error".to_string())
    }

    fn normalize_info(tx_id: &str, info: &serde_json::Value) -> TxReceipt {
        // The marker is absent for plain transfers; only an explicit
        // non-success marker counts as a revert.
        let marker = info
            .pointer("/receipt/result")
            .and_then(|v| v.as_str())
            .unwrap_or(SUCCESS_MARKER)
            .to_string();
        let success = marker.eq_ignore_ascii_case(SUCCESS_MARKER);
        let block_number = info.get("blockNumber").and_then(|v| v.as_u64());

        let logs = info
            .get("log")
            .and_then(|v| v.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| LogEntry {
                        address: entry
                            .get("address")
                            .and_then(|v| v.as_str())
                            .and_then(|s| CanonicalAddress::parse(s, ChainFamily::Tron).ok()),
                        topics: entry
                            .get("topics")
                            .and_then(|v| v.as_array())
                            .map(|topics| {
                                topics
                                    .iter()
                                    .filter_map(|t| t.as_str())
                                    .filter_map(|t| {
                                        alloy::hex::decode(t.trim_start_matches("0x")).ok()
                                    })
                                    .filter(|bytes| bytes.len() == 32)
                                    .map(|bytes| B256::from_slice(&bytes))
                                    .collect()
                            })
                            .unwrap_or_default(),
                        data: entry
                            .get("data")
                            .and_then(|v| v.as_str())
                            .and_then(|d| alloy::hex::decode(d.trim_start_matches("0x")).ok())
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        TxReceipt {
            tx_id: tx_id.to_string(),
            success,
            status_marker: marker,
            block_number,
            logs,
        }
    }
}

/// Widen an integer type to 256 bits; everything else passes through.
fn widen_integer(ty: DynSolType) -> DynSolType {
    match ty {
        DynSolType::Uint(_) => DynSolType::Uint(256),
        DynSolType::Int(_) => DynSolType::Int(256),
        other => other,
    }
}

#[async_trait::async_trait]
impl ChainAdapter for TronAdapter {
    fn family(&self) -> ChainFamily {
        ChainFamily::Tron
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
        let Some(signer) = self.signer.as_ref() else {
            return Err(TransactionError::SignerRequired);
        };

        let selector = function.signature();
        let request = TriggerRequest {
            owner_address: self.owner_hex(),
            contract_address: contract.to_tron_hex(),
            function_selector: &selector,
            parameter: Self::encode_parameter(function, args)?,
            fee_limit: Some(self.fee_limit),
        };
        let response: TriggerResponse = self
            .post_json("/wallet/triggersmartcontract", &request)
            .await?;
        if !response.result.result {
            return Err(TransactionError::Rpc(format!(
                "triggersmartcontract rejected {selector}: {}",
                Self::decode_api_message(response.result.message.as_deref())
            )));
        }
        let mut transaction = response.transaction.ok_or_else(|| {
            TransactionError::Rpc("triggersmartcontract returned no transaction".to_string())
        })?;

        let tx_id = transaction
            .get("txID")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| TransactionError::Rpc("transaction missing txID".to_string()))?;

        // The txID is the SHA-256 of the raw transaction; signing it is
        // signing the transaction.
        let hash_bytes = alloy::hex::decode(&tx_id)
            .map_err(|e| TransactionError::Rpc(format!("malformed txID: {e}")))?;
        if hash_bytes.len() != 32 {
            return Err(TransactionError::Rpc("txID is not 32 bytes".to_string()));
        }
        let signature = signer
            .sign_hash_sync(&B256::from_slice(&hash_bytes))
            .map_err(|e| TransactionError::Rpc(format!("signing failed: {e}")))?;
        let mut sig_bytes = signature.as_bytes().to_vec();
        // The fullnode expects a bare recovery id, not 27/28.
        if sig_bytes[64] >= 27 {
            sig_bytes[64] -= 27;
        }
        transaction["signature"] = serde_json::json!([alloy::hex::encode(&sig_bytes)]);

        let broadcast: BroadcastResponse = self
            .post_json("/wallet/broadcasttransaction", &transaction)
            .await?;
        if !broadcast.result {
            return Err(TransactionError::Rpc(format!(
                "broadcast rejected: {}",
                Self::decode_api_message(broadcast.message.as_deref())
            )));
        }

        let tx_id = broadcast.txid.unwrap_or(tx_id);
        info!(method = %selector, tx = %tx_id, fee_limit = self.fee_limit, "transaction submitted");
        Ok(tx_id)
    }

    async fn call(
        &self,
        contract: CanonicalAddress,
        function: &Function,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, TransactionError> {
        let selector = function.signature();
        let request = TriggerRequest {
            owner_address: self.owner_hex(),
            contract_address: contract.to_tron_hex(),
            function_selector: &selector,
            parameter: Self::encode_parameter(function, args)?,
            fee_limit: None,
        };
        debug!(method = %selector, "constant call");
        let response: TriggerResponse = self
            .post_json("/wallet/triggerconstantcontract", &request)
            .await?;
        if !response.result.result {
            return Err(TransactionError::Rpc(format!(
                "triggerconstantcontract rejected {selector}: {}",
                Self::decode_api_message(response.result.message.as_deref())
            )));
        }
        let encoded = response.constant_result.first().ok_or_else(|| {
            TransactionError::Rpc(format!("{selector} returned no constant_result"))
        })?;
        let data = alloy::hex::decode(encoded).map_err(|e| TransactionError::Decode {
            method: selector.clone(),
            reason: e.to_string(),
        })?;
        Self::decode_output(function, &data)
    }

    async fn wait_for_transaction(
        &self,
        tx_id: &str,
        options: &WaitOptions,
    ) -> Result<TxReceipt, TransactionError> {
        let started = Instant::now();
        loop {
            let info: serde_json::Value = self
                .post_json(
                    "/wallet/gettransactioninfobyid",
                    &serde_json::json!({ "value": tx_id }),
                )
                .await?;

            // An empty object means the transaction is not yet indexed.
            let mined = info.as_object().is_some_and(|o| !o.is_empty());
            if mined {
                let receipt = Self::normalize_info(tx_id, &info);
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

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::keccak256;
    use pretty_assertions::assert_eq;

    #[test]
    fn receipt_marker_is_compared_case_insensitively() {
        let info = serde_json::json!({
            "id": "aa",
            "blockNumber": 42,
            "receipt": { "result": "Success" }
        });
        let receipt = TronAdapter::normalize_info("aa", &info);
        assert!(receipt.success);
        assert_eq!(receipt.status_marker, "Success");
        assert_eq!(receipt.block_number, Some(42));
    }

    #[test]
    fn missing_marker_counts_as_success() {
        let info = serde_json::json!({ "id": "aa", "fee": 1100 });
        let receipt = TronAdapter::normalize_info("aa", &info);
        assert!(receipt.success);
    }

    #[test]
    fn revert_marker_is_surfaced_raw() {
        let info = serde_json::json!({
            "id": "aa",
            "receipt": { "result": "OUT_OF_ENERGY" }
        });
        let receipt = TronAdapter::normalize_info("aa", &info);
        assert!(!receipt.success);
        assert_eq!(receipt.status_marker, "OUT_OF_ENERGY");
    }

    #[test]
    fn logs_are_normalized_with_topics() {
        let topic0 = keccak256(b"Registered(uint256,string,address)");
        let mut id_topic = [0u8; 32];
        id_topic[31] = 9;
        let info = serde_json::json!({
            "id": "aa",
            "receipt": { "result": "SUCCESS" },
            "log": [{
                "address": "41742d35cc6634c0532925a3b844bc454e4438f44e",
                "topics": [
                    alloy::hex::encode(topic0),
                    alloy::hex::encode(id_topic),
                ],
                "data": "00"
            }]
        });
        let receipt = TronAdapter::normalize_info("aa", &info);
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(receipt.logs[0].topics[0], topic0);
        assert_eq!(crate::chain::emitted_token_id(&receipt, "Registered(uint256,string,address)"), Some(9));
    }

    #[test]
    fn parameter_encoding_strips_the_selector() {
        let function =
            alloy::json_abi::Function::parse("function tokenURI(uint256 agentId) returns (string)")
                .unwrap();
        let args = [DynSolValue::Uint(alloy::primitives::U256::from(7u64), 256)];
        let parameter = TronAdapter::encode_parameter(&function, &args).unwrap();
        // 32-byte word, hex encoded, no selector prefix.
        assert_eq!(parameter.len(), 64);
        assert!(parameter.ends_with("07"));
    }

    #[test]
    fn api_error_messages_are_hex_decoded() {
        let hex_message = alloy::hex::encode(b"contract validate error");
        assert_eq!(
            TronAdapter::decode_api_message(Some(&hex_message)),
            "contract validate error"
        );
        assert_eq!(TronAdapter::decode_api_message(None), "unspecified error");
    }

    fn summary_function() -> alloy::json_abi::Function {
        alloy::json_abi::Function::parse(
            "function getSummary(uint256) returns (uint64, int128, uint8)",
        )
        .unwrap()
    }

    fn summary_words(count: u64, sum: u64, exponent: u64) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&U256::from(count).to_be_bytes::<32>());
        data.extend_from_slice(&U256::from(sum).to_be_bytes::<32>());
        data.extend_from_slice(&U256::from(exponent).to_be_bytes::<32>());
        data
    }

    #[test]
    fn in_range_values_decode_strictly() {
        let values =
            TronAdapter::decode_output(&summary_function(), &summary_words(3, 354_000_000, 6))
                .unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[2], DynSolValue::Uint(U256::from(6u8), 8));
    }

    #[test]
    fn oversized_word_falls_back_to_widened_types() {
        // 300 does not fit the declared uint8; the strict path must
        // refuse it and the widened re-decode must carry it through.
        let data = summary_words(3, 354_000_000, 300);
        let function = summary_function();

        let strict = TronAdapter::decode_strict(&function, &data);
        assert!(strict.is_err(), "oversized value must fail the strict path");

        let values = TronAdapter::decode_output(&function, &data).unwrap();
        assert_eq!(values[0], DynSolValue::Uint(U256::from(3u64), 256));
        assert_eq!(values[2], DynSolValue::Uint(U256::from(300u64), 256));
    }

    #[test]
    fn garbage_fails_both_decode_paths() {
        let err = TronAdapter::decode_output(&summary_function(), &[0xffu8; 7]).unwrap_err();
        assert!(matches!(err, TransactionError::Decode { .. }));
    }
}
