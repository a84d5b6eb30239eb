//! Chain abstraction: one call/submit/wait contract over two chain SDKs.
//!
//! All chain-family branching lives behind [`ChainAdapter`]; the facade
//! never inspects the family itself. Both adapters normalize receipts
//! into [`TxReceipt`] so event parsing and revert detection are shared.

pub mod evm;
pub mod tron;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;
use std::time::Duration;

use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::Function;
use alloy::primitives::{B256, U256, keccak256};
use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::address::CanonicalAddress;
use crate::error::{SdkError, TransactionError};
use crate::network::ChainFamily;

/// Options for the transaction-wait primitive.
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// Total wait budget. Bounds only the client's wait; the transaction
    /// may still be mined after a timeout.
    pub timeout: Duration,
    /// Sleep between confirmation polls.
    pub poll_interval: Duration,
    /// When true (default), a terminal failure state raises
    /// [`TransactionError::Reverted`]. Pass false to inspect the failed
    /// receipt instead.
    pub throw_on_revert: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        WaitOptions {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(2),
            throw_on_revert: true,
        }
    }
}

/// One emitted log, normalized across families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Emitting contract, canonical form.
    pub address: Option<CanonicalAddress>,
    pub topics: Vec<B256>,
    pub data: Vec<u8>,
}

/// Normalized terminal receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_id: String,
    pub success: bool,
    /// The chain's raw terminal-state marker (`0x1`/`0x0` on EVM,
    /// `SUCCESS`/`REVERT`/… on TRON), surfaced so callers can tell a
    /// revert apart from a timeout.
    pub status_marker: String,
    pub block_number: Option<u64>,
    pub logs: Vec<LogEntry>,
}

/// Uniform execution surface over one chain.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    fn family(&self) -> ChainFamily;

    /// Address of the configured signer, if any. `None` means read-only.
    fn signer_address(&self) -> Option<CanonicalAddress>;

    /// Submit a state-changing call. Fails fast with
    /// [`TransactionError::SignerRequired`] in read-only mode.
    async fn submit(
        &self,
        contract: CanonicalAddress,
        function: &Function,
        args: &[DynSolValue],
    ) -> Result<String, TransactionError>;

    /// Execute a read-only call and decode the return values.
    async fn call(
        &self,
        contract: CanonicalAddress,
        function: &Function,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, TransactionError>;

    /// Poll until the transaction reaches a terminal state.
    async fn wait_for_transaction(
        &self,
        tx_id: &str,
        options: &WaitOptions,
    ) -> Result<TxReceipt, TransactionError>;
}

/// Recover an integer id emitted as the first indexed topic of the event
/// with the given signature (e.g. `"Registered(uint256,string,address)"`).
pub fn emitted_token_id(receipt: &TxReceipt, event_signature: &str) -> Option<u64> {
    let topic0 = keccak256(event_signature.as_bytes());
    for log in &receipt.logs {
        if log.topics.first() == Some(&topic0)
            && let Some(id_topic) = log.topics.get(1)
        {
            let id = U256::from_be_bytes(id_topic.0);
            if let Ok(id) = u64::try_from(id) {
                return Some(id);
            }
        }
    }
    None
}

/// A submitted write plus a deferred, typed result extraction.
///
/// `wait_confirmed` may be called more than once; the first terminal
/// receipt (and the extracted result) is memoized, so repeated waits
/// never re-poll a chain whose second answer could differ.
pub struct TransactionHandle<T> {
    tx_id: String,
    adapter: Arc<dyn ChainAdapter>,
    extract: Box<dyn Fn(&TxReceipt) -> Result<T, SdkError> + Send + Sync>,
    confirmed: OnceCell<Confirmed<T>>,
}

/// A terminal receipt together with the extracted result.
#[derive(Debug, Clone)]
pub struct Confirmed<T> {
    pub receipt: TxReceipt,
    pub result: T,
}

impl<T> TransactionHandle<T> {
    pub fn new(
        tx_id: String,
        adapter: Arc<dyn ChainAdapter>,
        extract: impl Fn(&TxReceipt) -> Result<T, SdkError> + Send + Sync + 'static,
    ) -> Self {
        TransactionHandle {
            tx_id,
            adapter,
            extract: Box::new(extract),
            confirmed: OnceCell::new(),
        }
    }

    /// The submitted transaction id.
    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    /// Wait until the transaction reaches a terminal state, then run the
    /// extractor against the receipt. Idempotent: a second wait returns
    /// the memoized receipt and result. A failed wait (e.g. timeout)
    /// leaves nothing memoized, so the next wait polls again.
    pub async fn wait_confirmed(&self, options: &WaitOptions) -> Result<&Confirmed<T>, SdkError> {
        self.confirmed
            .get_or_try_init(|| async {
                let receipt = self
                    .adapter
                    .wait_for_transaction(&self.tx_id, options)
                    .await?;
                let result = (self.extract)(&receipt)?;
                Ok::<_, SdkError>(Confirmed { receipt, result })
            })
            .await
    }
}

impl<T> std::fmt::Debug for TransactionHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("tx_id", &self.tx_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockAdapter;
    use super::*;
    use pretty_assertions::assert_eq;

    fn receipt_with_block(block: u64) -> TxReceipt {
        TxReceipt {
            tx_id: "0xabc".to_string(),
            success: true,
            status_marker: "0x1".to_string(),
            block_number: Some(block),
            logs: vec![],
        }
    }

    #[tokio::test]
    async fn wait_confirmed_memoizes_the_first_receipt() {
        let adapter = Arc::new(MockAdapter::new(ChainFamily::Evm));
        // Two different receipts queued; the second must never be seen.
        adapter.queue_receipt(receipt_with_block(100));
        adapter.queue_receipt(receipt_with_block(101));

        let handle = TransactionHandle::new(
            "0xabc".to_string(),
            adapter.clone(),
            |receipt: &TxReceipt| Ok(receipt.block_number),
        );

        let opts = WaitOptions::default();
        let first = handle.wait_confirmed(&opts).await.unwrap().receipt.clone();
        let second = handle.wait_confirmed(&opts).await.unwrap().receipt.clone();
        assert_eq!(first, second);
        assert_eq!(first.block_number, Some(100));
        assert_eq!(adapter.wait_calls(), 1);
    }

    #[tokio::test]
    async fn extractor_runs_once_and_result_is_cached() {
        let adapter = Arc::new(MockAdapter::new(ChainFamily::Evm));
        adapter.queue_receipt(receipt_with_block(5));

        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let calls_in = calls.clone();
        let handle =
            TransactionHandle::new("0xabc".to_string(), adapter, move |_: &TxReceipt| {
                calls_in.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(42u64)
            });

        let opts = WaitOptions::default();
        assert_eq!(handle.wait_confirmed(&opts).await.unwrap().result, 42);
        assert_eq!(handle.wait_confirmed(&opts).await.unwrap().result, 42);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn emitted_id_is_recovered_from_the_matching_topic() {
        let sig = "Registered(uint256,string,address)";
        let mut id_topic = [0u8; 32];
        id_topic[24..].copy_from_slice(&1234u64.to_be_bytes());
        let receipt = TxReceipt {
            tx_id: "0x1".to_string(),
            success: true,
            status_marker: "0x1".to_string(),
            block_number: None,
            logs: vec![
                // Unrelated event first; must be skipped.
                LogEntry {
                    address: None,
                    topics: vec![keccak256(b"Transfer(address,address,uint256)")],
                    data: vec![],
                },
                LogEntry {
                    address: None,
                    topics: vec![keccak256(sig.as_bytes()), B256::from(id_topic)],
                    data: vec![],
                },
            ],
        };
        assert_eq!(emitted_token_id(&receipt, sig), Some(1234));
    }

    #[test]
    fn missing_event_yields_none() {
        let receipt = TxReceipt {
            tx_id: "0x1".to_string(),
            success: true,
            status_marker: "0x1".to_string(),
            block_number: None,
            logs: vec![],
        };
        assert_eq!(
            emitted_token_id(&receipt, "Registered(uint256,string,address)"),
            None
        );
    }
}
