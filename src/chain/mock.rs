//! Scripted in-memory adapter for tests.
//!
//! Plays the role the chain would: reads pop from a scripted queue,
//! writes record the call and return deterministic transaction ids,
//! waits pop queued receipts. No network anywhere.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::Function;
use async_trait::async_trait;

use crate::address::CanonicalAddress;
use crate::error::TransactionError;
use crate::network::ChainFamily;

use super::{ChainAdapter, TxReceipt, WaitOptions};

/// A recorded write.
#[derive(Debug, Clone)]
pub(crate) struct SubmittedCall {
    pub contract: CanonicalAddress,
    pub signature: String,
    pub args: Vec<DynSolValue>,
}

pub(crate) struct MockAdapter {
    family: ChainFamily,
    signer: Option<CanonicalAddress>,
    call_results: Mutex<VecDeque<Vec<DynSolValue>>>,
    receipts: Mutex<VecDeque<TxReceipt>>,
    submitted: Mutex<Vec<SubmittedCall>>,
    wait_calls: AtomicUsize,
    next_tx: AtomicUsize,
}

impl MockAdapter {
    pub fn new(family: ChainFamily) -> Self {
        MockAdapter {
            family,
            signer: Some(CanonicalAddress::from([0x11u8; 20])),
            call_results: Mutex::new(VecDeque::new()),
            receipts: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            wait_calls: AtomicUsize::new(0),
            next_tx: AtomicUsize::new(0),
        }
    }

    pub fn read_only(family: ChainFamily) -> Self {
        MockAdapter { signer: None, ..Self::new(family) }
    }

    pub fn queue_call_result(&self, values: Vec<DynSolValue>) {
        self.call_results.lock().unwrap().push_back(values);
    }

    pub fn queue_receipt(&self, receipt: TxReceipt) {
        self.receipts.lock().unwrap().push_back(receipt);
    }

    pub fn submitted(&self) -> Vec<SubmittedCall> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn wait_calls(&self) -> usize {
        self.wait_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainAdapter for MockAdapter {
    fn family(&self) -> ChainFamily {
        self.family
    }

    fn signer_address(&self) -> Option<CanonicalAddress> {
        self.signer
    }

    async fn submit(
        &self,
        contract: CanonicalAddress,
        function: &Function,
        args: &[DynSolValue],
    ) -> Result<String, TransactionError> {
        if self.signer.is_none() {
            return Err(TransactionError::SignerRequired);
        }
        self.submitted.lock().unwrap().push(SubmittedCall {
            contract,
            signature: function.signature(),
            args: args.to_vec(),
        });
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
        Ok(format!("0xmock{n:04x}"))
    }

    async fn call(
        &self,
        _contract: CanonicalAddress,
        function: &Function,
        _args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, TransactionError> {
        self.call_results
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransactionError::Rpc(format!(
                "no scripted result for {}",
                function.signature()
            )))
    }

    async fn wait_for_transaction(
        &self,
        tx_id: &str,
        options: &WaitOptions,
    ) -> Result<TxReceipt, TransactionError> {
        self.wait_calls.fetch_add(1, Ordering::SeqCst);
        let receipt = self
            .receipts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransactionError::Timeout {
                tx_id: tx_id.to_string(),
                waited_ms: options.timeout.as_millis() as u64,
            })?;
        if !receipt.success && options.throw_on_revert {
            return Err(TransactionError::Reverted {
                tx_id: receipt.tx_id.clone(),
                marker: receipt.status_marker.clone(),
            });
        }
        Ok(receipt)
    }
}
