//! The client facade.
//!
//! [`Sdk`] binds one network, one set of registry contracts and at most
//! one signing key. Construction resolves and validates everything up
//! front; afterwards the instance is immutable, cheap to clone and safe
//! to share. Every write returns a [`TransactionHandle`] immediately;
//! confirmation is the caller's explicit second step.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{B256, I256, U256, keccak256};
use alloy::signers::local::PrivateKeySigner;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::abi::{AbiDispatcher, RegistryInterfaces};
use crate::address::CanonicalAddress;
use crate::agent::{Agent, AgentProfile};
use crate::chain::evm::EvmAdapter;
use crate::chain::tron::TronAdapter;
use crate::chain::{ChainAdapter, TransactionHandle, WaitOptions, emitted_token_id};
use crate::content::{ContentFetcher, HttpContentFetcher};
use crate::error::{
    ConfigError, ContentError, FeedbackError, SdkError, SignatureError, StateError,
    TransactionError,
};
use crate::feedback::{self, FeedbackSummary};
use crate::network::{ChainFamily, NetworkDescriptor, resolve_network};
use crate::signing::{DomainConfig, TypedDataSigner, WalletApproval};

/// Event emitted by the identity registry on mint; topic1 is the token id.
const REGISTERED_EVENT: &str = "Registered(uint256,string,address)";

/// Default validity window for wallet-binding approvals.
const DEFAULT_APPROVAL_WINDOW_SECS: u64 = 3_600;

/// Longest approval window the facade will sign.
const MAX_APPROVAL_WINDOW_SECS: u64 = 86_400;

/// One on-chain metadata entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub key: String,
    pub value: Vec<u8>,
}

impl MetadataEntry {
    pub fn new(key: &str, value: impl Into<Vec<u8>>) -> Self {
        MetadataEntry { key: key.to_string(), value: value.into() }
    }

    fn to_value(&self) -> DynSolValue {
        DynSolValue::Tuple(vec![
            DynSolValue::String(self.key.clone()),
            DynSolValue::Bytes(self.value.clone()),
        ])
    }
}

/// One feedback entry as read back from the reputation registry.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackEntry {
    pub value: Decimal,
    pub raw: i128,
    pub exponent: u8,
    pub tag1: String,
    pub tag2: String,
    pub revoked: bool,
}

/// State of a validation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationStatus {
    pub validator: CanonicalAddress,
    pub token_id: u64,
    pub response: u8,
    pub responded: bool,
}

/// Parse a hex string into exactly 32 bytes.
///
/// Hashes are identity-critical, so wrong-length input is an error;
/// nothing is padded or truncated to fit.
pub fn parse_bytes32(input: &str) -> Result<B256, TransactionError> {
    let hex_part = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    if hex_part.len() != 64 {
        return Err(TransactionError::InvalidBytes32 {
            input: input.to_string(),
            reason: format!("expected 64 hex characters, got {}", hex_part.len()),
        });
    }
    let bytes = alloy::hex::decode(hex_part).map_err(|e| TransactionError::InvalidBytes32 {
        input: input.to_string(),
        reason: e.to_string(),
    })?;
    Ok(B256::from_slice(&bytes))
}

#[derive(Debug, Clone, Copy)]
enum Registry {
    Identity,
    Reputation,
    Validation,
}

struct SdkInner {
    network: NetworkDescriptor,
    interfaces: RegistryInterfaces,
    adapter: Arc<dyn ChainAdapter>,
    typed_signer: TypedDataSigner,
    wait_options: WaitOptions,
    fetcher: Arc<dyn ContentFetcher>,
    // Hashes this instance already submitted; the contract enforces
    // uniqueness, so a resubmission would only burn fees on a revert.
    submitted_request_hashes: Mutex<HashSet<B256>>,
}

/// The facade. Cheap to clone; clones share one connection and one
/// request-hash guard.
#[derive(Clone)]
pub struct Sdk {
    inner: Arc<SdkInner>,
}

impl std::fmt::Debug for Sdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sdk")
            .field("network", &self.inner.network.token)
            .field("chain_id", &self.inner.network.chain_id)
            .field("read_only", &self.inner.adapter.signer_address().is_none())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Sdk`]. `network` is the only required input; everything
/// else has a default or is checked lazily on first use.
pub struct SdkBuilder {
    network: String,
    chain_id: Option<u64>,
    rpc_endpoint: Option<String>,
    private_key: Option<SecretString>,
    identity_registry: Option<String>,
    reputation_registry: Option<String>,
    validation_registry: Option<String>,
    fee_limit: Option<u64>,
    wait_options: WaitOptions,
    domain: DomainConfig,
    fetcher: Option<Arc<dyn ContentFetcher>>,
    adapter: Option<Arc<dyn ChainAdapter>>,
}

impl SdkBuilder {
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn with_rpc_endpoint(mut self, endpoint: &str) -> Self {
        self.rpc_endpoint = Some(endpoint.to_string());
        self
    }

    /// Private key for signing writes. Without one the SDK is read-only.
    pub fn with_private_key(mut self, key: SecretString) -> Self {
        self.private_key = Some(key);
        self
    }

    pub fn with_identity_registry(mut self, address: &str) -> Self {
        self.identity_registry = Some(address.to_string());
        self
    }

    pub fn with_reputation_registry(mut self, address: &str) -> Self {
        self.reputation_registry = Some(address.to_string());
        self
    }

    pub fn with_validation_registry(mut self, address: &str) -> Self {
        self.validation_registry = Some(address.to_string());
        self
    }

    /// Fee ceiling for TRON writes, in sun. Ignored on EVM networks.
    pub fn with_fee_limit(mut self, fee_limit: u64) -> Self {
        self.fee_limit = Some(fee_limit);
        self
    }

    pub fn with_wait_options(mut self, options: WaitOptions) -> Self {
        self.wait_options = options;
        self
    }

    /// Override the typed-data domain, e.g. after a registry upgrade.
    pub fn with_domain(mut self, domain: DomainConfig) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_content_fetcher(mut self, fetcher: Arc<dyn ContentFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Inject a pre-built adapter instead of connecting one. Used for
    /// tests and for callers managing their own connections.
    pub fn with_adapter(mut self, adapter: Arc<dyn ChainAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn build(self) -> Result<Sdk, SdkError> {
        let mut network = resolve_network(&self.network, self.chain_id)?;
        if let Some(endpoint) = self.rpc_endpoint {
            network.rpc_endpoint = endpoint;
        }
        if let Some(addr) = &self.identity_registry {
            network.contracts.identity = Some(CanonicalAddress::parse(addr, network.family)?);
        }
        if let Some(addr) = &self.reputation_registry {
            network.contracts.reputation = Some(CanonicalAddress::parse(addr, network.family)?);
        }
        if let Some(addr) = &self.validation_registry {
            network.contracts.validation = Some(CanonicalAddress::parse(addr, network.family)?);
        }

        let signer = match &self.private_key {
            Some(secret) => {
                let parsed = secret
                    .expose_secret()
                    .trim()
                    .trim_start_matches("0x")
                    .parse::<PrivateKeySigner>()
                    .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))?;
                Some(parsed)
            }
            None => None,
        };

        let adapter: Arc<dyn ChainAdapter> = match self.adapter {
            Some(adapter) => adapter,
            None => match network.family {
                ChainFamily::Evm => {
                    Arc::new(EvmAdapter::connect(&network.rpc_endpoint, signer)?)
                }
                ChainFamily::Tron => Arc::new(TronAdapter::connect(
                    &network.rpc_endpoint,
                    signer,
                    self.fee_limit,
                )?),
            },
        };

        info!(
            network = %network.token,
            chain_id = network.chain_id,
            read_only = adapter.signer_address().is_none(),
            "client configured"
        );

        Ok(Sdk {
            inner: Arc::new(SdkInner {
                network,
                interfaces: RegistryInterfaces::erc8004()?,
                adapter,
                typed_signer: TypedDataSigner::new(self.domain),
                wait_options: self.wait_options,
                fetcher: self
                    .fetcher
                    .unwrap_or_else(|| Arc::new(HttpContentFetcher::new())),
                submitted_request_hashes: Mutex::new(HashSet::new()),
            }),
        })
    }
}

impl Sdk {
    pub fn builder(network: &str) -> SdkBuilder {
        SdkBuilder {
            network: network.to_string(),
            chain_id: None,
            rpc_endpoint: None,
            private_key: None,
            identity_registry: None,
            reputation_registry: None,
            validation_registry: None,
            fee_limit: None,
            wait_options: WaitOptions::default(),
            domain: DomainConfig::default(),
            fetcher: None,
            adapter: None,
        }
    }

    pub fn network(&self) -> &NetworkDescriptor {
        &self.inner.network
    }

    pub fn chain_id(&self) -> u64 {
        self.inner.network.chain_id
    }

    pub fn family(&self) -> ChainFamily {
        self.inner.network.family
    }

    /// The configured signer's address, or `None` in read-only mode.
    pub fn signer_address(&self) -> Option<CanonicalAddress> {
        self.inner.adapter.signer_address()
    }

    pub fn wait_options(&self) -> WaitOptions {
        self.inner.wait_options
    }

    /// Wrap a fresh profile into an unregistered [`Agent`].
    pub fn create_agent(&self, profile: AgentProfile) -> Agent {
        Agent::new(self.clone(), profile)
    }

    /// Hydrate an agent from chain state. The token URI may be empty
    /// (a minted but not yet published agent); a non-empty URI is
    /// fetched and parsed as the registration file.
    pub async fn load_agent(&self, agent_id: &str) -> Result<Agent, SdkError> {
        let token_id = self.parse_agent_id(agent_id)?;
        let uri = self.token_uri(token_id).await?;
        let owner = self.owner_of(token_id).await?;
        let wallet = self.agent_wallet(token_id).await?;

        let mut profile = if uri.is_empty() {
            AgentProfile::new("", "")
        } else {
            let value = self.inner.fetcher.fetch_json(&uri).await?;
            serde_json::from_value(value).map_err(|e| ContentError::Fetch {
                uri: uri.clone(),
                reason: format!("invalid registration file: {e}"),
            })?
        };
        profile.agent_id = Some(format!("{}:{token_id}", self.chain_id()));
        profile.agent_uri = (!uri.is_empty()).then_some(uri);
        profile.owner = Some(owner.to_native(self.family()));
        profile.wallet_address = (!wallet.is_zero()).then(|| wallet.to_native(self.family()));
        Ok(Agent::hydrated(self.clone(), profile, token_id))
    }

    /// Parse `tokenId` or `chainId:tokenId`. A qualified id naming a
    /// different chain than this instance is bound to is rejected.
    pub fn parse_agent_id(&self, agent_id: &str) -> Result<u64, SdkError> {
        let (chain_part, token_part) = match agent_id.split_once(':') {
            Some((chain, token)) => (Some(chain), token),
            None => (None, agent_id),
        };
        if let Some(chain) = chain_part {
            let chain: u64 = chain
                .parse()
                .map_err(|_| StateError::MalformedAgentId(agent_id.to_string()))?;
            if chain != self.chain_id() {
                return Err(StateError::WrongChain {
                    agent_id: agent_id.to_string(),
                    chain_id: self.chain_id(),
                }
                .into());
            }
        }
        token_part
            .parse()
            .map_err(|_| StateError::MalformedAgentId(agent_id.to_string()).into())
    }

    fn registry(&self, which: Registry) -> Result<(CanonicalAddress, &AbiDispatcher), SdkError> {
        let contracts = &self.inner.network.contracts;
        let pair = match which {
            Registry::Identity => (contracts.identity()?, &self.inner.interfaces.identity),
            Registry::Reputation => (contracts.reputation()?, &self.inner.interfaces.reputation),
            Registry::Validation => (contracts.validation()?, &self.inner.interfaces.validation),
        };
        Ok(pair)
    }

    async fn read(
        &self,
        which: Registry,
        name: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, SdkError> {
        let (contract, dispatcher) = self.registry(which)?;
        let function = dispatcher.resolve(name, args.len())?;
        Ok(self.inner.adapter.call(contract, function, args).await?)
    }

    async fn write(
        &self,
        which: Registry,
        name: &str,
        args: &[DynSolValue],
    ) -> Result<TransactionHandle<()>, SdkError> {
        let (contract, dispatcher) = self.registry(which)?;
        let function = dispatcher.resolve(name, args.len())?;
        let tx_id = self.inner.adapter.submit(contract, function, args).await?;
        Ok(self.unit_handle(tx_id))
    }

    fn unit_handle(&self, tx_id: String) -> TransactionHandle<()> {
        TransactionHandle::new(tx_id, self.inner.adapter.clone(), |_| Ok(()))
    }

    // ---- identity registry ----

    pub(crate) async fn submit_registration(
        &self,
        agent_uri: Option<&str>,
        metadata: &[MetadataEntry],
    ) -> Result<TransactionHandle<Option<u64>>, SdkError> {
        let (contract, dispatcher) = self.registry(Registry::Identity)?;
        let (function, args) = if !metadata.is_empty() {
            let entries = metadata.iter().map(MetadataEntry::to_value).collect();
            (
                dispatcher.resolve("register", 2)?,
                vec![
                    DynSolValue::String(agent_uri.unwrap_or_default().to_string()),
                    DynSolValue::Array(entries),
                ],
            )
        } else if let Some(uri) = agent_uri {
            (
                dispatcher.resolve("register", 1)?,
                vec![DynSolValue::String(uri.to_string())],
            )
        } else {
            (dispatcher.resolve("register", 0)?, vec![])
        };

        let tx_id = self.inner.adapter.submit(contract, function, &args).await?;
        info!(tx = %tx_id, "agent registration submitted");
        Ok(TransactionHandle::new(
            tx_id,
            self.inner.adapter.clone(),
            |receipt| Ok(emitted_token_id(receipt, REGISTERED_EVENT)),
        ))
    }

    pub async fn token_uri(&self, token_id: u64) -> Result<String, SdkError> {
        let values = self
            .read(Registry::Identity, "tokenURI", &[uint(token_id)])
            .await?;
        expect_string(values.first(), "tokenURI")
    }

    pub async fn owner_of(&self, token_id: u64) -> Result<CanonicalAddress, SdkError> {
        let values = self
            .read(Registry::Identity, "ownerOf", &[uint(token_id)])
            .await?;
        expect_address(values.first(), "ownerOf")
    }

    /// Native-form owner address for an agent id.
    pub async fn agent_owner(&self, agent_id: &str) -> Result<String, SdkError> {
        let token_id = self.parse_agent_id(agent_id)?;
        let owner = self.owner_of(token_id).await?;
        Ok(owner.to_native(self.family()))
    }

    /// Whether `address` (native form) owns the agent.
    pub async fn is_agent_owner(&self, agent_id: &str, address: &str) -> Result<bool, SdkError> {
        let token_id = self.parse_agent_id(agent_id)?;
        let candidate = CanonicalAddress::parse(address, self.family())?;
        let owner = self.owner_of(token_id).await?;
        Ok(owner == candidate)
    }

    /// Whether the configured signer (or `address`, when given) may
    /// transfer the agent, i.e. owns it.
    pub async fn can_transfer_agent(
        &self,
        agent_id: &str,
        address: Option<&str>,
    ) -> Result<bool, SdkError> {
        if let Some(address) = address {
            return self.is_agent_owner(agent_id, address).await;
        }
        let Some(signer) = self.inner.adapter.signer_address() else {
            return Ok(false);
        };
        let token_id = self.parse_agent_id(agent_id)?;
        Ok(self.owner_of(token_id).await? == signer)
    }

    /// Transfer agent ownership to `new_owner` (native form).
    ///
    /// The current owner is read fresh and must be the configured
    /// signer; anything else would only revert on chain.
    pub async fn transfer_agent(
        &self,
        agent_id: &str,
        new_owner: &str,
    ) -> Result<TransactionHandle<()>, SdkError> {
        let token_id = self.parse_agent_id(agent_id)?;
        let new_owner = CanonicalAddress::parse(new_owner, self.family())?;
        let signer = self
            .inner
            .adapter
            .signer_address()
            .ok_or(TransactionError::SignerRequired)?;
        let owner = self.owner_of(token_id).await?;
        if owner != signer {
            return Err(StateError::NotAgentOwner {
                agent_id: agent_id.to_string(),
                owner: owner.to_native(self.family()),
            }
            .into());
        }
        self.write(
            Registry::Identity,
            "transferFrom",
            &[
                DynSolValue::Address(owner.to_evm()),
                DynSolValue::Address(new_owner.to_evm()),
                uint(token_id),
            ],
        )
        .await
    }

    /// Currently bound agent wallet; the zero address means unset.
    pub async fn agent_wallet(&self, token_id: u64) -> Result<CanonicalAddress, SdkError> {
        let values = self
            .read(Registry::Identity, "getAgentWallet", &[uint(token_id)])
            .await?;
        expect_address(values.first(), "getAgentWallet")
    }

    pub async fn agent_metadata(&self, token_id: u64, key: &str) -> Result<Vec<u8>, SdkError> {
        let values = self
            .read(
                Registry::Identity,
                "getMetadata",
                &[uint(token_id), DynSolValue::String(key.to_string())],
            )
            .await?;
        expect_bytes(values.first(), "getMetadata")
    }

    pub(crate) async fn submit_token_uri(
        &self,
        token_id: u64,
        uri: &str,
    ) -> Result<TransactionHandle<()>, SdkError> {
        self.write(
            Registry::Identity,
            "setTokenURI",
            &[uint(token_id), DynSolValue::String(uri.to_string())],
        )
        .await
    }

    pub(crate) async fn submit_metadata(
        &self,
        token_id: u64,
        entries: &[MetadataEntry],
    ) -> Result<TransactionHandle<()>, SdkError> {
        let values = entries.iter().map(MetadataEntry::to_value).collect();
        self.write(
            Registry::Identity,
            "setMetadata",
            &[uint(token_id), DynSolValue::Array(values)],
        )
        .await
    }

    pub(crate) async fn submit_wallet_binding(
        &self,
        token_id: u64,
        new_wallet_key: &PrivateKeySigner,
        deadline_secs: Option<u64>,
    ) -> Result<TransactionHandle<()>, SdkError> {
        let (contract, dispatcher) = self.registry(Registry::Identity)?;
        let owner = self
            .inner
            .adapter
            .signer_address()
            .ok_or(SignatureError::SignerRequired)?;

        let window = deadline_secs.unwrap_or(DEFAULT_APPROVAL_WINDOW_SECS);
        if window > MAX_APPROVAL_WINDOW_SECS {
            return Err(SignatureError::DeadlineTooFar {
                deadline: window,
                ceiling: MAX_APPROVAL_WINDOW_SECS,
            }
            .into());
        }
        let deadline = unix_now() + window;

        let approval = WalletApproval {
            agent_id: token_id,
            new_wallet: new_wallet_key.address(),
            owner: owner.to_evm(),
            deadline,
        };
        let signature = self.inner.typed_signer.sign_approval(
            &approval,
            &self.inner.network,
            contract.to_evm(),
            new_wallet_key,
        )?;

        let function = dispatcher.resolve("setAgentWallet", 4)?;
        let args = vec![
            uint(token_id),
            DynSolValue::Address(approval.new_wallet),
            uint(deadline),
            DynSolValue::Bytes(signature),
        ];
        let tx_id = self.inner.adapter.submit(contract, function, &args).await?;
        Ok(self.unit_handle(tx_id))
    }

    pub(crate) async fn submit_wallet_unbinding(
        &self,
        token_id: u64,
    ) -> Result<TransactionHandle<()>, SdkError> {
        self.write(Registry::Identity, "unsetAgentWallet", &[uint(token_id)])
            .await
    }

    // ---- reputation registry ----

    /// Submit a feedback score for an agent. Encoding is exact; a value
    /// the fixed-point representation cannot carry is an error, never an
    /// approximation.
    pub async fn give_feedback(
        &self,
        agent_id: &str,
        value: Decimal,
        tag1: Option<&str>,
        tag2: Option<&str>,
        file_uri: Option<&str>,
        file_hash: Option<B256>,
    ) -> Result<TransactionHandle<()>, SdkError> {
        let token_id = self.parse_agent_id(agent_id)?;
        let (raw, exponent) = feedback::encode(value)?;
        let raw_int = I256::try_from(raw).map_err(|e| TransactionError::Encode {
            method: "giveFeedback".to_string(),
            reason: e.to_string(),
        })?;
        self.write(
            Registry::Reputation,
            "giveFeedback",
            &[
                uint(token_id),
                DynSolValue::Int(raw_int, 128),
                DynSolValue::Uint(U256::from(exponent), 8),
                DynSolValue::String(tag1.unwrap_or_default().to_string()),
                DynSolValue::String(tag2.unwrap_or_default().to_string()),
                DynSolValue::String(file_uri.unwrap_or_default().to_string()),
                DynSolValue::FixedBytes(file_hash.unwrap_or_default(), 32),
            ],
        )
        .await
    }

    pub async fn read_feedback(
        &self,
        agent_id: &str,
        client: &str,
        index: u64,
    ) -> Result<FeedbackEntry, SdkError> {
        let token_id = self.parse_agent_id(agent_id)?;
        let client = CanonicalAddress::parse(client, self.family())?;
        let values = self
            .read(
                Registry::Reputation,
                "readFeedback",
                &[uint(token_id), DynSolValue::Address(client.to_evm()), uint(index)],
            )
            .await?;

        let raw = expect_i128(values.first(), "readFeedback")?;
        let exponent = expect_u8(values.get(1), "readFeedback")?;
        Ok(FeedbackEntry {
            value: feedback::decode(raw, exponent)?,
            raw,
            exponent,
            tag1: expect_string(values.get(2), "readFeedback")?,
            tag2: expect_string(values.get(3), "readFeedback")?,
            revoked: expect_bool(values.get(4), "readFeedback")?,
        })
    }

    pub async fn revoke_feedback(
        &self,
        agent_id: &str,
        index: u64,
    ) -> Result<TransactionHandle<()>, SdkError> {
        let token_id = self.parse_agent_id(agent_id)?;
        self.write(
            Registry::Reputation,
            "revokeFeedback",
            &[uint(token_id), uint(index)],
        )
        .await
    }

    /// Index of the latest feedback `client` gave this agent.
    pub async fn last_feedback_index(
        &self,
        agent_id: &str,
        client: &str,
    ) -> Result<u64, SdkError> {
        let token_id = self.parse_agent_id(agent_id)?;
        let client = CanonicalAddress::parse(client, self.family())?;
        let values = self
            .read(
                Registry::Reputation,
                "getLastIndex",
                &[uint(token_id), DynSolValue::Address(client.to_evm())],
            )
            .await?;
        expect_u64(values.first(), "getLastIndex")
    }

    pub async fn reputation_summary(&self, agent_id: &str) -> Result<FeedbackSummary, SdkError> {
        let token_id = self.parse_agent_id(agent_id)?;
        let values = self
            .read(Registry::Reputation, "getSummary", &[uint(token_id)])
            .await?;
        Ok(FeedbackSummary {
            count: expect_u64(values.first(), "getSummary")?,
            raw_summary: expect_i128(values.get(1), "getSummary")?,
            exponent: expect_u8(values.get(2), "getSummary")?,
        })
    }

    // ---- validation registry ----

    /// Request validation of `request_uri` content by `validator`.
    ///
    /// When no hash is supplied it is derived as keccak256 of the URI.
    /// Returns the hash actually used alongside the handle; the contract
    /// enforces hash uniqueness, and a hash this instance already
    /// submitted is rejected before it reaches the chain.
    pub async fn validation_request(
        &self,
        validator: &str,
        agent_id: &str,
        request_uri: &str,
        request_hash: Option<B256>,
    ) -> Result<(B256, TransactionHandle<()>), SdkError> {
        let token_id = self.parse_agent_id(agent_id)?;
        let validator = CanonicalAddress::parse(validator, self.family())?;
        let hash = request_hash.unwrap_or_else(|| keccak256(request_uri.as_bytes()));

        // Reserve the hash before submitting so a concurrent call with
        // the same hash cannot slip through while this one is in flight;
        // a failed submission releases the reservation.
        {
            let mut seen = self.inner.submitted_request_hashes.lock().map_err(|_| {
                TransactionError::Rpc("request-hash guard poisoned".to_string())
            })?;
            if !seen.insert(hash) {
                return Err(StateError::DuplicateRequestHash(format!("{hash:#x}")).into());
            }
        }

        let submitted = self
            .write(
                Registry::Validation,
                "validationRequest",
                &[
                    DynSolValue::Address(validator.to_evm()),
                    uint(token_id),
                    DynSolValue::String(request_uri.to_string()),
                    DynSolValue::FixedBytes(hash, 32),
                ],
            )
            .await;

        match submitted {
            Ok(handle) => Ok((hash, handle)),
            Err(e) => {
                if let Ok(mut seen) = self.inner.submitted_request_hashes.lock() {
                    seen.remove(&hash);
                }
                Err(e)
            }
        }
    }

    /// Respond to a validation request with a score in `0..=100`.
    pub async fn validation_response(
        &self,
        request_hash: B256,
        score: u8,
        response_uri: Option<&str>,
        response_hash: Option<B256>,
        tag: Option<B256>,
    ) -> Result<TransactionHandle<()>, SdkError> {
        if score > 100 {
            return Err(FeedbackError::OutOfRange(score.to_string()).into());
        }
        self.write(
            Registry::Validation,
            "validationResponse",
            &[
                DynSolValue::FixedBytes(request_hash, 32),
                DynSolValue::Uint(U256::from(score), 8),
                DynSolValue::String(response_uri.unwrap_or_default().to_string()),
                DynSolValue::FixedBytes(response_hash.unwrap_or_default(), 32),
                DynSolValue::FixedBytes(tag.unwrap_or_default(), 32),
            ],
        )
        .await
    }

    pub async fn validation_status(
        &self,
        request_hash: B256,
    ) -> Result<ValidationStatus, SdkError> {
        let values = self
            .read(
                Registry::Validation,
                "getValidationStatus",
                &[DynSolValue::FixedBytes(request_hash, 32)],
            )
            .await?;
        Ok(ValidationStatus {
            validator: expect_address(values.first(), "getValidationStatus")?,
            token_id: expect_u64(values.get(1), "getValidationStatus")?,
            response: expect_u8(values.get(2), "getValidationStatus")?,
            responded: expect_bool(values.get(3), "getValidationStatus")?,
        })
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn uint(value: u64) -> DynSolValue {
    DynSolValue::Uint(U256::from(value), 256)
}

fn decode_err(method: &str, reason: &str) -> SdkError {
    TransactionError::Decode {
        method: method.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

fn expect_u64(value: Option<&DynSolValue>, method: &str) -> Result<u64, SdkError> {
    match value {
        Some(DynSolValue::Uint(u, _)) => {
            u64::try_from(*u).map_err(|_| decode_err(method, "uint out of u64 range"))
        }
        _ => Err(decode_err(method, "expected uint")),
    }
}

fn expect_u8(value: Option<&DynSolValue>, method: &str) -> Result<u8, SdkError> {
    match value {
        Some(DynSolValue::Uint(u, _)) => {
            u8::try_from(*u).map_err(|_| decode_err(method, "uint out of u8 range"))
        }
        _ => Err(decode_err(method, "expected uint8")),
    }
}

fn expect_i128(value: Option<&DynSolValue>, method: &str) -> Result<i128, SdkError> {
    match value {
        Some(DynSolValue::Int(i, _)) => {
            i128::try_from(*i).map_err(|_| decode_err(method, "int out of i128 range"))
        }
        _ => Err(decode_err(method, "expected int")),
    }
}

fn expect_address(value: Option<&DynSolValue>, method: &str) -> Result<CanonicalAddress, SdkError> {
    match value {
        Some(DynSolValue::Address(a)) => Ok(CanonicalAddress::from(*a)),
        _ => Err(decode_err(method, "expected address")),
    }
}

fn expect_string(value: Option<&DynSolValue>, method: &str) -> Result<String, SdkError> {
    match value {
        Some(DynSolValue::String(s)) => Ok(s.clone()),
        _ => Err(decode_err(method, "expected string")),
    }
}

fn expect_bool(value: Option<&DynSolValue>, method: &str) -> Result<bool, SdkError> {
    match value {
        Some(DynSolValue::Bool(b)) => Ok(*b),
        _ => Err(decode_err(method, "expected bool")),
    }
}

fn expect_bytes(value: Option<&DynSolValue>, method: &str) -> Result<Vec<u8>, SdkError> {
    match value {
        Some(DynSolValue::Bytes(b)) => Ok(b.clone()),
        _ => Err(decode_err(method, "expected bytes")),
    }
}
