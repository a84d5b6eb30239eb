//! Error taxonomy for the client.
//!
//! Each concern has its own error enum so callers can match precisely;
//! [`SdkError`] is the umbrella type the facade surfaces. Nothing here is
//! retried internally — every error is raised synchronously to the
//! immediate caller, and retry policy belongs to the application.

/// Configuration problems detected at construction or first use.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The network identifier did not match any registry entry.
    #[error("unsupported network '{input}' (supported: {supported})")]
    UnsupportedNetwork { input: String, supported: String },

    /// A caller-supplied chain id disagrees with the one the network
    /// string resolves to.
    #[error("chain id {supplied} does not match network '{network}' (expected {expected})")]
    ChainIdMismatch {
        network: String,
        supplied: u64,
        expected: u64,
    },

    /// A registry contract address is needed but was never configured.
    #[error("no {registry} registry address configured for this network")]
    MissingContractAddress { registry: &'static str },

    /// The RPC endpoint is not a valid URL.
    #[error("invalid rpc endpoint '{0}'")]
    InvalidRpcEndpoint(String),

    /// The private key material could not be parsed.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
}

/// Malformed or structurally wrong addresses.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    /// Wrong length, prefix, or character set for the declared chain family.
    #[error("invalid {family} address '{input}': {reason}")]
    InvalidAddress {
        family: &'static str,
        input: String,
        reason: String,
    },

    /// Base58check payload failed its checksum.
    #[error("address '{0}' failed base58check verification")]
    ChecksumMismatch(String),
}

/// Contract method resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No method descriptor matches the requested name and argument count.
    #[error("no contract method '{name}' taking {argc} argument(s)")]
    MethodNotFound { name: String, argc: usize },

    /// More than one overload matches and the caller supplied no further
    /// disambiguator.
    #[error("ambiguous contract method '{name}' with {argc} argument(s); disambiguate by full signature")]
    AmbiguousMethod { name: String, argc: usize },

    /// A signature string in an interface table failed to parse.
    #[error("invalid method signature '{signature}': {reason}")]
    InvalidSignature { signature: String, reason: String },
}

/// Typed-data signing and verification failures.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// Signing was requested but no key material is configured.
    #[error("no signer configured for this operation")]
    SignerRequired,

    /// The post-sign self-check recovered a different address than the
    /// wallet being bound. The signed struct no longer matches the
    /// verifying contract's type hash.
    #[error("signature self-check failed: recovered {recovered}, expected {expected}")]
    SignatureMismatch { recovered: String, expected: String },

    /// No surrogate chain id is registered for an account-model network.
    #[error("no surrogate chain id registered for network '{0}'")]
    NoSurrogateChainId(String),

    /// The underlying signer reported an error.
    #[error("signing failed: {0}")]
    Signing(String),

    /// The deadline exceeds the ceiling the contract will accept.
    #[error("deadline {deadline} exceeds the maximum approval window ({ceiling} seconds from now)")]
    DeadlineTooFar { deadline: u64, ceiling: u64 },
}

/// Transaction submission, read, and confirmation failures.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// A write was attempted without configured signing material.
    #[error("cannot submit transaction: no signer configured")]
    SignerRequired,

    /// No terminal state was observed within the wait budget. The
    /// transaction may still be mined later; only the client's wait is
    /// bounded.
    #[error("timed out after {waited_ms}ms waiting for transaction {tx_id}")]
    Timeout { tx_id: String, waited_ms: u64 },

    /// A terminal state was observed and it indicates failure. Carries the
    /// chain's raw terminal-state marker so callers can distinguish this
    /// from a timeout.
    #[error("transaction {tx_id} reverted (status: {marker})")]
    Reverted { tx_id: String, marker: String },

    /// The RPC surface returned an error or unusable response.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// Arguments could not be ABI-encoded for the resolved method.
    #[error("argument encoding failed for {method}: {reason}")]
    Encode { method: String, reason: String },

    /// A return value could not be decoded, even via the fallback path.
    #[error("return value decoding failed for {method}: {reason}")]
    Decode { method: String, reason: String },

    /// A caller-supplied 32-byte value has the wrong length. Hashes are
    /// never padded or truncated to fit.
    #[error("invalid bytes32 value '{input}': {reason}")]
    InvalidBytes32 { input: String, reason: String },
}

/// Fixed-point feedback value conversion failures.
#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    /// The value needs more precision than the on-chain representation
    /// can carry.
    #[error("value {0} cannot be represented as a fixed-point feedback score")]
    Unrepresentable(String),

    /// A raw/exponent pair read from chain does not decode to a decimal.
    #[error("cannot decode feedback value {raw} with exponent {exponent}")]
    Undecodable { raw: i128, exponent: u8 },

    /// Score outside the protocol range.
    #[error("score {0} is outside the accepted range")]
    OutOfRange(String),
}

/// Operations attempted in the wrong agent state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The agent has no on-chain identity yet.
    #[error("agent is not registered; call register() first")]
    AgentNotRegistered,

    /// `register` was already invoked on this in-memory agent.
    #[error("agent registration was already submitted from this instance")]
    AlreadyRegistered,

    /// An agent id names a different chain than the SDK is bound to.
    #[error("agent '{agent_id}' is not on chain {chain_id}")]
    WrongChain { agent_id: String, chain_id: u64 },

    /// The agent id string is not `tokenId` or `chainId:tokenId`.
    #[error("malformed agent id '{0}'")]
    MalformedAgentId(String),

    /// A transfer was attempted by a signer that does not own the agent.
    #[error("agent '{agent_id}' is owned by {owner}, not the configured signer")]
    NotAgentOwner { agent_id: String, owner: String },

    /// The same request hash was already submitted by this instance.
    /// The contract enforces uniqueness; resubmitting would revert.
    #[error("validation request hash {0} was already submitted")]
    DuplicateRequestHash(String),
}

/// Content fetching/uploading failures (external collaborators).
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("unsupported uri scheme in '{0}'")]
    UnsupportedScheme(String),

    #[error("fetch failed for '{uri}': {reason}")]
    Fetch { uri: String, reason: String },

    #[error("upload failed: {0}")]
    Upload(String),
}

/// Umbrella error surfaced by the facade.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Feedback(#[from] FeedbackError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Content(#[from] ContentError),
}
