//! Cross-chain client for the ERC-8004 agent registries.
//!
//! Agents register an on-chain identity (an NFT pointing at an off-chain
//! registration file), accumulate reputation feedback, and take part in
//! validation flows. The registries are deployed both on EVM chains and
//! on TRON; this crate presents one API over both.
//!
//! # Architecture
//!
//! - Addresses are held in a chain-neutral canonical form
//!   ([`address::CanonicalAddress`]) and rendered per family only at the
//!   edges.
//! - All chain interaction goes through [`chain::ChainAdapter`]; the
//!   facade never branches on the chain family itself.
//! - Writes return a [`chain::TransactionHandle`] immediately and
//!   confirmation is a separate, memoized wait.
//! - Wallet binding uses EIP-712 approvals ([`signing`]) with surrogate
//!   chain ids on TRON.
//!
//! # Example
//!
//! ```no_run
//! use clawlink::{AgentProfile, Sdk};
//!
//! # async fn run() -> Result<(), clawlink::SdkError> {
//! let sdk = Sdk::builder("tron:nile")
//!     .with_identity_registry("TGehVcNhud84JDCGrNHKVz9jEvU8BvR3cj")
//!     .build()?;
//!
//! let mut profile = AgentProfile::new("helper", "answers questions");
//! profile.set_mcp("https://helper.example/mcp");
//! let mut agent = sdk.create_agent(profile);
//! let handle = agent.register(Some("ipfs://Qmprofile"), &[]).await?;
//! if let Some(token_id) = handle.wait_confirmed(&sdk.wait_options()).await?.result {
//!     agent.complete_registration(token_id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod abi;
pub mod address;
pub mod agent;
pub mod chain;
pub mod content;
pub mod error;
pub mod feedback;
pub mod network;
pub mod sdk;
pub mod signing;

pub use address::{CanonicalAddress, address_equal};
pub use agent::{Agent, AgentEndpoint, AgentProfile};
pub use chain::{TransactionHandle, TxReceipt, WaitOptions};
pub use error::SdkError;
pub use feedback::FeedbackSummary;
pub use network::{ChainFamily, NetworkDescriptor, resolve_network};
pub use sdk::{FeedbackEntry, MetadataEntry, Sdk, SdkBuilder, ValidationStatus, parse_bytes32};
pub use signing::{DomainConfig, TypedDataSigner, WalletApproval};
