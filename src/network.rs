//! Network registry and descriptors.
//!
//! A network identifier string (CAIP-style `eip155:<id>`, a bare TRON
//! keyword, or a `tron:<name>` qualified keyword) resolves against a
//! static registry into an immutable [`NetworkDescriptor`]. Resolution is
//! deterministic; a caller-supplied chain id that disagrees with the one
//! the string implies is rejected rather than silently overridden.

use crate::address::CanonicalAddress;
use crate::error::ConfigError;

/// The two chain families the client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainFamily {
    /// EVM-style chains (hex addresses, JSON-RPC, receipt status field).
    Evm,
    /// TRON (base58check addresses, wallet HTTP API, fee-limited writes).
    Tron,
}

impl ChainFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainFamily::Evm => "evm",
            ChainFamily::Tron => "tron",
        }
    }
}

/// Registry contract addresses for one network.
///
/// All three are optional at construction; an operation that needs a
/// missing one fails with [`ConfigError::MissingContractAddress`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ContractAddresses {
    pub identity: Option<CanonicalAddress>,
    pub reputation: Option<CanonicalAddress>,
    pub validation: Option<CanonicalAddress>,
}

impl ContractAddresses {
    pub fn identity(&self) -> Result<CanonicalAddress, ConfigError> {
        self.identity
            .ok_or(ConfigError::MissingContractAddress { registry: "identity" })
    }

    pub fn reputation(&self) -> Result<CanonicalAddress, ConfigError> {
        self.reputation
            .ok_or(ConfigError::MissingContractAddress { registry: "reputation" })
    }

    pub fn validation(&self) -> Result<CanonicalAddress, ConfigError> {
        self.validation
            .ok_or(ConfigError::MissingContractAddress { registry: "validation" })
    }
}

/// Immutable description of the network the SDK is bound to.
///
/// Resolved once at construction and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct NetworkDescriptor {
    pub family: ChainFamily,
    /// Numeric chain id. For TRON this is the network's EVM-compatibility
    /// id, which doubles as the composite-agent-id prefix.
    pub chain_id: u64,
    /// Canonical registry token, e.g. `eip155:97` or `tron:nile`.
    pub token: String,
    /// Symbolic name for TRON networks (`mainnet`, `shasta`, `nile`),
    /// used to look up the typed-data surrogate chain id.
    pub symbolic: Option<String>,
    pub rpc_endpoint: String,
    pub contracts: ContractAddresses,
}

struct NetworkEntry {
    token: &'static str,
    aliases: &'static [&'static str],
    family: ChainFamily,
    chain_id: u64,
    symbolic: Option<&'static str>,
    default_rpc: &'static str,
}

/// Known networks. Contract addresses are deployment-specific and are
/// always supplied by the caller.
static NETWORKS: &[NetworkEntry] = &[
    NetworkEntry {
        token: "eip155:1",
        aliases: &["ethereum"],
        family: ChainFamily::Evm,
        chain_id: 1,
        symbolic: None,
        default_rpc: "https://cloudflare-eth.com",
    },
    NetworkEntry {
        token: "eip155:56",
        aliases: &["bsc"],
        family: ChainFamily::Evm,
        chain_id: 56,
        symbolic: None,
        default_rpc: "https://bsc-dataseed.binance.org",
    },
    NetworkEntry {
        token: "eip155:97",
        aliases: &["bsc-testnet"],
        family: ChainFamily::Evm,
        chain_id: 97,
        symbolic: None,
        default_rpc: "https://data-seed-prebsc-1-s1.binance.org:8545",
    },
    NetworkEntry {
        token: "tron:mainnet",
        aliases: &["tron", "mainnet"],
        family: ChainFamily::Tron,
        chain_id: 728126428,
        symbolic: Some("mainnet"),
        default_rpc: "https://api.trongrid.io",
    },
    NetworkEntry {
        token: "tron:shasta",
        aliases: &["shasta"],
        family: ChainFamily::Tron,
        chain_id: 2494104990,
        symbolic: Some("shasta"),
        default_rpc: "https://api.shasta.trongrid.io",
    },
    NetworkEntry {
        token: "tron:nile",
        aliases: &["nile"],
        family: ChainFamily::Tron,
        chain_id: 3448148188,
        symbolic: Some("nile"),
        default_rpc: "https://nile.trongrid.io",
    },
];

/// Resolve a network identifier string against the static registry.
///
/// `expected_chain_id`, when supplied, must agree with the id the string
/// implies; a mismatch is a [`ConfigError::ChainIdMismatch`].
pub fn resolve_network(
    input: &str,
    expected_chain_id: Option<u64>,
) -> Result<NetworkDescriptor, ConfigError> {
    let needle = input.trim().to_ascii_lowercase();

    let entry = NETWORKS
        .iter()
        .find(|e| e.token == needle || e.aliases.contains(&needle.as_str()))
        .ok_or_else(|| ConfigError::UnsupportedNetwork {
            input: input.to_string(),
            supported: supported_tokens(),
        })?;

    if let Some(supplied) = expected_chain_id
        && supplied != entry.chain_id
    {
        return Err(ConfigError::ChainIdMismatch {
            network: entry.token.to_string(),
            supplied,
            expected: entry.chain_id,
        });
    }

    Ok(NetworkDescriptor {
        family: entry.family,
        chain_id: entry.chain_id,
        token: entry.token.to_string(),
        symbolic: entry.symbolic.map(str::to_string),
        rpc_endpoint: entry.default_rpc.to_string(),
        contracts: ContractAddresses::default(),
    })
}

fn supported_tokens() -> String {
    NETWORKS
        .iter()
        .map(|e| e.token)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn caip_style_token_resolves() {
        let net = resolve_network("eip155:97", None).unwrap();
        assert_eq!(net.family, ChainFamily::Evm);
        assert_eq!(net.chain_id, 97);
        assert_eq!(net.token, "eip155:97");
        assert!(net.symbolic.is_none());
    }

    #[test]
    fn bare_family_keyword_resolves_to_mainnet() {
        let net = resolve_network("tron", None).unwrap();
        assert_eq!(net.family, ChainFamily::Tron);
        assert_eq!(net.token, "tron:mainnet");
        assert_eq!(net.symbolic.as_deref(), Some("mainnet"));
    }

    #[test]
    fn qualified_keyword_and_bare_alias_agree() {
        let a = resolve_network("tron:nile", None).unwrap();
        let b = resolve_network("nile", None).unwrap();
        assert_eq!(a.token, b.token);
        assert_eq!(a.chain_id, b.chain_id);
    }

    #[test]
    fn resolution_is_case_insensitive() {
        let net = resolve_network("  TRON:NILE ", None).unwrap();
        assert_eq!(net.token, "tron:nile");
    }

    #[test]
    fn unknown_network_names_input_and_supported_set() {
        let err = resolve_network("eip155:99999", None).unwrap_err();
        match err {
            ConfigError::UnsupportedNetwork { input, supported } => {
                assert_eq!(input, "eip155:99999");
                assert!(supported.contains("eip155:97"));
                assert!(supported.contains("tron:nile"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn mismatched_chain_id_is_rejected() {
        let err = resolve_network("eip155:97", Some(56)).unwrap_err();
        assert!(matches!(err, ConfigError::ChainIdMismatch { supplied: 56, expected: 97, .. }));
    }

    #[test]
    fn agreeing_chain_id_is_accepted() {
        assert!(resolve_network("eip155:97", Some(97)).is_ok());
    }

    #[test]
    fn missing_contract_address_is_an_error_on_use() {
        let net = resolve_network("eip155:97", None).unwrap();
        assert!(matches!(
            net.contracts.identity(),
            Err(ConfigError::MissingContractAddress { registry: "identity" })
        ));
    }
}
