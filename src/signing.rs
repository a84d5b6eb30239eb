//! EIP-712 wallet-binding approvals.
//!
//! Binding a wallet to an agent requires the new wallet to sign a
//! domain-separated approval that the identity registry verifies on
//! chain. The signed struct's field order and names must match the
//! contract's type hash exactly; a drift there produces signatures that
//! verify locally but are rejected on chain, so every signature goes
//! through a recover-and-compare self-check before it leaves this module.

use std::borrow::Cow;
use std::collections::BTreeMap;

use alloy::primitives::{Address, B256, U256};
use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::{Eip712Domain, SolStruct};
use tracing::debug;

use crate::error::SignatureError;
use crate::network::{ChainFamily, NetworkDescriptor};

sol! {
    /// Must mirror the identity registry's `AGENT_WALLET_SET_TYPEHASH`
    /// field for field.
    struct AgentWalletSet {
        uint256 agentId;
        address newWallet;
        address owner;
        uint256 deadline;
    }
}

/// The approval payload: "bind wallet `new_wallet` to agent `agent_id`,
/// authorized by `owner`, valid until `deadline`".
#[derive(Debug, Clone, Copy)]
pub struct WalletApproval {
    pub agent_id: u64,
    pub new_wallet: Address,
    pub owner: Address,
    /// Unix timestamp (seconds).
    pub deadline: u64,
}

/// Versioned domain configuration.
///
/// The name/version strings identify the verifying contract's deployed
/// EIP-712 domain; TRON networks have no native numeric chain id usable
/// here, so a static surrogate table maps their symbolic names to fixed
/// ids. Both are configuration, not incidental literals: a contract
/// upgrade that changes the domain invalidates prior signatures, and
/// the table must be audited against the deployed domain.
#[derive(Debug, Clone)]
pub struct DomainConfig {
    pub name: String,
    pub version: String,
    pub surrogate_chain_ids: BTreeMap<String, u64>,
}

impl Default for DomainConfig {
    fn default() -> Self {
        // TRON's EVM-compatibility ids, as registered with wallet tooling.
        let surrogate_chain_ids = BTreeMap::from([
            ("mainnet".to_string(), 728126428),
            ("shasta".to_string(), 2494104990),
            ("nile".to_string(), 3448148188),
        ]);
        DomainConfig {
            name: "ERC8004IdentityRegistry".to_string(),
            version: "1".to_string(),
            surrogate_chain_ids,
        }
    }
}

/// Builds, signs and verifies wallet-binding approvals.
#[derive(Debug, Clone, Default)]
pub struct TypedDataSigner {
    config: DomainConfig,
}

impl TypedDataSigner {
    pub fn new(config: DomainConfig) -> Self {
        TypedDataSigner { config }
    }

    /// The numeric chain id that goes into the signing domain.
    pub fn domain_chain_id(&self, network: &NetworkDescriptor) -> Result<u64, SignatureError> {
        match network.family {
            ChainFamily::Evm => Ok(network.chain_id),
            ChainFamily::Tron => {
                let symbolic = network.symbolic.as_deref().unwrap_or_default();
                self.config
                    .surrogate_chain_ids
                    .get(symbolic)
                    .copied()
                    .ok_or_else(|| SignatureError::NoSurrogateChainId(symbolic.to_string()))
            }
        }
    }

    /// EIP-712 signing hash for the approval on the given network.
    pub fn signing_hash(
        &self,
        approval: &WalletApproval,
        network: &NetworkDescriptor,
        verifying_contract: Address,
    ) -> Result<B256, SignatureError> {
        let chain_id = self.domain_chain_id(network)?;
        let domain = Eip712Domain {
            name: Some(Cow::Owned(self.config.name.clone())),
            version: Some(Cow::Owned(self.config.version.clone())),
            chain_id: Some(U256::from(chain_id)),
            verifying_contract: Some(verifying_contract),
            salt: None,
        };
        let message = AgentWalletSet {
            agentId: U256::from(approval.agent_id),
            newWallet: approval.new_wallet,
            owner: approval.owner,
            deadline: U256::from(approval.deadline),
        };
        Ok(message.eip712_signing_hash(&domain))
    }

    /// Sign the approval with the new wallet's key.
    ///
    /// The key must belong to `approval.new_wallet`: the registry takes
    /// the signature as proof of control over the incoming wallet. After
    /// signing, the address is recovered from the signature and compared
    /// against `new_wallet`; a mismatch raises
    /// [`SignatureError::SignatureMismatch`] instead of letting a
    /// locally-consistent but on-chain-rejected signature through.
    pub fn sign_approval(
        &self,
        approval: &WalletApproval,
        network: &NetworkDescriptor,
        verifying_contract: Address,
        new_wallet_key: &PrivateKeySigner,
    ) -> Result<Vec<u8>, SignatureError> {
        let hash = self.signing_hash(approval, network, verifying_contract)?;
        let signature = new_wallet_key
            .sign_hash_sync(&hash)
            .map_err(|e| SignatureError::Signing(e.to_string()))?;

        let recovered = signature
            .recover_address_from_prehash(&hash)
            .map_err(|e| SignatureError::Signing(e.to_string()))?;
        if recovered != approval.new_wallet {
            return Err(SignatureError::SignatureMismatch {
                recovered: format!("{recovered:#x}"),
                expected: format!("{:#x}", approval.new_wallet),
            });
        }

        debug!(
            agent_id = approval.agent_id,
            wallet = %format!("{:#x}", approval.new_wallet),
            "wallet approval signed and self-checked"
        );
        Ok(signature.as_bytes().to_vec())
    }

    /// Recover the signer address from an approval signature.
    pub fn recover(
        &self,
        approval: &WalletApproval,
        network: &NetworkDescriptor,
        verifying_contract: Address,
        signature: &[u8],
    ) -> Result<Address, SignatureError> {
        let hash = self.signing_hash(approval, network, verifying_contract)?;
        let parsed = alloy::primitives::Signature::from_raw(signature)
            .map_err(|e| SignatureError::Signing(e.to_string()))?;
        parsed
            .recover_address_from_prehash(&hash)
            .map_err(|e| SignatureError::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::resolve_network;
    use pretty_assertions::assert_eq;

    fn test_contract() -> Address {
        "0x00000000000000000000000000000000000a11ce"
            .parse()
            .unwrap()
    }

    fn approval_for(key: &PrivateKeySigner) -> WalletApproval {
        WalletApproval {
            agent_id: 7,
            new_wallet: key.address(),
            owner: "0x00000000000000000000000000000000000000b0".parse().unwrap(),
            deadline: 1_900_000_000,
        }
    }

    #[test]
    fn signature_recovers_to_the_new_wallet() {
        let network = resolve_network("eip155:97", None).unwrap();
        let key = PrivateKeySigner::random();
        let signer = TypedDataSigner::default();
        let approval = approval_for(&key);

        let sig = signer
            .sign_approval(&approval, &network, test_contract(), &key)
            .unwrap();
        let recovered = signer
            .recover(&approval, &network, test_contract(), &sig)
            .unwrap();
        assert_eq!(recovered, key.address());
    }

    #[test]
    fn signing_with_the_wrong_key_fails_the_self_check() {
        let network = resolve_network("eip155:97", None).unwrap();
        let wallet_key = PrivateKeySigner::random();
        let wrong_key = PrivateKeySigner::random();
        let signer = TypedDataSigner::default();
        let approval = approval_for(&wallet_key);

        let err = signer
            .sign_approval(&approval, &network, test_contract(), &wrong_key)
            .unwrap_err();
        assert!(matches!(err, SignatureError::SignatureMismatch { .. }));
    }

    #[test]
    fn mutating_any_field_invalidates_the_signature() {
        let network = resolve_network("eip155:97", None).unwrap();
        let key = PrivateKeySigner::random();
        let signer = TypedDataSigner::default();
        let approval = approval_for(&key);
        let sig = signer
            .sign_approval(&approval, &network, test_contract(), &key)
            .unwrap();

        let mutations = [
            WalletApproval { agent_id: 8, ..approval },
            WalletApproval {
                new_wallet: PrivateKeySigner::random().address(),
                ..approval
            },
            WalletApproval {
                owner: PrivateKeySigner::random().address(),
                ..approval
            },
            WalletApproval { deadline: approval.deadline + 1, ..approval },
        ];
        for mutated in mutations {
            let recovered = signer
                .recover(&mutated, &network, test_contract(), &sig)
                .unwrap();
            assert_ne!(recovered, key.address(), "mutation must break recovery");
        }
    }

    #[test]
    fn tron_networks_use_surrogate_chain_ids() {
        let signer = TypedDataSigner::default();
        let nile = resolve_network("tron:nile", None).unwrap();
        assert_eq!(signer.domain_chain_id(&nile).unwrap(), 3448148188);
        let mainnet = resolve_network("tron", None).unwrap();
        assert_eq!(signer.domain_chain_id(&mainnet).unwrap(), 728126428);
    }

    #[test]
    fn evm_networks_use_their_native_chain_id() {
        let signer = TypedDataSigner::default();
        let bsc = resolve_network("eip155:56", None).unwrap();
        assert_eq!(signer.domain_chain_id(&bsc).unwrap(), 56);
    }

    #[test]
    fn unknown_surrogate_is_an_error() {
        let mut network = resolve_network("tron:nile", None).unwrap();
        network.symbolic = Some("devnet".to_string());
        let signer = TypedDataSigner::default();
        assert!(matches!(
            signer.domain_chain_id(&network),
            Err(SignatureError::NoSurrogateChainId(_))
        ));
    }

    #[test]
    fn domain_version_bump_changes_the_hash() {
        let network = resolve_network("eip155:97", None).unwrap();
        let key = PrivateKeySigner::random();
        let approval = approval_for(&key);

        let v1 = TypedDataSigner::default();
        let v2 = TypedDataSigner::new(DomainConfig {
            version: "2".to_string(),
            ..DomainConfig::default()
        });
        let h1 = v1.signing_hash(&approval, &network, test_contract()).unwrap();
        let h2 = v2.signing_hash(&approval, &network, test_contract()).unwrap();
        assert_ne!(h1, h2, "signatures are not portable across domain versions");
    }
}
