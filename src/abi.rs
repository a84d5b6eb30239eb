//! Contract interface tables and overload resolution.
//!
//! TRON's call-by-name binding cannot disambiguate overloaded methods,
//! so every call goes through [`AbiDispatcher::resolve`] which selects a
//! unique descriptor by name and argument count. Where arity alone is
//! still ambiguous the caller must pass the full signature via
//! [`AbiDispatcher::resolve_signature`].

use alloy::json_abi::Function;

use crate::error::DispatchError;

/// Ordered method descriptor table for one contract.
#[derive(Debug, Clone)]
pub struct AbiDispatcher {
    methods: Vec<Function>,
}

impl AbiDispatcher {
    /// Build a dispatcher from human-readable signatures
    /// (e.g. `"function register(string tokenURI) returns (uint256)"`).
    pub fn from_signatures(signatures: &[&str]) -> Result<Self, DispatchError> {
        let methods = signatures
            .iter()
            .map(|sig| {
                Function::parse(sig).map_err(|e| DispatchError::InvalidSignature {
                    signature: (*sig).to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AbiDispatcher { methods })
    }

    /// Resolve the unique descriptor matching `name` with `argc` inputs.
    pub fn resolve(&self, name: &str, argc: usize) -> Result<&Function, DispatchError> {
        let mut matches = self
            .methods
            .iter()
            .filter(|f| f.name == name && f.inputs.len() == argc);

        let first = matches.next().ok_or_else(|| DispatchError::MethodNotFound {
            name: name.to_string(),
            argc,
        })?;

        if matches.next().is_some() {
            return Err(DispatchError::AmbiguousMethod {
                name: name.to_string(),
                argc,
            });
        }

        Ok(first)
    }

    /// Resolve by exact solidity signature (`"transfer(address,uint256)"`),
    /// the explicit disambiguator when arity is not enough.
    pub fn resolve_signature(&self, signature: &str) -> Result<&Function, DispatchError> {
        self.methods
            .iter()
            .find(|f| f.signature() == signature)
            .ok_or_else(|| DispatchError::MethodNotFound {
                name: signature.to_string(),
                argc: 0,
            })
    }

    pub fn methods(&self) -> &[Function] {
        &self.methods
    }
}

/// The three registry interfaces, built once at SDK construction and
/// shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct RegistryInterfaces {
    pub identity: AbiDispatcher,
    pub reputation: AbiDispatcher,
    pub validation: AbiDispatcher,
}

impl RegistryInterfaces {
    pub fn erc8004() -> Result<Self, DispatchError> {
        Ok(RegistryInterfaces {
            identity: AbiDispatcher::from_signatures(&[
                "function register() returns (uint256)",
                "function register(string tokenURI) returns (uint256)",
                "function register(string tokenURI, (string, bytes)[] metadata) returns (uint256)",
                "function setTokenURI(uint256 agentId, string uri)",
                "function tokenURI(uint256 agentId) returns (string)",
                "function ownerOf(uint256 agentId) returns (address)",
                "function transferFrom(address from, address to, uint256 agentId)",
                "function setMetadata(uint256 agentId, (string, bytes)[] metadata)",
                "function getMetadata(uint256 agentId, string key) returns (bytes)",
                "function getAgentWallet(uint256 agentId) returns (address)",
                "function setAgentWallet(uint256 agentId, address newWallet, uint256 deadline, bytes signature)",
                "function unsetAgentWallet(uint256 agentId)",
            ])?,
            reputation: AbiDispatcher::from_signatures(&[
                "function giveFeedback(uint256 agentId, int128 value, uint8 valueDecimals, string tag1, string tag2, string fileURI, bytes32 fileHash)",
                "function readFeedback(uint256 agentId, address client, uint64 index) returns (int128 value, uint8 valueDecimals, string tag1, string tag2, bool isRevoked)",
                "function revokeFeedback(uint256 agentId, uint64 index)",
                "function getLastIndex(uint256 agentId, address client) returns (uint64)",
                "function getSummary(uint256 agentId) returns (uint64 count, int128 summaryValue, uint8 summaryDecimals)",
            ])?,
            validation: AbiDispatcher::from_signatures(&[
                "function validationRequest(address validator, uint256 agentId, string requestURI, bytes32 requestHash)",
                "function validationResponse(bytes32 requestHash, uint8 response, string responseURI, bytes32 responseHash, bytes32 tag)",
                "function getValidationStatus(bytes32 requestHash) returns (address validator, uint256 agentId, uint8 response, bool responded)",
            ])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn transfer_table() -> AbiDispatcher {
        AbiDispatcher::from_signatures(&[
            "function transfer(address to, uint256 amount)",
            "function transfer(address from, address to, uint256 amount)",
        ])
        .unwrap()
    }

    #[test]
    fn resolves_overload_by_arity() {
        let table = transfer_table();
        let two = table.resolve("transfer", 2).unwrap();
        assert_eq!(two.inputs.len(), 2);
        let three = table.resolve("transfer", 3).unwrap();
        assert_eq!(three.inputs.len(), 3);
        // Deterministic: repeated resolution picks the same descriptor.
        assert_eq!(
            table.resolve("transfer", 3).unwrap().signature(),
            three.signature()
        );
    }

    #[test]
    fn unknown_method_is_not_found() {
        let table = transfer_table();
        let err = table.resolve("approve", 2).unwrap_err();
        assert!(matches!(err, DispatchError::MethodNotFound { .. }));
    }

    #[test]
    fn wrong_arity_is_not_found() {
        let table = transfer_table();
        let err = table.resolve("transfer", 1).unwrap_err();
        assert!(matches!(err, DispatchError::MethodNotFound { argc: 1, .. }));
    }

    #[test]
    fn same_name_same_arity_is_ambiguous() {
        let table = AbiDispatcher::from_signatures(&[
            "function poke(uint256 a)",
            "function poke(address b)",
        ])
        .unwrap();
        let err = table.resolve("poke", 1).unwrap_err();
        assert!(matches!(err, DispatchError::AmbiguousMethod { .. }));

        // Full signature still disambiguates.
        let by_sig = table.resolve_signature("poke(address)").unwrap();
        assert_eq!(by_sig.inputs[0].ty, "address");
    }

    #[test]
    fn registry_interfaces_parse() {
        let ifaces = RegistryInterfaces::erc8004().unwrap();
        // register is overloaded on arity 0, 1 and 2; all resolve uniquely.
        assert!(ifaces.identity.resolve("register", 0).is_ok());
        assert!(ifaces.identity.resolve("register", 1).is_ok());
        assert!(ifaces.identity.resolve("register", 2).is_ok());
        assert!(ifaces.identity.resolve("transferFrom", 3).is_ok());
        assert!(ifaces.reputation.resolve("giveFeedback", 7).is_ok());
        assert!(ifaces.validation.resolve("validationRequest", 4).is_ok());
    }

    #[test]
    fn metadata_entry_tuples_use_unnamed_components() {
        // The human-readable parser takes unnamed tuple components only;
        // a named component in either table would fail construction.
        let ifaces = RegistryInterfaces::erc8004().unwrap();
        let register = ifaces.identity.resolve("register", 2).unwrap();
        assert_eq!(register.signature(), "register(string,(string,bytes)[])");
        let set_metadata = ifaces.identity.resolve("setMetadata", 2).unwrap();
        assert_eq!(set_metadata.signature(), "setMetadata(uint256,(string,bytes)[])");
    }

    #[test]
    fn selector_is_derived_from_signature() {
        let table = transfer_table();
        let f = table.resolve("transfer", 2).unwrap();
        assert_eq!(f.signature(), "transfer(address,uint256)");
        assert_eq!(f.selector().len(), 4);
    }
}
