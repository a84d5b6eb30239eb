//! Agent profile and lifecycle.
//!
//! [`AgentProfile`] is the owned, mutable registration document; edits
//! accumulate in memory and reach the chain only through an explicit
//! submit operation. [`Agent`] wraps a profile with its on-chain
//! identity and enforces the lifecycle: registration happens at most
//! once per instance, wallet binding is independent of it, and every
//! identity-bound operation checks registration first.

use alloy::signers::local::PrivateKeySigner;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::TransactionHandle;
use crate::error::{SdkError, StateError};
use crate::sdk::{MetadataEntry, Sdk};

/// Well-known endpoint names.
pub const ENDPOINT_MCP: &str = "MCP";
pub const ENDPOINT_A2A: &str = "A2A";

/// One service endpoint advertised by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEndpoint {
    pub name: String,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// The off-chain registration document, serialized as the JSON file the
/// token URI points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<AgentEndpoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_trust: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub x402_support: bool,
    /// `chainId:tokenId` once registered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl AgentProfile {
    pub fn new(name: &str, description: &str) -> Self {
        AgentProfile {
            name: name.to_string(),
            description: description.to_string(),
            image: None,
            endpoints: Vec::new(),
            tags: Vec::new(),
            metadata: serde_json::Map::new(),
            supported_trust: Vec::new(),
            active: true,
            x402_support: false,
            agent_id: None,
            agent_uri: None,
            wallet_address: None,
            owner: None,
            updated_at: None,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }

    fn set_endpoint(&mut self, name: &str, endpoint: &str, version: Option<&str>) {
        self.endpoints.retain(|e| e.name != name);
        self.endpoints.push(AgentEndpoint {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            version: version.map(str::to_string),
        });
        self.touch();
    }

    /// Advertise (or replace) the MCP endpoint.
    pub fn set_mcp(&mut self, endpoint: &str) {
        self.set_endpoint(ENDPOINT_MCP, endpoint, None);
    }

    /// Advertise (or replace) the A2A endpoint.
    pub fn set_a2a(&mut self, endpoint: &str, version: &str) {
        self.set_endpoint(ENDPOINT_A2A, endpoint, Some(version));
    }

    pub fn add_tag(&mut self, tag: &str) {
        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
            self.touch();
        }
    }

    pub fn set_trust(&mut self, supported: Vec<String>) {
        self.supported_trust = supported;
        self.touch();
    }

    pub fn set_metadata_entry(&mut self, key: &str, value: serde_json::Value) {
        self.metadata.insert(key.to_string(), value);
        self.touch();
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.touch();
    }

    pub fn set_x402_support(&mut self, supported: bool) {
        self.x402_support = supported;
        self.touch();
    }
}

/// An agent bound to one SDK instance.
pub struct Agent {
    sdk: Sdk,
    profile: AgentProfile,
    token_id: Option<u64>,
    registration_submitted: bool,
}

impl Agent {
    pub(crate) fn new(sdk: Sdk, profile: AgentProfile) -> Self {
        Agent {
            sdk,
            profile,
            token_id: None,
            registration_submitted: false,
        }
    }

    pub(crate) fn hydrated(sdk: Sdk, profile: AgentProfile, token_id: u64) -> Self {
        Agent {
            sdk,
            profile,
            token_id: Some(token_id),
            registration_submitted: true,
        }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut AgentProfile {
        &mut self.profile
    }

    /// On-chain token id, once known.
    pub fn token_id(&self) -> Option<u64> {
        self.token_id
    }

    /// `chainId:tokenId`, once known.
    pub fn agent_id(&self) -> Option<String> {
        self.token_id
            .map(|id| format!("{}:{id}", self.sdk.chain_id()))
    }

    pub fn is_registered(&self) -> bool {
        self.token_id.is_some()
    }

    fn require_token_id(&self) -> Result<u64, StateError> {
        self.token_id.ok_or(StateError::AgentNotRegistered)
    }

    /// Submit the registration transaction. At most one registration may
    /// leave this instance; a second call fails with
    /// [`StateError::AlreadyRegistered`] even before the first confirms.
    ///
    /// The returned handle extracts the minted token id from the
    /// registration event; pass it back to [`Agent::complete_registration`].
    pub async fn register(
        &mut self,
        agent_uri: Option<&str>,
        metadata: &[MetadataEntry],
    ) -> Result<TransactionHandle<Option<u64>>, SdkError> {
        if self.registration_submitted || self.token_id.is_some() {
            return Err(StateError::AlreadyRegistered.into());
        }
        let handle = self.sdk.submit_registration(agent_uri, metadata).await?;
        self.registration_submitted = true;
        if let Some(uri) = agent_uri {
            self.profile.agent_uri = Some(uri.to_string());
        }
        Ok(handle)
    }

    /// Record the confirmed token id and derive the agent id.
    pub fn complete_registration(&mut self, token_id: u64) {
        self.token_id = Some(token_id);
        self.profile.agent_id = Some(format!("{}:{token_id}", self.sdk.chain_id()));
        self.profile.owner = self
            .sdk
            .signer_address()
            .map(|addr| addr.to_native(self.sdk.family()));
    }

    /// Bind `new_wallet_key`'s address as the agent wallet.
    ///
    /// Reads the currently bound wallet first; when it already matches,
    /// nothing is submitted and `Ok(None)` is returned. The approval the
    /// new wallet signs expires `deadline_secs` from now (default one
    /// hour, ceiling 24 hours).
    pub async fn set_wallet(
        &mut self,
        new_wallet_key: &PrivateKeySigner,
        deadline_secs: Option<u64>,
    ) -> Result<Option<TransactionHandle<()>>, SdkError> {
        let token_id = self.require_token_id()?;
        let new_wallet = crate::address::CanonicalAddress::from(new_wallet_key.address());

        let current = self.sdk.agent_wallet(token_id).await?;
        if current == new_wallet {
            return Ok(None);
        }

        let handle = self
            .sdk
            .submit_wallet_binding(token_id, new_wallet_key, deadline_secs)
            .await?;
        self.profile.wallet_address = Some(new_wallet.to_native(self.sdk.family()));
        self.profile.touch();
        Ok(Some(handle))
    }

    /// Remove the bound wallet. `Ok(None)` when none is bound.
    pub async fn unset_wallet(&mut self) -> Result<Option<TransactionHandle<()>>, SdkError> {
        let token_id = self.require_token_id()?;
        let current = self.sdk.agent_wallet(token_id).await?;
        if current.is_zero() {
            return Ok(None);
        }
        let handle = self.sdk.submit_wallet_unbinding(token_id).await?;
        self.profile.wallet_address = None;
        self.profile.touch();
        Ok(Some(handle))
    }

    /// Point the on-chain identity at a new registration file.
    pub async fn update_token_uri(
        &mut self,
        uri: &str,
    ) -> Result<TransactionHandle<()>, SdkError> {
        let token_id = self.require_token_id()?;
        let handle = self.sdk.submit_token_uri(token_id, uri).await?;
        self.profile.agent_uri = Some(uri.to_string());
        self.profile.touch();
        Ok(handle)
    }

    /// Write on-chain metadata entries for this agent.
    pub async fn set_metadata(
        &self,
        entries: &[MetadataEntry],
    ) -> Result<TransactionHandle<()>, SdkError> {
        let token_id = self.require_token_id()?;
        self.sdk.submit_metadata(token_id, entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn endpoint_mutators_replace_by_name() {
        let mut profile = AgentProfile::new("helper", "does things");
        profile.set_mcp("https://a.example/mcp");
        profile.set_mcp("https://b.example/mcp");
        profile.set_a2a("https://a.example/a2a", "0.3.0");

        assert_eq!(profile.endpoints.len(), 2);
        let mcp = profile.endpoints.iter().find(|e| e.name == ENDPOINT_MCP).unwrap();
        assert_eq!(mcp.endpoint, "https://b.example/mcp");
        assert_eq!(mcp.version, None);
        let a2a = profile.endpoints.iter().find(|e| e.name == ENDPOINT_A2A).unwrap();
        assert_eq!(a2a.version.as_deref(), Some("0.3.0"));
    }

    #[test]
    fn tags_are_deduplicated() {
        let mut profile = AgentProfile::new("helper", "does things");
        profile.add_tag("defi");
        profile.add_tag("defi");
        profile.add_tag("oracle");
        assert_eq!(profile.tags, vec!["defi", "oracle"]);
    }

    #[test]
    fn mutators_stamp_updated_at() {
        let mut profile = AgentProfile::new("helper", "does things");
        assert!(profile.updated_at.is_none());
        profile.set_active(false);
        assert!(profile.updated_at.is_some());
    }

    #[test]
    fn serialization_is_camel_case_and_sparse() {
        let mut profile = AgentProfile::new("helper", "does things");
        profile.set_x402_support(true);
        profile.set_trust(vec!["feedback".to_string()]);

        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["name"], "helper");
        assert_eq!(value["x402Support"], true);
        assert_eq!(value["supportedTrust"][0], "feedback");
        // Unset options are omitted, not null.
        assert!(value.get("agentId").is_none());
        assert!(value.get("walletAddress").is_none());
    }

    #[test]
    fn deserialization_defaults_active_to_true() {
        let profile: AgentProfile =
            serde_json::from_str(r#"{"name":"x","description":"y"}"#).unwrap();
        assert!(profile.active);
        assert!(!profile.x402_support);
        assert!(profile.endpoints.is_empty());
    }

    #[test]
    fn metadata_entries_are_keyed() {
        let mut profile = AgentProfile::new("helper", "does things");
        profile.set_metadata_entry("model", serde_json::json!("gpt-large"));
        profile.set_metadata_entry("model", serde_json::json!("llama"));
        assert_eq!(profile.metadata["model"], "llama");
        assert_eq!(profile.metadata.len(), 1);
    }
}
