//! # Chain-state types
//!
//! Wire representations of the records returned by a Lotus-compatible
//! chain-state gateway, plus the identifiers and derived views used by the
//! batch tooling.
//!
//! ## Overview
//!
//! - [`ProviderId`] - Opaque storage provider key used to address a batch item
//! - [`PeerId`] - Opaque peer identity advertised by a storage provider
//! - [`TipSet`] / [`TipSetKey`] - Chain head reference used to pin queries
//! - [`MinerInfo`] - Raw miner record as returned by `StateMinerInfo`
//! - [`MarketBalance`] - Value type of the `StateMarketParticipants` map
//! - [`PeerAddrInfo`] - Peer identity plus decoded multiaddresses
//!
//! Field names follow the gateway's PascalCase JSON encoding. Fields that the
//! tooling never inspects are still modelled so that records can be logged in
//! full, but missing or `null` values fall back to defaults rather than failing
//! the decode.

use crate::{Error, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use core::fmt;
use libp2p::Multiaddr;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use url::Url;

/// Public gateway queried when no other host is configured.
pub const DEFAULT_GATEWAY: &str = "api.node.glif.io";

/// Path of the JSON-RPC endpoint on every gateway host.
pub const RPC_PATH: &str = "/rpc/v0";

/// Number of concurrent workers used by batch lookups unless overridden.
pub const DEFAULT_WORKERS: usize = 20;

/// Builds the HTTPS endpoint URL for a gateway host.
///
/// The host may carry an explicit port (`localhost:1234`) but no scheme or
/// path; the RPC path is fixed.
pub fn gateway_url(host: &str) -> Result<Url> {
    let invalid = |reason: &str| Error::InvalidGateway {
        host: host.to_string(),
        reason: reason.to_string(),
    };

    if host.is_empty() {
        return Err(invalid("host is empty"));
    }
    if host.contains("://") || host.contains('/') {
        return Err(invalid("expected a bare host name without scheme or path"));
    }

    let url = Url::parse(&format!("https://{host}{RPC_PATH}"))
        .map_err(|e| invalid(&e.to_string()))?;
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(url)
}

/// Storage provider key as it appears in the chain state.
///
/// Treated as opaque: values obtained from the gateway are used verbatim.
/// Locally supplied values should go through [`Address`](crate::Address) first.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Peer identity advertised by a storage provider, kept in its textual
/// (base58) form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// IPLD link to a block, encoded by the gateway as `{"/": "<cid>"}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CidLink {
    #[serde(rename = "/")]
    pub cid: String,
}

/// Opaque tip-set reference.
///
/// Only ever passed back to the gateway to pin a query to the same chain view;
/// its contents are never inspected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TipSetKey(Vec<CidLink>);

impl TipSetKey {
    pub fn new(cids: Vec<CidLink>) -> Self {
        Self(cids)
    }

    pub fn cids(&self) -> &[CidLink] {
        &self.0
    }
}

/// Chain head as returned by `ChainHead`. Block headers are not decoded.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TipSet {
    #[serde(rename = "Cids", default, deserialize_with = "nullable")]
    pub key: TipSetKey,
    #[serde(rename = "Height", default)]
    pub height: i64,
}

/// A multiaddress as stored on chain: base64 text wrapping the binary
/// multiaddr encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawMultiaddr(String);

impl RawMultiaddr {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(STANDARD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the wrapped bytes, returning `None` when either the base64 or
    /// the multiaddr layer is malformed.
    pub fn decode(&self) -> Option<Multiaddr> {
        let bytes = STANDARD.decode(&self.0).ok()?;
        Multiaddr::try_from(bytes).ok()
    }
}

/// Raw miner record as returned by `StateMinerInfo`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MinerInfo {
    #[serde(default, deserialize_with = "nullable")]
    pub owner: String,
    #[serde(default, deserialize_with = "nullable")]
    pub worker: String,
    #[serde(default, deserialize_with = "nullable")]
    pub new_worker: String,
    #[serde(default, deserialize_with = "nullable")]
    pub control_addresses: Vec<String>,
    #[serde(default)]
    pub worker_change_epoch: i64,
    #[serde(default)]
    pub peer_id: Option<PeerId>,
    #[serde(default, deserialize_with = "nullable")]
    pub multiaddrs: Vec<RawMultiaddr>,
    #[serde(default)]
    pub window_po_st_proof_type: i64,
    #[serde(default)]
    pub sector_size: u64,
    #[serde(default)]
    pub window_po_st_partition_sectors: u64,
    #[serde(default)]
    pub consensus_fault_elapsed: i64,
}

impl MinerInfo {
    /// Returns the advertised peer identity, treating an empty string the same
    /// as an absent one.
    pub fn peer_id(&self) -> Option<&PeerId> {
        self.peer_id.as_ref().filter(|id| !id.is_empty())
    }

    /// Derives the peer identity and the decodable subset of the advertised
    /// multiaddresses. Malformed addresses are dropped; the relative order of
    /// the remaining ones is preserved.
    pub fn peer_addr_info(&self) -> Option<PeerAddrInfo> {
        let id = self.peer_id()?.clone();
        let addrs = self
            .multiaddrs
            .iter()
            .filter_map(|raw| {
                let decoded = raw.decode();
                if decoded.is_none() {
                    tracing::debug!("Dropping undecodable multiaddr {}", raw.as_str());
                }
                decoded
            })
            .collect();
        Some(PeerAddrInfo { id, addrs })
    }
}

/// Escrow and locked funds of a market participant, in attoFIL.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarketBalance {
    #[serde(default)]
    pub escrow: String,
    #[serde(default)]
    pub locked: String,
}

/// Full market participant table keyed by provider.
pub type MarketParticipants = HashMap<ProviderId, MarketBalance>;

/// Network reachability of a storage provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerAddrInfo {
    pub id: PeerId,
    pub addrs: Vec<Multiaddr>,
}

/// Deserializes `null` as the type's default value.
fn nullable<'de, D, T>(deserializer: D) -> core::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
