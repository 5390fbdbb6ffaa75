//! Chain-state gateway access.
//!
//! [`Gateway`] is the seam between the lookup logic and the network: the
//! resolvers and commands only ever talk to this trait, and
//! [`GatewayClient`] implements it over HTTP JSON-RPC. Tests substitute
//! in-memory implementations.
//!
//! Implementations must be safe to share between concurrent workers; every
//! call is an independent request/response exchange.

mod client;
mod rpc;

pub use client::GatewayClient;

use crate::{MarketParticipants, MinerInfo, PeerId, ProviderId, Result, TipSet, TipSetKey};
use core::future::Future;
use std::sync::Arc;

/// Method names exposed by a Lotus-compatible gateway.
pub mod methods {
    pub const CHAIN_HEAD: &str = "Filecoin.ChainHead";
    pub const STATE_MINER_INFO: &str = "Filecoin.StateMinerInfo";
    pub const STATE_MARKET_PARTICIPANTS: &str = "Filecoin.StateMarketParticipants";
    pub const CLIENT_QUERY_ASK: &str = "Filecoin.ClientQueryAsk";
}

/// Read-only chain-state queries used for storage provider discovery.
pub trait Gateway: Send + Sync {
    /// Current head of the chain.
    fn chain_head(&self) -> impl Future<Output = Result<TipSet>> + Send;

    /// Miner record for `provider`, pinned to `tipset` when given, otherwise
    /// evaluated at the gateway's current head.
    fn state_miner_info(
        &self,
        provider: &ProviderId,
        tipset: Option<&TipSetKey>,
    ) -> impl Future<Output = Result<MinerInfo>> + Send;

    /// Every storage market participant with its balances.
    fn state_market_participants(
        &self,
        tipset: Option<&TipSetKey>,
    ) -> impl Future<Output = Result<MarketParticipants>> + Send;

    /// Current storage ask of `provider`, reached through `peer`.
    ///
    /// Returns the quote as text; an empty string means the provider returned
    /// no ask.
    fn client_query_ask(
        &self,
        peer: &PeerId,
        provider: &ProviderId,
    ) -> impl Future<Output = Result<String>> + Send;
}

impl<G: Gateway> Gateway for Arc<G> {
    fn chain_head(&self) -> impl Future<Output = Result<TipSet>> + Send {
        (**self).chain_head()
    }

    fn state_miner_info(
        &self,
        provider: &ProviderId,
        tipset: Option<&TipSetKey>,
    ) -> impl Future<Output = Result<MinerInfo>> + Send {
        (**self).state_miner_info(provider, tipset)
    }

    fn state_market_participants(
        &self,
        tipset: Option<&TipSetKey>,
    ) -> impl Future<Output = Result<MarketParticipants>> + Send {
        (**self).state_market_participants(tipset)
    }

    fn client_query_ask(
        &self,
        peer: &PeerId,
        provider: &ProviderId,
    ) -> impl Future<Output = Result<String>> + Send {
        (**self).client_query_ask(peer, provider)
    }
}
