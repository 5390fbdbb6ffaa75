use super::{Resolver, lookup_peer_id};
use crate::outcome::ResultLine;
use spfinder_core::{Gateway, ProviderId};
use std::sync::Arc;

/// Resolves a provider to its advertised peer identity.
///
/// Issues a single `StateMinerInfo` call per provider.
pub struct PeerIdResolver<G> {
    gateway: Arc<G>,
}

impl<G> PeerIdResolver<G> {
    pub const fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }
}

impl<G: Gateway + 'static> Resolver for PeerIdResolver<G> {
    async fn resolve(&self, provider: &ProviderId) -> ResultLine {
        match lookup_peer_id(&*self.gateway, provider).await {
            Ok(peer) => ResultLine::resolved(provider, peer.as_str()),
            Err(line) => line,
        }
    }
}
