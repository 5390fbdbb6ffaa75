use super::{Resolver, lookup_peer_id};
use crate::outcome::{Outcome, ResultLine};
use spfinder_core::{Gateway, ProviderId};
use std::sync::Arc;

/// Resolves a provider to its current storage ask.
///
/// The ask is queried through the provider's peer identity, so the
/// `ClientQueryAsk` call is only issued once `StateMinerInfo` produced one.
pub struct QueryAskResolver<G> {
    gateway: Arc<G>,
}

impl<G> QueryAskResolver<G> {
    pub const fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }
}

impl<G: Gateway + 'static> Resolver for QueryAskResolver<G> {
    async fn resolve(&self, provider: &ProviderId) -> ResultLine {
        let peer = match lookup_peer_id(&*self.gateway, provider).await {
            Ok(peer) => peer,
            Err(line) => return line,
        };

        match self.gateway.client_query_ask(&peer, provider).await {
            Ok(ask) if ask.is_empty() => {
                ResultLine::new(provider.clone(), Outcome::NoAskResult)
            }
            Ok(ask) => ResultLine::resolved(provider, ask),
            Err(e) => {
                tracing::debug!("ClientQueryAsk failed for {provider} via {peer}: {e}");
                ResultLine::failed(provider, e)
            }
        }
    }
}
