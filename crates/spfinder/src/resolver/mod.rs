//! Single-provider resolution strategies.
//!
//! A [`Resolver`] turns one [`ProviderId`] into exactly one [`ResultLine`]. It
//! never returns an error: every failure is folded into the line so that a
//! batch can keep going. The fan-out engine is generic over this trait, which
//! is the only thing that differs between the `populate` and `query-asks`
//! commands.
//!
//! - [`PeerIdResolver`] - looks up the provider's peer identity.
//! - [`QueryAskResolver`] - looks up the peer identity, then queries the
//!   provider's storage ask through it.

mod peer_id;
mod query_ask;

pub use peer_id::PeerIdResolver;
pub use query_ask::QueryAskResolver;

use crate::outcome::{Outcome, ResultLine};
use core::future::Future;
use spfinder_core::{Gateway, PeerId, ProviderId};

/// Strategy applied by the fan-out engine to each provider.
///
/// Implementations are shared read-only between all workers of a batch and
/// must tolerate concurrent calls.
pub trait Resolver: Send + Sync + 'static {
    fn resolve(&self, provider: &ProviderId) -> impl Future<Output = ResultLine> + Send;
}

/// First step shared by every strategy: fetch the miner record at the
/// gateway's current head and extract the peer identity.
///
/// Returns the terminal line instead when the call fails or no peer identity
/// is advertised.
async fn lookup_peer_id<G: Gateway>(
    gateway: &G,
    provider: &ProviderId,
) -> Result<PeerId, ResultLine> {
    match gateway.state_miner_info(provider, None).await {
        Ok(info) => match info.peer_id() {
            Some(peer) => Ok(peer.clone()),
            None => Err(ResultLine::new(provider.clone(), Outcome::NoPeerId)),
        },
        Err(e) => {
            tracing::debug!("StateMinerInfo failed for {provider}: {e}");
            Err(ResultLine::failed(provider, e))
        }
    }
}
