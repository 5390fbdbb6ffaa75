use super::{
    Gateway, methods,
    rpc::{RpcRequest, RpcResponse},
};
use crate::{
    Error, MarketParticipants, MinerInfo, PeerId, ProviderId, Result, TipSet, TipSetKey,
    gateway_url,
};
use core::time::Duration;
use portable_atomic::{AtomicU64, Ordering};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

/// HTTP JSON-RPC client for a Lotus-compatible gateway.
///
/// A single instance is meant to be shared (behind an `Arc`) by every worker of
/// a batch. The underlying [`reqwest::Client`] pools connections and each call
/// carries its own request id, so no per-call state is shared.
#[derive(Debug)]
pub struct GatewayClient {
    endpoint: Url,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl GatewayClient {
    /// Creates a client for the fixed RPC endpoint of `host`.
    pub fn for_host(host: &str, timeout: Option<Duration>) -> Result<Self> {
        Self::new(gateway_url(host)?, timeout)
    }

    /// Creates a client for an explicit endpoint URL.
    ///
    /// `timeout` bounds each whole request; `None` waits indefinitely.
    pub fn new(endpoint: Url, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            endpoint,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Issues a single JSON-RPC call and decodes its result into `R`.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`] if the request cannot be sent or the gateway
    ///   answers with a non-success status and no JSON-RPC error body.
    /// - [`Error::Remote`] if the reply carries a JSON-RPC error object.
    /// - [`Error::Decode`] if the reply is not valid JSON-RPC or its result does
    ///   not match `R`.
    pub async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        params: impl Serialize,
    ) -> Result<R> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_vec(&RpcRequest::new(method, params, id))?;

        tracing::trace!("-> {method} (id {id})");
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        tracing::trace!("<- {method} (id {id}) status {status}");

        let reply = match serde_json::from_str::<RpcResponse>(&text) {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => {
                return Err(Error::Transport {
                    context: format!("{method} returned HTTP {status}"),
                });
            }
            Err(e) => {
                return Err(Error::Decode {
                    context: format!("{method}: {e}"),
                });
            }
        };

        if let Some(err) = reply.error {
            return Err(Error::Remote {
                code: err.code,
                message: err.message,
            });
        }
        if !status.is_success() {
            return Err(Error::Transport {
                context: format!("{method} returned HTTP {status}"),
            });
        }

        let result = reply.result.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(result).map_err(|e| Error::Decode {
            context: format!("{method}: {e}"),
        })
    }
}

impl Gateway for GatewayClient {
    async fn chain_head(&self) -> Result<TipSet> {
        self.call(methods::CHAIN_HEAD, [(); 0]).await
    }

    async fn state_miner_info(
        &self,
        provider: &ProviderId,
        tipset: Option<&TipSetKey>,
    ) -> Result<MinerInfo> {
        self.call(methods::STATE_MINER_INFO, (provider, tipset))
            .await
    }

    async fn state_market_participants(
        &self,
        tipset: Option<&TipSetKey>,
    ) -> Result<MarketParticipants> {
        self.call(methods::STATE_MARKET_PARTICIPANTS, (tipset,))
            .await
    }

    async fn client_query_ask(&self, peer: &PeerId, provider: &ProviderId) -> Result<String> {
        let ask: serde_json::Value = self
            .call(methods::CLIENT_QUERY_ASK, (peer, provider))
            .await?;
        Ok(render_ask(ask))
    }
}

/// Asks come back either as a plain string or as a structured record depending
/// on the gateway version; both are reduced to a single line of text.
fn render_ask(ask: serde_json::Value) -> String {
    match ask {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}
