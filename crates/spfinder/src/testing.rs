//! In-memory gateway and span capture used by the unit tests.

use core::{fmt, time::Duration};
use spfinder_core::{
    CidLink, Error, Gateway, MarketBalance, MarketParticipants, MinerInfo, PeerId, ProviderId,
    RawMultiaddr, Result, TipSet, TipSetKey,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{
    Subscriber,
    field::{Field, Visit},
    span::{Attributes, Id, Record},
    subscriber::DefaultGuard,
};
use tracing_subscriber::{
    Layer,
    layer::{Context, SubscriberExt},
    util::SubscriberInitExt,
};

pub struct MockGateway {
    pub head: TipSet,
    pub miners: HashMap<ProviderId, Result<MinerInfo>>,
    pub asks: HashMap<ProviderId, Result<String>>,
    pub participants: Result<MarketParticipants>,
    pub delay: Option<Duration>,
    pub head_calls: AtomicUsize,
    pub miner_info_calls: AtomicUsize,
    pub ask_calls: AtomicUsize,
    pub pinned_miner_info_calls: AtomicUsize,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self {
            head: TipSet {
                key: TipSetKey::new(vec![CidLink {
                    cid: "bafy2bzacemockhead".to_string(),
                }]),
                height: 42,
            },
            miners: HashMap::new(),
            asks: HashMap::new(),
            participants: Ok(MarketParticipants::new()),
            delay: None,
            head_calls: AtomicUsize::new(0),
            miner_info_calls: AtomicUsize::new(0),
            ask_calls: AtomicUsize::new(0),
            pinned_miner_info_calls: AtomicUsize::new(0),
        }
    }
}

impl MockGateway {
    pub fn with_miner(self, id: &str, peer: Option<&str>, addrs: &[Vec<u8>]) -> Self {
        let info = MinerInfo {
            peer_id: peer.map(PeerId::new),
            multiaddrs: addrs.iter().map(|a| RawMultiaddr::from_bytes(a)).collect(),
            ..Default::default()
        };
        self.with_miner_info(id, Ok(info))
    }

    pub fn with_miner_info(mut self, id: &str, info: Result<MinerInfo>) -> Self {
        self.miners.insert(ProviderId::from(id), info);
        self
    }

    pub fn with_ask(mut self, id: &str, ask: Result<String>) -> Self {
        self.asks.insert(ProviderId::from(id), ask);
        self
    }

    /// Registers every known miner as a market participant.
    pub fn with_participants_from_miners(mut self) -> Self {
        let participants = self
            .miners
            .keys()
            .map(|id| (id.clone(), MarketBalance::default()))
            .collect();
        self.participants = Ok(participants);
        self
    }

    pub fn with_participants(mut self, participants: Result<MarketParticipants>) -> Self {
        self.participants = participants;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn not_found(provider: &ProviderId) -> Error {
    Error::Remote {
        code: 1,
        message: format!("actor {provider} not found"),
    }
}

impl Gateway for MockGateway {
    async fn chain_head(&self) -> Result<TipSet> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.head.clone())
    }

    async fn state_miner_info(
        &self,
        provider: &ProviderId,
        tipset: Option<&TipSetKey>,
    ) -> Result<MinerInfo> {
        self.miner_info_calls.fetch_add(1, Ordering::SeqCst);
        if tipset == Some(&self.head.key) {
            self.pinned_miner_info_calls.fetch_add(1, Ordering::SeqCst);
        }
        self.pause().await;
        self.miners
            .get(provider)
            .cloned()
            .unwrap_or_else(|| Err(not_found(provider)))
    }

    async fn state_market_participants(
        &self,
        _tipset: Option<&TipSetKey>,
    ) -> Result<MarketParticipants> {
        self.participants.clone()
    }

    async fn client_query_ask(&self, _peer: &PeerId, provider: &ProviderId) -> Result<String> {
        self.ask_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.asks
            .get(provider)
            .cloned()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Layer that remembers every span opened while it is installed, together
/// with the values recorded on it.
#[derive(Clone, Default)]
pub struct SpanRecorder {
    spans: Arc<Mutex<Vec<RecordedSpan>>>,
}

struct RecordedSpan {
    id: u64,
    name: &'static str,
    fields: Vec<(&'static str, String)>,
}

impl SpanRecorder {
    /// Installs the recorder as the default subscriber of the current thread.
    pub fn install(&self) -> DefaultGuard {
        tracing_subscriber::registry()
            .with(self.clone())
            .set_default()
    }

    /// Values of `field` across every recorded span named `span`.
    pub fn field_values(&self, span: &str, field: &str) -> Vec<String> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.name == span)
            .flat_map(|s| {
                s.fields
                    .iter()
                    .filter(|(name, _)| *name == field)
                    .map(|(_, value)| value.clone())
            })
            .collect()
    }
}

struct FieldCollector<'a>(&'a mut Vec<(&'static str, String)>);

impl Visit for FieldCollector<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.push((field.name(), format!("{value:?}")));
    }
}

impl<S: Subscriber> Layer<S> for SpanRecorder {
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, _ctx: Context<'_, S>) {
        let mut fields = Vec::new();
        attrs.record(&mut FieldCollector(&mut fields));
        self.spans.lock().unwrap().push(RecordedSpan {
            id: id.into_u64(),
            name: attrs.metadata().name(),
            fields,
        });
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        let mut spans = self.spans.lock().unwrap();
        if let Some(span) = spans.iter_mut().rev().find(|s| s.id == id.into_u64()) {
            values.record(&mut FieldCollector(&mut span.fields));
        }
    }
}
