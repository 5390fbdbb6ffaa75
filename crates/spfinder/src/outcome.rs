//! Per-provider results produced by a batch.

use core::fmt;
use spfinder_core::ProviderId;

/// How the lookup of a single provider ended.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The lookup produced a value (a peer id or an ask).
    Resolved(String),
    /// The miner record carries no peer identity.
    NoPeerId,
    /// The provider answered the ask query with nothing.
    NoAskResult,
    /// A call failed; holds the rendered error.
    Failed(String),
}

impl Outcome {
    /// Short stable label, used as a metric attribute.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Resolved(_) => "resolved",
            Self::NoPeerId => "no_peer_id",
            Self::NoAskResult => "no_ask_result",
            Self::Failed(_) => "failed",
        }
    }
}

/// One line of batch output: exactly one is produced per submitted provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResultLine {
    pub provider: ProviderId,
    pub outcome: Outcome,
}

impl ResultLine {
    pub fn new(provider: ProviderId, outcome: Outcome) -> Self {
        Self { provider, outcome }
    }

    pub fn resolved(provider: &ProviderId, value: impl Into<String>) -> Self {
        Self::new(provider.clone(), Outcome::Resolved(value.into()))
    }

    pub fn failed(provider: &ProviderId, err: impl fmt::Display) -> Self {
        Self::new(provider.clone(), Outcome::Failed(err.to_string()))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }
}

impl fmt::Display for ResultLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Resolved(value) => write!(f, "{} -> {value}", self.provider),
            Outcome::NoPeerId => write!(f, "{} has no peer id", self.provider),
            Outcome::NoAskResult => write!(f, "{} has no query ask result", self.provider),
            Outcome::Failed(err) => write!(f, "{} error: {err}", self.provider),
        }
    }
}

/// Running count of outcomes for the end-of-batch summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub resolved: usize,
    pub empty: usize,
    pub failed: usize,
}

impl Tally {
    pub fn record(&mut self, line: &ResultLine) {
        match line.outcome {
            Outcome::Resolved(_) => self.resolved += 1,
            Outcome::NoPeerId | Outcome::NoAskResult => self.empty += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
    }

    pub const fn total(&self) -> usize {
        self.resolved + self.empty + self.failed
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} providers: {} resolved, {} without result, {} failed",
            self.total(),
            self.resolved,
            self.empty,
            self.failed
        )
    }
}
