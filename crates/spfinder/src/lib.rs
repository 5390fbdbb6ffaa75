#![doc = include_str!("../README.md")]

pub mod cli;
pub mod outcome;
pub mod pool;
pub mod resolver;
pub mod streaming;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use outcome::{Outcome, ResultLine, Tally};
pub use resolver::{PeerIdResolver, QueryAskResolver, Resolver};
pub use streaming::coordinator::{BatchSummary, FanOutConfig, ResultStream, fan_out};
