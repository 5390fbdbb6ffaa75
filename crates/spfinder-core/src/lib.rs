#![doc = include_str!("../README.md")]

mod common;
pub mod gateway;

pub use common::*;
pub use gateway::{Gateway, GatewayClient};
// Public re-export so downstream crates can name `Multiaddr` without a direct
// `libp2p` dependency.
pub use libp2p::Multiaddr;
