//! Fan-out coordination: feeding the work queue, supervising the pool and
//! exposing finished lines as a stream.

pub mod coordinator;
