//! Microblogging backend built around a timeline materialization pipeline.
//!
//! Write services couple every mutation to an outbox event in one
//! transaction; a dispatcher drains the outbox onto a partitioned message
//! log; the materializer applies hybrid fan-out into per-reader sorted
//! timelines; the read path merges the materialized timeline with on-demand
//! celebrity reads.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::Config;
