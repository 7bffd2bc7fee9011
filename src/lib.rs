//! Junction is a Layer-7 HTTP reverse proxy.
//!
//! It terminates client connections, admits requests through an
//! ordered pipeline (IP allow-list, bearer-token auth, per-client rate
//! limiting), matches them against path-prefix routes, picks a backend
//! by weighted random selection over the currently-healthy set, and
//! streams the buffered response back — optionally short-circuiting
//! through a redis-backed response cache and gzip-compressing text
//! payloads. A background prober keeps the health registry current.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate).
//! - [`config`] -- JSON configuration loading and validation; immutable
//!   snapshots handed to components at build time.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`logging`] -- Structured tracing setup with JSON and pretty output.
//! - [`routing`] -- Longest-prefix route table.
//! - [`balance`] -- Health registry, background prober, and backend
//!   selector (weighted random with a round-robin alternative).
//! - [`security`] -- Admission gates: allow-list, bearer auth, rate
//!   limiting, and CORS annotation.
//! - [`store`] -- Key-value store trait and the redis implementation
//!   backing the cache and rate limiter.
//! - [`cache`] -- Fingerprinted response cache with TTL.
//! - [`compress`] -- Gzip gate for text-like response bodies.
//! - [`proxy`] -- The dispatch engine: per-request state machine from
//!   admission through upstream forwarding to post-processing.
//! - [`server`] -- Axum server setup, shared application state, HTTP
//!   client, and graceful shutdown.

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod balance;
pub mod cache;
pub mod cli;
pub mod cmd;
pub mod compress;
pub mod config;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod routing;
pub mod security;
pub mod server;
pub mod store;
