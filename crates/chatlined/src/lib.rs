//! chatline server - Connection registry and broadcast relay
//!
//! This crate provides the core infrastructure for the chat server:
//! - `config` - Server configuration and credential loading
//! - `registry` - Connection registry actor holding authenticated members
//! - `server` - TCP accept loop and per-connection session handlers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       chatlined                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │   ChatServer    │     │     RegistryActor           │   │
//! │  │ (TcpListener)   │     │  (member set owner)         │   │
//! │  └────────┬────────┘     └──────────────▲──────────────┘   │
//! │           │                             │                   │
//! │           │ accept + spawn              │ register /        │
//! │           ▼                             │ broadcast /       │
//! │  ┌─────────────────┐                    │ deregister        │
//! │  │ SessionHandler  │────────────────────┘                   │
//! │  │ (per client)    │                                        │
//! │  └─────────────────┘                                        │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod config;
pub mod registry;
pub mod server;
