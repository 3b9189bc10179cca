//! kbchat is a terminal client for a knowledge-base question answering service.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the protocol work: the stream event parser, the
//!   incremental stream consumer, credential storage, the authenticated
//!   request layer, and the chat/auth services built on top of it.
//! - [`api`] defines the JSON payloads exchanged with the backend.
//! - [`cli`] parses arguments and drives the services from the terminal.
//! - [`logging`] installs the diagnostic `tracing` subscriber.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod utils;
