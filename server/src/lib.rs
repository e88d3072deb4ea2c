//! # Trivia Quiz Server Library
//!
//! Server side of the multiplayer trivia game: clients connect over TCP,
//! pick a nickname, choose a topic, and answer questions one at a time while
//! the server tracks per-topic scores and completion across all concurrent
//! players.
//!
//! ## Architecture
//!
//! One task per connection. The dispatcher (`network`) accepts connections
//! and spawns a session for each; sessions are isolated fault domains whose
//! only shared state is the player registry. The registry (`registry`) is a
//! single-mutex store of nicknames, per-topic scores, and completion flags;
//! operations that sort or format data copy a snapshot out and release the
//! lock first. Quiz content (`quiz`) is loaded from topic files at selection
//! time and read-only afterwards. The session state machine (`session`)
//! drives the protocol dialogue: registration, topic menu, question loop,
//! leaderboard listing, teardown.
//!
//! ## Module Organization
//!
//! - [`registry`] - the shared player registry and status rendering
//! - [`quiz`] - topic catalog, quiz files, answer checking
//! - [`session`] - the per-connection state machine
//! - [`network`] - listener and per-connection task dispatch
//!
//! Wire framing and message tags live in the `shared` crate, used by both
//! this server and the terminal client.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use server::quiz::TopicCatalog;
//! use server::registry::SharedRegistry;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Arc::new(TopicCatalog::load("topics")?);
//!     let registry = SharedRegistry::new(20, catalog.len());
//!
//!     let server = Server::bind("127.0.0.1:8080", registry, catalog).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod network;
pub mod quiz;
pub mod registry;
pub mod session;
