//! # Trivia Quiz Client Library
//!
//! Terminal client for the multiplayer trivia game. Connects to the server
//! over TCP, registers a nickname, and drives the protocol dialogue: topic
//! selection, the question loop, and leaderboard queries. The server is
//! authoritative for every decision; this crate only renders frames and
//! forwards user input.
//!
//! - [`connection`] - framed TCP connection (shared codec)
//! - [`session`] - the interactive registration/menu/quiz flow

pub mod connection;
pub mod session;
