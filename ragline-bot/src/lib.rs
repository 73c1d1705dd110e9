//! ragline bot - configuration and wiring for the `ragline` binary.
//!
//! The binary turns a [`config::BotConfig`] into a running webhook server
//! (see [`app`]) and offers offline index tooling.

pub mod app;
pub mod config;
pub mod error;
pub mod util;
