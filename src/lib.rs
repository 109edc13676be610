//! tunebox: core library for a small local-file playlist player.
//!
//! Playlist bookkeeping, transport state and session persistence live here.
//! Audio output sits behind the [`host::MediaHost`] trait; [`player::RodioHost`]
//! is the rodio-backed implementation. The CLI consumes this crate through
//! [`app_core::AppCore`].

pub mod app_core;
pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod persist;
pub mod player;
pub mod playlist;
pub mod store;
pub mod track;

pub use error::{Error, Result};
