//! Points and tier core of a receipt-based loyalty program.
//!
//! Users earn points when their purchase receipts are approved, when they refer other users and
//! when an administrator validates their account. Points are redeemed for rewards, and the
//! balance places each user in a tier whose multiplier boosts future purchases.
//!
//! The crate follows a ports and adapters layout:
//!
//! - [`domain`] holds the pure tier resolution and ledger logic.
//! - [`ports`] defines the storage, tier configuration and user directory the commands need.
//! - [`adapters`] provides in-memory and file-backed implementations of those ports.
//! - [`commands`] exposes the request handlers as [`tower::Service`]s.

pub mod adapters;
pub mod commands;
pub mod config;
pub mod domain;
pub mod ports;
