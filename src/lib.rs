//! CryptoSpark Library
//!
//! Cached access to CoinGecko market data: a key/value cache with time-based
//! expiry, a fetch client that falls back to stale entries when the API is
//! unavailable, and the three typed endpoint calls built on it.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod ui;
