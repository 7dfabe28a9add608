//! divscreen core: indicators, signals, scoring, and market data.
//!
//! This crate holds everything a dividend screen needs below the pipeline:
//! - Domain types (daily bars)
//! - Indicator engine (volatility bands and momentum oscillator)
//! - Latest-bar technical signals
//! - Fundamentals normalization
//! - Ranking and combined scoring
//! - Entry/exit guidance
//! - Price and fundamentals providers, universes

pub mod data;
pub mod domain;
pub mod fundamentals;
pub mod indicators;
pub mod scoring;
pub mod signals;
pub mod strategy;
