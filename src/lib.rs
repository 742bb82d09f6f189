//! Scheduled-vessel-call retrieval for the Hualien port reporting portal.
//!
//! The portal exposes no API, only an interactive HTML form with a
//! client-side XML export and a seven-day query-window limit. This crate
//! segments an arbitrary query range to fit that limit, drives the form via
//! browser automation once per segment, decodes the Big5 export, applies the
//! domain filtering and labelling rules, and merges everything into one
//! deduplicated, time-ordered report.

pub mod cli;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod portal;
pub mod range;
pub mod records;
pub mod report;
