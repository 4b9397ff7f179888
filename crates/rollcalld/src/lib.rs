//! rollcalld — Capture session engine.
//!
//! Pulls frames, resolves them to registered people and records at most
//! one attendance event per person per day.

pub mod capture;
pub mod config;
pub mod engine;
pub mod feed;
