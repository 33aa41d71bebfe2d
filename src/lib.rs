// src/lib.rs

//! Sticker Crawler Library
//!
//! Scans a skin marketplace for listings carrying wanted stickers and sends
//! one alert per newly seen match.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;
