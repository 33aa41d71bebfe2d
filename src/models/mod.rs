// src/models/mod.rs

//! Domain models for the sticker crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod alert;
mod config;
mod item;

// Re-export all public types
pub use alert::{Alert, compose_message, escape_html, format_price};
pub use config::{
    Config, LedgerConfig, LoggingConfig, NotifierConfig, ScraperConfig, WorkerConfig,
};
pub use item::{
    GroupId, ImageData, ImageResponse, InventoryPage, Item, ListingEntry, ListingPage, Sticker,
};
