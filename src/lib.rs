//! storesync - webhook ingestion and catalog synchronization for a headless storefront
//!
//! The storefront's catalog lives in three places: the upstream commerce platform
//! (source of truth, pushes change webhooks), the local SQLite catalog (serves the
//! storefront), and Stripe's product/price catalog (used at checkout). This crate
//! receives and authenticates the upstream webhooks, applies them to the local
//! catalog, and reconciles the local catalog against Stripe in both directions.

pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod handlers;
pub mod models;
pub mod payments;
pub mod sync;
pub mod upstream;
