//! Batch field extraction gateway.
//!
//! `POST /scan` takes a set of images and a list of field names, checks the
//! caller against a fixed-window rate limit, then asks a vision model for the
//! fields of every image concurrently. Images that fail come back as empty
//! objects in their original position, the rest of the batch is unaffected.

pub mod client_ip;
pub mod config;
pub mod error;
pub mod extraction;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod rate_limit;
pub mod state;
