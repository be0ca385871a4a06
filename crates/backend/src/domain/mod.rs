//! Domain types - core business entities
//!
//! Remote list descriptors, sync metadata, and configuration. These types are
//! independent of persistence and transport concerns.

pub mod config;
pub mod metadata;
pub mod resource;
