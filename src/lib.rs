//! deprisk - dependency risk scoring for Dart and Flutter projects
//!
//! Reads a project's manifest and lockfile, resolves each dependency against
//! the package registry and its code host, and scores it across ten weighted
//! signals into a 0-100 risk score and tier.

pub mod cache;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod manifest;
pub mod models;
pub mod pipeline;
pub mod reporters;
pub mod scoring;
pub mod signals;
pub mod version;
