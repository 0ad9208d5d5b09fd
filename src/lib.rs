//! # Signalen API Library
//!
//! This library provides the core functionality for the Signalen API service:
//! the versioned signal aggregate, the workflow state machine, the actions
//! API, the domain event bus with its mail and sync subscribers, and the
//! HTTP surface.

pub mod actions;
pub mod areas;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod handlers;
pub mod mail;
pub mod models;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod subscribers;
pub mod telemetry;
pub mod workflow;
pub use migration;
