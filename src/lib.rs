//! Yieldwatch - DeFi yield aggregator with a live push feed and advisory agent
//! Built with Domain-Driven Design principles

pub mod domain;
pub mod infrastructure;
pub mod application;
pub mod presentation;
pub mod shared;

// Re-export main types for convenience
pub use application::{AdvisoryEngine, Aggregator, BroadcastScheduler, FeedHub};
pub use domain::query::QueryEngine;
pub use presentation::{create_router, AppState};
pub use shared::config::Config;
pub use shared::types::{Pool, Snapshot, YieldUpdate};
