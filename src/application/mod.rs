//! Application layer - aggregation, push feed and advisory services

pub mod advisor;
pub mod aggregator;
pub mod broadcaster;

pub use advisor::AdvisoryEngine;
pub use aggregator::{placeholder_pool, Aggregator};
pub use broadcaster::{
    BroadcastScheduler, FeedEvent, FeedHub, FeedSubscription, SchedulerHandle, SchedulerState,
};
