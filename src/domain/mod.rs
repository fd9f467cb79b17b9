//! Domain layer - core business logic and entities

pub mod advisory;
pub mod query;
