//! Infrastructure layer - upstream sources and external services

pub mod llm;
pub mod sources;
