//! Data types shared across the discovery and extraction phases.

pub mod config;
pub mod link;
pub mod page;
pub mod row;
pub mod schema;
