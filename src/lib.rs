pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod observability;
pub mod paths;
pub mod pipeline;
pub mod report;
pub mod table;
