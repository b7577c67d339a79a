pub mod cast;
pub mod connection;
pub mod directive;
pub mod executor;
pub mod generator;
pub mod paths;
pub mod query;
pub mod record;
pub mod shape;
pub mod types;
