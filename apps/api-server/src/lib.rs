pub mod ai;
pub mod config;
pub mod ctx;
pub mod error;
pub mod routes;
pub mod standalone;
