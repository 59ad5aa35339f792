pub mod backend;
pub mod config;
pub mod routes;
pub mod telemetry;
