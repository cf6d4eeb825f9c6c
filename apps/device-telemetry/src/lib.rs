pub mod cli;
pub mod config;
pub mod devices;
pub mod error;
pub mod metrics;
pub mod request_context;
pub mod routes;
pub mod seed;
pub mod state;
pub mod time;
