// Sensor and record model
pub mod domain;

// Vehicle-side telemetry pipeline
pub mod agent;

// Central store service
pub mod store;

// TOML configuration
pub mod config;
