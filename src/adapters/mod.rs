//! Concrete adapter implementations for ports.

pub mod csv_provider;
pub mod csv_sink;
pub mod file_config_adapter;
pub mod retry;
