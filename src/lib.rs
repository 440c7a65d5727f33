pub mod analytics;
pub mod api;
pub mod config;
pub mod models;
pub mod notifier;
pub mod seed;
pub mod storage;
pub mod validation;
