pub mod api;
pub mod args;
pub mod bot;
pub mod breaker;
pub mod commands;
pub mod config;
pub mod connectors;
pub mod entities;
pub mod format;
pub mod merch;
pub mod merge;
pub mod model;
pub mod paginator;
pub mod store;
