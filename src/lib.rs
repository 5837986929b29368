pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod image;
pub mod output;
pub mod treemap;
