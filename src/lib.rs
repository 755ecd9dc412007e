pub mod analysis;
pub mod api;
pub mod app;
pub mod backlog;
pub mod cli;
pub mod config;
pub mod global;
pub mod meeting;
pub mod recognition;
pub mod recording;
pub mod review;
