pub mod app;
pub mod config;
pub mod infrastructure;
pub mod intercept;
pub mod page;
pub mod player;
pub mod policy;
pub mod rules;
pub mod session;
pub mod tasks;
