pub mod chart;
pub mod config;
pub mod error;
pub mod feed;
pub mod filter;
pub mod logging;
pub mod model;
pub mod render;
pub mod server;
pub mod session;
pub mod source;
pub mod store;
pub mod view;
