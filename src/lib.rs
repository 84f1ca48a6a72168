#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod catalog;
pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod logging;
pub mod media;
pub mod nav;
pub mod prefs;
pub mod render;
pub mod session;
pub mod storage;
pub mod trigger;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{run, RunOptions};
