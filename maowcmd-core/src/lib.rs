// src/lib.rs

pub mod config;
pub mod db;
pub mod platforms;
pub mod repositories;
pub mod services;
pub mod tasks;
pub mod test_utils;
pub mod utils;

pub use config::HandlerConfig;
pub use db::Database;
pub use maowcmd_common::error::Error;
pub use services::{Command, CommandEntry, Dispatcher};
