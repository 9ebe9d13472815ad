#![warn(missing_docs)]

//! DFS Nexus management: operator CLI, interactive console, config loading, scripted demo

#[allow(missing_docs)]
pub mod cli;
pub mod config;
pub mod console;
pub mod demo;

pub use config::MgmtConfig;
pub use console::{ConsoleCommand, ConsoleError};
pub use demo::{run_demo, DemoStep};
