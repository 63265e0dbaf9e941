//! weatherfan command-line front end
//!
//! The binary in `main.rs` parses [`cli::Cli`], loads configuration and hands
//! off to [`commands`]; [`app::App`] wires adapters into services.

pub mod app;
pub mod cli;
pub mod commands;
pub mod shutdown;
