//! CLI interface for oco-sentinel
//!
//! Provides subcommands for:
//! - `compute`: derive protective TP/SL prices for an order context
//! - `shape`: translate a bracket intent into a venue payload
//! - `config`: show the effective configuration

mod compute;
mod shape;

pub use compute::ComputeArgs;
pub use shape::ShapeArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "oco-sentinel")]
#[command(about = "Mandatory OCO bracket protection engine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute protective prices for an order context
    Compute(ComputeArgs),
    /// Shape a bracket intent into a venue payload
    Shape(ShapeArgs),
    /// Show the effective configuration
    Config,
}
