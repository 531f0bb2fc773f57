//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::FacingArg;

/// Capture your emotions with the camera and keep a journal of them
#[derive(Parser, Debug)]
#[command(name = "emotion-journal")]
#[command(version, about = "Camera-based emotion journal", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Signed-in user id (overrides the config file)
    #[arg(long, short)]
    pub user: Option<u64>,

    /// Journal backend URL (overrides the config file)
    #[arg(long)]
    pub api_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the recorded emotion history
    History,
    /// Capture an emotion and add it to the journal
    Capture {
        /// Camera facing (default from config)
        #[arg(long)]
        facing: Option<FacingArg>,
    },
    /// Enroll a face sample for the signed-in user
    Enroll {
        /// Camera facing (default from config)
        #[arg(long)]
        facing: Option<FacingArg>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}
