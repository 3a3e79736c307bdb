//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod analyze;
mod job;
mod probe;
mod sweep;

pub use job::JobCommands;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Upload a field photograph for analysis and video generation
    Analyze {
        /// Path to the aerial image
        image: PathBuf,

        /// Crop the farmer intends to grow
        #[arg(long)]
        crop: Option<String>,

        /// Wait for the video job to finish
        #[arg(long)]
        wait: bool,
    },
    /// Job inspection
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Evict expired jobs and their videos
    Sweep {
        /// Age threshold in seconds (server default when omitted)
        #[arg(long)]
        max_age: Option<u64>,
    },
    /// Start one generation directly against the Gemini API
    Probe {
        /// Video model to try
        #[arg(long, default_value = "veo-3.1-generate-preview")]
        model: String,

        /// Prompt to send
        #[arg(
            long,
            default_value = "Aerial timelapse of a green field growing through one season."
        )]
        prompt: String,

        /// Gemini API key
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        api_key: String,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
///
/// # Returns
/// Result indicating success or failure
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Analyze { image, crop, wait } => {
            analyze::handle_analyze(&image, crop.as_deref(), wait, config).await
        }
        Commands::Job { command } => job::handle_job_command(command, config).await,
        Commands::Sweep { max_age } => sweep::handle_sweep(max_age, config).await,
        Commands::Probe {
            model,
            prompt,
            api_key,
        } => probe::handle_probe(&model, &prompt, &api_key).await,
    }
}

/// Parse a job id given on the command line
pub(crate) fn parse_job_id(input: &str) -> Result<Uuid> {
    Uuid::parse_str(input.trim()).map_err(|_| anyhow::anyhow!("Invalid job ID: {}", input))
}
