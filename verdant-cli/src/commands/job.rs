//! Job command handlers
//!
//! Handles job inspection: viewing details and waiting for completion.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use std::time::{Duration, Instant};
use uuid::Uuid;
use verdant_core::domain::analytics::{FieldAnalytics, RiskLabel};
use verdant_core::domain::job::JobStatus;
use verdant_core::dto::job::JobView;

use crate::api::ApiClient;
use crate::commands::parse_job_id;
use crate::config::Config;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Get job details
    Get {
        /// Job ID
        id: String,
    },
    /// Poll a job until it is ready or failed
    Wait {
        /// Job ID
        id: String,

        /// Seconds between polls
        #[arg(long, default_value_t = 5)]
        interval: u64,

        /// Give up after this many seconds
        #[arg(long, default_value_t = 600)]
        timeout: u64,
    },
}

/// Handle job commands
///
/// Routes job subcommands to their respective handlers.
///
/// # Arguments
/// * `command` - The job command to execute
/// * `config` - The CLI configuration
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url);

    match command {
        JobCommands::Get { id } => get_job(&client, &id).await,
        JobCommands::Wait {
            id,
            interval,
            timeout,
        } => {
            let id = parse_job_id(&id)?;
            let job = wait_for_job(
                &client,
                id,
                Duration::from_secs(interval.max(1)),
                Duration::from_secs(timeout),
            )
            .await?;
            print_job_details(&job);
            Ok(())
        }
    }
}

/// Get and display a single job
async fn get_job(client: &ApiClient, id: &str) -> Result<()> {
    let job = client.get_job(parse_job_id(id)?).await?;
    print_job_details(&job);
    Ok(())
}

/// Poll a job until it reaches a terminal state
pub(crate) async fn wait_for_job(
    client: &ApiClient,
    id: Uuid,
    interval: Duration,
    timeout: Duration,
) -> Result<JobView> {
    let started = Instant::now();
    println!("{}", format!("Waiting for job {}...", id).dimmed());

    loop {
        let job = client.get_job(id).await?;
        if job.status.is_terminal() {
            return Ok(job);
        }

        if started.elapsed() >= timeout {
            anyhow::bail!(
                "Job {} still {} after {}s",
                id,
                job.status,
                timeout.as_secs()
            );
        }

        tokio::time::sleep(interval).await;
    }
}

/// Print detailed job information
pub(crate) fn print_job_details(job: &JobView) {
    println!("{}", "Job Details:".bold());
    println!("  ID:          {}", job.job_id.to_string().cyan());
    println!("  Status:      {}", colorize_status(job.status));
    println!(
        "  Created:     {}",
        job.created_at.format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(completed) = job.completed_at {
        println!("  Completed:   {}", completed.format("%Y-%m-%d %H:%M:%S"));
        let seconds = completed.signed_duration_since(job.created_at).num_seconds();
        println!("  Duration:    {}s", seconds);
    }

    if let Some(url) = &job.video_url {
        println!("  Video:       {}", url.underline());
    }

    if let Some(note) = &job.note {
        println!("  Note:        {}", note.yellow());
    }

    if let Some(error) = &job.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }

    if let Some(analytics) = &job.analytics {
        println!();
        print_analytics(analytics);
    }
}

/// Print field analytics
pub(crate) fn print_analytics(analytics: &FieldAnalytics) {
    let title = if analytics.is_substitute() {
        format!("{} {}", "Analytics".bold(), "(substitute)".yellow())
    } else {
        "Analytics".bold().to_string()
    };
    println!("{}", title);
    println!("  Land area:      {:.1} ha", analytics.land_area_ha());
    println!(
        "  Water need:     {:.0} L/day",
        analytics.water_need_l_per_day()
    );
    println!("  Profit:         ${:.0}/ha", analytics.profit_usd_per_ha());
    println!(
        "  Risk:           {} ({})",
        analytics.risk_score(),
        colorize_risk(analytics.risk_label())
    );
    println!("  Sustainability: {}", analytics.sustainability_score());
    println!("  Soil:           {}", analytics.soil_type());
    println!("  Vegetation:     {}", analytics.dominant_vegetation());
    println!("  Recommended:    {}", analytics.recommended_crop().green());

    if !analytics.notes().is_empty() {
        println!("  Notes:          {}", analytics.notes().dimmed());
    }
}

/// Colorize job status for display
fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        JobStatus::Generating => status_str.cyan(),
        JobStatus::Ready => status_str.green(),
        JobStatus::Error => status_str.red(),
    }
}

fn colorize_risk(label: RiskLabel) -> ColoredString {
    let label_str = label.to_string();
    match label {
        RiskLabel::Low => label_str.green(),
        RiskLabel::Moderate => label_str.yellow(),
        RiskLabel::High | RiskLabel::Critical => label_str.red(),
    }
}
