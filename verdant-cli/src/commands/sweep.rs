//! Sweep command handler

use anyhow::Result;
use colored::*;

use crate::api::ApiClient;
use crate::config::Config;

/// Ask the server to evict expired jobs
pub async fn handle_sweep(max_age: Option<u64>, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url);
    let report = client.sweep(max_age).await?;

    if report.is_empty() {
        println!("{}", "No expired jobs.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("✓ Removed {} job(s)", report.removed.len()).green()
    );
    for id in &report.removed {
        println!("  {}", id.to_string().dimmed());
    }
    println!("  Videos deleted: {}", report.artifacts_deleted);
    if report.artifact_failures > 0 {
        println!(
            "  {}",
            format!("Videos not deleted: {}", report.artifact_failures).red()
        );
    }

    Ok(())
}
