//! Analyze command handler
//!
//! Uploads a field photograph and reports the analytics and video job.

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;
use std::time::Duration;

use crate::api::ApiClient;
use crate::commands::job::{print_analytics, print_job_details, wait_for_job};
use crate::config::Config;

/// Longest time `--wait` keeps polling
const WAIT_TIMEOUT: Duration = Duration::from_secs(600);
const WAIT_INTERVAL: Duration = Duration::from_secs(5);

/// Upload an image and print the result
pub async fn handle_analyze(
    image: &Path,
    crop: Option<&str>,
    wait: bool,
    config: &Config,
) -> Result<()> {
    let mime_type = mime_for(image)?;
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("Failed to read {}", image.display()))?;
    let file_name = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "field".to_string());

    let client = ApiClient::new(&config.server_url);
    let response = client.analyze(bytes, &file_name, mime_type, crop).await?;

    println!("{}", "✓ Image analyzed".green());
    println!();
    print_analytics(&response.analytics);
    println!();
    println!("  Job ID:   {}", response.job_id.to_string().cyan());
    println!("  Status:   {}", response.status);
    if let Some(url) = &response.video_url {
        println!("  Video:    {}", url.underline());
    }

    if wait && !response.status.is_terminal() {
        println!();
        let job = wait_for_job(&client, response.job_id, WAIT_INTERVAL, WAIT_TIMEOUT).await?;
        print_job_details(&job);
    } else if !response.status.is_terminal() {
        println!();
        println!(
            "{}",
            format!("Check progress with: verdant job get {}", response.job_id).dimmed()
        );
    }

    Ok(())
}

/// MIME type of an image, from its extension
fn mime_for(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        "webp" => Ok("image/webp"),
        "gif" => Ok("image/gif"),
        "heic" => Ok("image/heic"),
        _ => anyhow::bail!("Unsupported image type: {}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_known_extensions() {
        assert_eq!(mime_for(Path::new("field.JPG")).unwrap(), "image/jpeg");
        assert_eq!(mime_for(Path::new("a/b/field.png")).unwrap(), "image/png");
    }

    #[test]
    fn test_mime_for_rejects_other_files() {
        assert!(mime_for(Path::new("notes.txt")).is_err());
        assert!(mime_for(Path::new("no_extension")).is_err());
    }
}
