//! Check command

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use winux_core::UpdaterConfig;
use winux_update::{BackgroundCheck, UpdateInfo, UpdatePipeline, VERSION};

use crate::cli::CheckArgs;
use crate::output;

pub async fn run(args: CheckArgs, config: UpdaterConfig) -> Result<()> {
    let metadata_timeout = Duration::from_secs(config.network.metadata_timeout_secs);
    let delay = background_delay(args.delay, config.notification.check_delay_secs);
    let pipeline = UpdatePipeline::new(config, VERSION).context("Failed to initialize updater")?;

    let info = match delay {
        Some(delay) => deferred_check(pipeline, delay, metadata_timeout).await?,
        None => {
            let spinner = (!args.json).then(|| output::spinner("Checking for updates..."));
            let result = pipeline.check_info().await;
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            result.context("Update check failed")?
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    show(&info);
    Ok(())
}

/// `--delay` alone falls back to the configured delay; no flag means a
/// foreground check
fn background_delay(flag: Option<Option<u64>>, configured_secs: u64) -> Option<Duration> {
    flag.map(|secs| Duration::from_secs(secs.unwrap_or(configured_secs)))
}

/// Run the check through a [`BackgroundCheck`] and wait for it, bounded by
/// the delay plus the metadata timeout.
async fn deferred_check(
    pipeline: UpdatePipeline,
    delay: Duration,
    metadata_timeout: Duration,
) -> Result<UpdateInfo> {
    let mut check = BackgroundCheck::spawn(Arc::new(pipeline), delay);
    let bound = delay + metadata_timeout;

    match check.wait(bound).await {
        Some(result) => result.context("Update check failed"),
        None => Err(anyhow!(
            "Update check did not finish within {}s",
            bound.as_secs()
        )),
    }
}

fn show(info: &UpdateInfo) {
    output::info(&format!("Current version: {}", info.current_version));

    if !info.available {
        output::success(&format!(
            "Already on the latest version ({})",
            info.latest_version
        ));
        return;
    }

    output::success(&format!("Update available: {}", info.latest_version));
    if let Some(published) = info.published_at {
        output::kv("Published", &published.format("%Y-%m-%d").to_string());
    }
    if !info.release_url.is_empty() {
        output::kv("Release", &info.release_url);
    }
    if !info.summary.is_empty() {
        println!();
        for line in &info.summary {
            println!("  {}", line);
        }
        println!();
    }
    if info.download_url.is_none() {
        output::warning("This release has no installable binary for this platform");
        return;
    }
    output::info("Run 'winux-update apply' to install the update");
}
