use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use caption_transcriptor::cli::{Cli, Commands, OutputFormat};
use caption_transcriptor::{output, utils, AcquisitionResult, CaptionEngine, Config, TranscriptorError, VideoId};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so transcripts can be piped
    let default_filter = if cli.verbose {
        "caption_transcriptor=debug"
    } else if cli.quiet {
        "caption_transcriptor=warn"
    } else {
        "caption_transcriptor=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load().await?;

    match cli.command {
        Commands::Fetch {
            inputs,
            output_dir,
            stdout,
            format,
            languages,
            fallback_languages,
            concurrency,
        } => {
            let mut config = config;
            config.override_languages(languages, fallback_languages);
            if let Some(concurrency) = concurrency {
                config.app.max_concurrent_jobs = concurrency;
            }
            if let Some(dir) = output_dir {
                config.app.output_dir = dir;
            }
            config.validate()?;

            let format = match format {
                Some(format) => format,
                None => config.app.default_output_format.parse::<OutputFormat>()?,
            };

            let video_ids = resolve_inputs(&inputs)?;

            // The external tool is only the last fallback, so a missing one is not fatal
            let missing_deps = utils::check_dependencies(&config.tool.program).await;
            for dep in missing_deps {
                tracing::warn!("Dependency not found: {}", dep);
            }

            let engine = CaptionEngine::from_config(&config)?;

            let cancel = engine.cancel_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling outstanding work");
                    cancel.cancel();
                }
            });

            let progress = if cli.quiet {
                ProgressBar::hidden()
            } else {
                let progress = ProgressBar::new(video_ids.len() as u64);
                progress.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?,
                );
                progress
            };

            tracing::info!("Fetching captions for {} video(s)", video_ids.len());

            let results = engine
                .acquire_all_with(&video_ids, config.app.max_concurrent_jobs, |video_id, result| {
                    progress.set_message(format!("{}: {}", video_id, result.label()));
                    progress.inc(1);
                })
                .await;
            progress.finish_and_clear();

            let successes = emit_results(&video_ids, &results, stdout, &config.app.output_dir, format).await?;

            if successes == 0 {
                anyhow::bail!("No transcripts could be retrieved");
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Configuration file: {}", Config::config_path()?.display());
                println!("Edit it to change languages, upstream settings and defaults; use --show to print it.");
            }
        }
        Commands::Check => {
            let missing_deps = utils::check_dependencies(&config.tool.program).await;
            if missing_deps.is_empty() {
                println!("All external tools are available");
            } else {
                for dep in &missing_deps {
                    println!("Missing: {}", dep);
                }
                anyhow::bail!("{} external tool(s) missing", missing_deps.len());
            }
        }
    }

    Ok(())
}

/// Turn every argument into a video identifier, rejecting the lot if any is unrecognizable
fn resolve_inputs(inputs: &[String]) -> Result<Vec<VideoId>> {
    inputs
        .iter()
        .map(|input| {
            utils::extract_video_id(input)
                .ok_or_else(|| TranscriptorError::InvalidVideoReference(input.clone()).into())
        })
        .collect()
}

/// Write or print every transcript in input order and report the rest; returns the success count
async fn emit_results(
    video_ids: &[VideoId],
    results: &HashMap<VideoId, AcquisitionResult>,
    stdout: bool,
    output_dir: &Path,
    format: OutputFormat,
) -> Result<usize> {
    let mut successes = 0;
    let mut reported = HashSet::new();

    for video_id in video_ids {
        if !reported.insert(video_id) {
            continue;
        }

        match results.get(video_id) {
            Some(AcquisitionResult::Success(transcript)) => {
                successes += 1;
                if stdout {
                    output::print_to_console(transcript, format)?;
                } else {
                    let path = output::save_to_dir(transcript, output_dir, format).await?;
                    println!(
                        "{} -> {} ({} lines via {})",
                        video_id,
                        path.display(),
                        transcript.lines.len(),
                        transcript.source.as_str()
                    );
                }
            }
            Some(AcquisitionResult::TransientFailure(reason)) => {
                eprintln!("{}: transient failure, try again later ({})", video_id, reason);
            }
            Some(other) => {
                eprintln!("{}: {}", video_id, other.label());
            }
            None => {
                eprintln!("{}: no result", video_id);
            }
        }
    }

    eprintln!("{} of {} transcript(s) retrieved", successes, reported.len());
    Ok(successes)
}
