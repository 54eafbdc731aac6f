use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transcript_sync::bridge::{self, TranscriptResponse};
use transcript_sync::cli::{Cli, Commands, OutputFormat};
use transcript_sync::config::Config;
use transcript_sync::extractors::{extract_video_id, VideoId};
use transcript_sync::output::{self, format_timestamp};
use transcript_sync::session::{publish_playback, PageSession, PlaybackClock, SharedLocation};
use transcript_sync::sync::PlaybackTracker;
use transcript_sync::transcribe::TranscriptPipeline;
use transcript_sync::{utils, ErrorCode, TranscriptError};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "transcript_sync=debug"
    } else {
        "transcript_sync=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(cli.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!cli.json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    match cli.command {
        Commands::Id { url } => {
            let video_id = require_video_id(&url)?;
            println!("{}", video_id);
        }
        Commands::Config { show } => {
            let config = Config::load().await?;
            if show {
                config.display();
            } else {
                println!("Configuration file: {}", Config::config_path()?.display());
            }
        }
        Commands::Fetch {
            url,
            output,
            format,
            lang,
            timestamps,
        } => {
            let config = load_config(&lang).await?;
            let video_id = require_video_id(&url)?;
            let format = match format {
                Some(format) => format,
                None => OutputFormat::from_name(&config.app.default_output_format)
                    .unwrap_or(OutputFormat::Text),
            };

            let pipeline = TranscriptPipeline::new(&config)?;
            let progress = spinner(cli.quiet, "Fetching transcript...");

            let result = pipeline
                .fetch(&video_id, &config.transcript.preferred_languages)
                .await;
            progress.finish_and_clear();
            let transcript = result.map_err(describe_failure)?;

            tracing::info!(
                "Fetched {} lines ({}) covering {}",
                transcript.snippets.len(),
                transcript.language_label(),
                utils::format_duration(utils::transcript_span(&transcript.snippets))
            );

            match output {
                Some(path) => {
                    output::save_to_file(&transcript, &path, &format, timestamps).await?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&transcript, &format, timestamps)?;
                }
            }
        }
        Commands::Tracks { url } => {
            let config = load_config(&[]).await?;
            let video_id = require_video_id(&url)?;
            let pipeline = TranscriptPipeline::new(&config)?;

            let progress = spinner(cli.quiet, "Listing caption tracks...");
            let result = pipeline.extractor().list_caption_tracks(&video_id).await;
            progress.finish_and_clear();
            let tracks = result.map_err(describe_failure)?;

            println!("Caption tracks for {}:", video_id);
            for track in tracks {
                let kind = if track.is_auto_generated { "auto-generated" } else { "manual" };
                println!("  • {:<10} {} ({})", track.language_code, track.name, kind);
            }
        }
        Commands::Sync {
            url,
            start,
            rate,
            lang,
        } => {
            if !rate.is_finite() || rate <= 0.0 {
                anyhow::bail!("Playback rate must be a positive number");
            }
            let config = load_config(&lang).await?;
            run_sync(&config, &url, start, rate).await?;
        }
    }

    Ok(())
}

async fn load_config(languages: &[String]) -> Result<Config> {
    let languages: Vec<String> = languages
        .iter()
        .map(|lang| utils::normalize_language_code(lang))
        .filter(|lang| !lang.is_empty())
        .collect();

    Ok(Config::load()
        .await
        .context("Failed to load configuration")?
        .with_languages(&languages))
}

fn require_video_id(url: &str) -> Result<VideoId> {
    extract_video_id(url).ok_or_else(|| {
        anyhow::anyhow!(
            "{} ({}): {}",
            output::error_message(ErrorCode::NotWatchPage),
            ErrorCode::NotWatchPage,
            url
        )
    })
}

fn describe_failure(e: TranscriptError) -> anyhow::Error {
    let code = e.code();
    anyhow::anyhow!(
        "{} ({})\n  {}\n  Hint: {}",
        output::error_message(code),
        code,
        e,
        output::error_hint(code)
    )
}

fn spinner(quiet: bool, message: &'static str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    if let Ok(progress_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        progress.set_style(progress_style);
    }
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Run the page context and a console display surface side by side
async fn run_sync(config: &Config, url: &str, start: f64, rate: f64) -> Result<()> {
    let location = Arc::new(SharedLocation::new(url));
    let pipeline = Arc::new(TranscriptPipeline::new(config)?);
    let session = Arc::new(PageSession::new(
        pipeline,
        location,
        config.transcript.preferred_languages.clone(),
    ));

    let (host, mut client) = bridge::channel(64);
    let notifier = host.notifier();
    tokio::spawn(host.serve(Arc::clone(&session)));
    tokio::spawn(Arc::clone(&session).watch(config.navigation_poll_interval()));

    let transcript = match client.get_transcript().await? {
        TranscriptResponse::Transcript { transcript } => transcript,
        TranscriptResponse::Error { error } => {
            anyhow::bail!(
                "{} ({})\n  Hint: {}",
                output::error_message(error),
                error,
                output::error_hint(error)
            );
        }
    };

    if transcript.snippets.is_empty() {
        println!("No transcript available.");
        return Ok(());
    }

    let span = utils::transcript_span(&transcript.snippets);
    println!(
        "{} - {} lines, {}",
        style(transcript.language_label()).bold(),
        transcript.snippets.len(),
        utils::format_duration(span)
    );

    tokio::spawn(publish_playback(
        notifier,
        PlaybackClock::new(start, rate),
        config.time_update_interval(),
        Some(span),
    ));

    let mut tracker = PlaybackTracker::new(transcript.snippets);
    loop {
        tokio::select! {
            update = client.next_time_update() => {
                let Some(time) = update else { break };
                if tracker.update(time).is_some() {
                    if let Some(snippet) = tracker.current_snippet() {
                        println!(
                            "{} {}",
                            style(format_timestamp(snippet.start)).dim(),
                            style(&snippet.text).cyan().bold()
                        );
                    }
                }
                if time >= span {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}
