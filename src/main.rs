//! # Meridian
//!
//! Runs the compositor core against the in-memory backend: connects the
//! requested outputs, resolves their layout and ticks frames until the
//! process is signalled or the last output goes away.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use meridian::backend::headless::{HeadlessRenderer, HeadlessSeat};
use meridian::backend::BackendEvent;
use meridian::config::expand_path;
use meridian::{Compositor, MeridianConfig, OutputLayoutConfig};
use std::collections::HashMap;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser, Debug)]
#[command(name = "meridian")]
#[command(about = "Window placement, damage tracking and output layout policy for Wayland")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/meridian/meridian.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Output to connect, as NAME:WIDTHxHEIGHT (repeatable)
    #[arg(short, long = "output", value_parser = parse_output)]
    outputs: Vec<OutputSpec>,

    /// Stop after this many frame ticks (0 runs until signalled)
    #[arg(long, default_value_t = 0)]
    frames: u64,
}

#[derive(Debug, Clone, PartialEq)]
struct OutputSpec {
    name: String,
    width: i32,
    height: i32,
}

fn parse_output(s: &str) -> Result<OutputSpec, String> {
    let (name, mode) = s
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:WIDTHxHEIGHT, got '{s}'"))?;
    let (width, height) = mode
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{mode}'"))?;
    let width: i32 = width
        .parse()
        .map_err(|e| format!("invalid width '{width}': {e}"))?;
    let height: i32 = height
        .parse()
        .map_err(|e| format!("invalid height '{height}': {e}"))?;

    if name.is_empty() || width <= 0 || height <= 0 {
        return Err(format!("invalid output '{s}'"));
    }
    Ok(OutputSpec {
        name: name.to_string(),
        width,
        height,
    })
}

/// Reads persisted output snapshots; any failure means "no configuration"
fn load_layout_config(path: &str) -> Option<OutputLayoutConfig> {
    let path = match expand_path(path) {
        Ok(path) => path,
        Err(e) => {
            warn!("⚠️ Cannot resolve layout file path {}: {}", path, e);
            return None;
        }
    };
    if !path.exists() {
        info!("📐 No output layout file at {}, using default layout", path.display());
        return None;
    }

    match OutputLayoutConfig::load(&path) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("⚠️ Ignoring output layout file: {}", e);
            None
        }
    }
}

async fn run(mut compositor: Compositor, frames: u64) -> Result<()> {
    let max_fps = compositor.config().general.max_fps.max(1);
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / max_fps as f64));
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    let mut targets: HashMap<String, HeadlessRenderer> = HashMap::new();
    let mut ticks = 0u64;

    info!("🎬 Starting frame loop at {} fps", max_fps);
    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("📨 Received SIGTERM, shutting down gracefully");
                break;
            }
            _ = sigint.recv() => {
                info!("📨 Received SIGINT (Ctrl+C), shutting down gracefully");
                break;
            }
            _ = ticker.tick() => {
                let names: Vec<String> = compositor.outputs().iter().map(|o| o.name.clone()).collect();
                for name in names {
                    let target = targets.entry(name.clone()).or_default();
                    if compositor.frame(&name, target) {
                        debug!("🎨 {} repainted ({} ops)", name, target.ops.len());
                    }
                    target.ops.clear();
                }

                ticks += 1;
                if compositor.should_exit() {
                    info!("🛑 No outputs left");
                    break;
                }
                if frames > 0 && ticks >= frames {
                    info!("🏁 Completed {} frame ticks", ticks);
                    break;
                }
            }
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    info!("🚀 Starting Meridian");
    info!(
        "📄 Version: {} ({}, built {} for {})",
        meridian::VERSION,
        env!("MERIDIAN_GIT_COMMIT"),
        env!("MERIDIAN_BUILD_DATE"),
        env!("MERIDIAN_TARGET")
    );

    let config = match MeridianConfig::load(&cli.config) {
        Ok(config) => {
            info!("✅ Configuration loaded from: {}", cli.config);
            config
        }
        Err(e) => {
            warn!("⚠️ Failed to load configuration: {:#}", e);
            info!("📝 Using default configuration");
            MeridianConfig::default()
        }
    };

    let layout_config = load_layout_config(&config.general.layout_file);
    let mut compositor = Compositor::new(config, layout_config, Box::new(HeadlessSeat::new()));
    compositor.add_listener(|event| debug!("📣 {:?}", event));

    let outputs = if cli.outputs.is_empty() {
        vec![OutputSpec {
            name: "HEADLESS-1".to_string(),
            width: 1920,
            height: 1080,
        }]
    } else {
        cli.outputs
    };
    for output in outputs {
        compositor.handle_event(BackendEvent::OutputConnected {
            name: output.name,
            width: output.width,
            height: output.height,
        });
    }
    for line in compositor.describe_layout() {
        info!("🖥️ {}", line);
    }

    run(compositor, cli.frames).await?;

    info!("👋 Meridian shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["meridian"]).unwrap();
        assert!(!cli.debug);
        assert_eq!(cli.config, "~/.config/meridian/meridian.toml");
        assert!(cli.outputs.is_empty());
        assert_eq!(cli.frames, 0);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "meridian",
            "--debug",
            "--config",
            "/tmp/meridian.toml",
            "--output",
            "LVDS-1:1920x1080",
            "-o",
            "HDMI-1:2560x1440",
            "--frames",
            "3",
        ])
        .unwrap();

        assert!(cli.debug);
        assert_eq!(cli.config, "/tmp/meridian.toml");
        assert_eq!(
            cli.outputs,
            vec![
                OutputSpec {
                    name: "LVDS-1".into(),
                    width: 1920,
                    height: 1080
                },
                OutputSpec {
                    name: "HDMI-1".into(),
                    width: 2560,
                    height: 1440
                },
            ]
        );
        assert_eq!(cli.frames, 3);
    }

    #[test]
    fn test_invalid_output_is_rejected() {
        assert!(Cli::try_parse_from(["meridian", "--output", "HDMI-1"]).is_err());
        assert!(Cli::try_parse_from(["meridian", "--output", "HDMI-1:0x1080"]).is_err());
        assert!(Cli::try_parse_from(["meridian", "--output", ":800x600"]).is_err());
        assert!(parse_output("DP-2:3840xabc").is_err());
    }

    #[test]
    fn test_missing_layout_file_means_no_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outputs.toml");
        assert!(load_layout_config(&path.to_string_lossy()).is_none());

        std::fs::write(&path, "not [valid").unwrap();
        assert!(load_layout_config(&path.to_string_lossy()).is_none());

        std::fs::write(&path, "[[snapshot]]\nname = \"solo\"\n").unwrap();
        assert_eq!(load_layout_config(&path.to_string_lossy()).unwrap().snapshots.len(), 1);
    }
}
