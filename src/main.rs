mod cli;
mod config;

use gf_av::{MediaProbe, ProcessRunner, ToolRegistry};
use gf_core::{CompletionStatus, ConversionEvent, ConversionRequest, Scale};
use gf_pipeline::{ConversionPipeline, ConversionWorker, PipelineSettings};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "gifforge=trace,gf_pipeline=debug,gf_av=debug,gf_core=debug".to_string()
        } else {
            "gifforge=info,gf_pipeline=info,gf_av=info,gf_core=info".to_string()
        }
    });

    // Logs go to stderr so they never tear the progress line on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert {
            file,
            scale,
            fps,
            palette,
            no_palette,
        } => {
            let palette = cli::palette_choice(palette, no_palette);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert(&file, scale, fps, palette, cli.config.as_deref()))
        }
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, json, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("gifforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn convert(
    file: &Path,
    scale: Option<Scale>,
    fps: Option<u32>,
    palette: Option<bool>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let defaults = &config.conversion;

    let request = ConversionRequest::new(
        file,
        scale.unwrap_or(defaults.scale),
        fps.unwrap_or(defaults.fps),
        palette.unwrap_or(defaults.palette),
    );
    request.validate(defaults)?;

    let tools = ToolRegistry::discover(&config.tools);
    let pipeline = ConversionPipeline::new(
        Arc::new(ProcessRunner),
        &tools,
        PipelineSettings::from_config(&config),
    )?;

    let plan = pipeline.plan(&request);
    for stage in plan.stages() {
        tracing::debug!("Stage {}: {}", stage.number, stage.invocation.command_line());
    }

    let (worker, mut events) = ConversionWorker::new(pipeline);
    let handle = worker.submit(request)?;

    let mut verdict = None;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ConversionEvent::ProgressUpdated { fraction }) => render_progress(fraction),
                Some(ConversionEvent::Completed { status, message }) => {
                    println!();
                    verdict = Some((status, message));
                }
                Some(ConversionEvent::BusyChanged { busy: false }) | None => break,
                Some(ConversionEvent::BusyChanged { busy: true }) => render_progress(0.0),
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                worker.cancel();
            }
        }
    }

    let output = handle.await.context("conversion task panicked")?;

    match verdict {
        Some((CompletionStatus::Success, message)) => {
            println!("{message}");
            Ok(())
        }
        Some((CompletionStatus::Failure, message)) => anyhow::bail!(message),
        None => output.map(|_| ()).map_err(Into::into),
    }
}

fn render_progress(fraction: f64) {
    const WIDTH: usize = 30;
    let filled = ((fraction * WIDTH as f64).round() as usize).min(WIDTH);
    let mut stdout = std::io::stdout().lock();
    let _ = write!(
        stdout,
        "\r[{}{}] {:>3.0}%",
        "#".repeat(filled),
        "-".repeat(WIDTH - filled),
        fraction * 100.0
    );
    let _ = stdout.flush();
}

async fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools);
    let probe = MediaProbe::new(tools.ffprobe()?, config.limits.probe_timeout());
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });
    let frames = probe.count_frames(&ProcessRunner, file, &cancel).await?;

    if json {
        let value = serde_json::json!({
            "file": file,
            "frames": frames,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("File: {}", file.display());
        println!("Frames: {frames}");
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to enable conversion.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => match config::default_path() {
            Some(p) => {
                println!("Validating config: {}", p.display());
                let config = config::load_config(&p)?;
                println!("✓ Configuration is valid");
                config
            }
            None => {
                println!("No config file specified, using defaults");
                gf_core::config::Config::default()
            }
        },
    };

    let conversion = &config.conversion;
    println!("  Scale: {}", conversion.scale);
    println!("  FPS: {}", conversion.fps);
    println!("  Palette: {}", conversion.palette);
    println!("  Overwrite output: {}", conversion.overwrite_output);
    println!("  Scratch dir: {}", conversion.scratch_dir().display());
    println!("  Probe timeout: {}s", config.limits.probe_timeout_secs);
    match config.limits.encode_timeout_secs {
        Some(secs) => println!("  Encode timeout: {secs}s"),
        None => println!("  Encode timeout: none"),
    }

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &warnings {
            println!("  - {warning}");
        }
    }

    Ok(())
}
