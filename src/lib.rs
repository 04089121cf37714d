//! fpembed - audio fingerprint embeddings from a remote inference server.
//!
//! Audio is decoded, framed into overlapping one-second segments, turned
//! into log-mel spectrograms, and sent in chunks to a Triton-compatible
//! server hosting the `neuralfp` model. The per-chunk outputs are joined
//! into one embedding row per segment.
//!
//! ```no_run
//! use fpembed::config::Config;
//! use fpembed::inference::TritonClient;
//! use fpembed::pipeline::Embedder;
//!
//! let config = Config::default();
//! let backend = TritonClient::from_config(&config.server)?;
//! let embedder = Embedder::new(&config, backend)?;
//! let embeddings = embedder.embed_file("song.wav".as_ref())?;
//! println!("{:?}", embeddings.dim());
//! # Ok::<(), fpembed::Error>(())
//! ```

#![warn(missing_docs)]

pub mod audio;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod inference;
pub mod output;
pub mod pipeline;

use clap::Parser;
use cli::{Cli, Command, ConfigAction, EmbedArgs};
use config::{
    Config, config_file_path, load_default_config, save_default_config, validate_config,
};
use indicatif::MultiProgress;
use inference::TritonClient;
use output::{EmbeddingSettings, progress, write_features_json};
use pipeline::{
    Embedder, ProcessCheck, ProcessOptions, collect_input_files, features_path_for,
    output_dir_for, process_file, should_process,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

pub use error::{Error, Result};

/// Main entry point for the fpembed CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.embed.verbose, cli.embed.quiet);

    let mut config = load_default_config()?;
    apply_overrides(&mut config, &cli.embed)?;
    validate_config(&config)?;

    if let Some(command) = cli.command {
        return handle_command(command, &config);
    }

    if cli.inputs.is_empty() {
        cli::help::print_smart_help(&config);
        return Ok(());
    }

    embed_files(&cli.inputs, &cli.embed, &config)
}

/// Apply command-line and environment overrides on top of the file config.
pub fn apply_overrides(config: &mut Config, args: &EmbedArgs) -> Result<()> {
    if let Some(server) = &args.server {
        config.server.url.clone_from(server);
    }
    if let Some(model) = &args.model {
        config.server.model.clone_from(model);
    }
    if let Some(timeout) = args.timeout {
        config.server.timeout_secs = timeout;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.batching.chunk_size =
            usize::try_from(chunk_size).map_err(|_| Error::ConfigValidation {
                message: format!("chunk size {chunk_size} is too large"),
            })?;
    }
    if let Some(layout) = args.layout {
        config.features.layout = layout;
    }
    if let Some(formats) = &args.format {
        config.output.formats.clone_from(formats);
    }
    if args.resample {
        config.audio.resample = true;
    }
    Ok(())
}

/// Embed every audio file under `inputs`.
///
/// A failing file is logged and skipped unless `--fail-fast` is set; the
/// run still ends with [`Error::FilesFailed`] if any file failed.
fn embed_files(inputs: &[PathBuf], args: &EmbedArgs, config: &Config) -> Result<()> {
    let total_start = Instant::now();

    let files = collect_input_files(inputs)?;
    if files.is_empty() {
        return Err(Error::NoValidAudioFiles);
    }
    info!("Found {} audio file(s) to process", files.len());

    let backend = TritonClient::from_config(&config.server)?;
    let embedder = Embedder::new(config, backend)?;
    info!(
        "Using model '{}' at {}",
        config.server.model, config.server.url
    );

    let progress_enabled = !args.quiet && !args.no_progress;
    let options = ProcessOptions {
        output_dir: args.output_dir.clone(),
        formats: config.output.formats.clone(),
        force: args.force,
        progress: progress_enabled,
    };

    let multi_progress = MultiProgress::new();
    let file_progress = progress::create_file_progress(files.len(), progress_enabled)
        .map(|pb| multi_progress.add(pb));

    let mut processed = 0;
    let mut skipped = 0;
    let mut errors = 0;
    let mut total_segments = 0;

    for file in &files {
        let file_output_dir = output_dir_for(file, options.output_dir.as_deref());

        if should_process(file, &file_output_dir, &options.formats, options.force)
            == ProcessCheck::SkipExists
        {
            info!("Skipping (output exists): {}", file.display());
            skipped += 1;
            progress::inc_progress(file_progress.as_ref());
            continue;
        }

        match process_file(file, &file_output_dir, &embedder, &options, &multi_progress) {
            Ok(result) => {
                processed += 1;
                total_segments += result.segments;
            }
            Err(e) => {
                error!("Failed to process {}: {}", file.display(), error_chain(&e));
                errors += 1;
                if args.fail_fast {
                    progress::finish_progress(file_progress, "Failed");
                    return Err(e);
                }
            }
        }
        progress::inc_progress(file_progress.as_ref());
    }

    progress::finish_progress(file_progress, "Complete");

    let total_duration = total_start.elapsed().as_secs_f64();
    info!(
        "Complete: {} processed, {} skipped, {} errors, {} segments embedded in {:.2}s",
        processed, skipped, errors, total_segments, total_duration
    );

    if errors > 0 {
        warn!("{} file(s) had errors", errors);
        return Err(Error::FilesFailed {
            failed: errors,
            total: files.len(),
        });
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // HTTP client internals stay quiet unless tracing everything.
    let filter_str = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info,hyper=warn,reqwest=warn",
            1 => "debug,hyper=info,reqwest=info",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Render an error and its sources on one line.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn handle_command(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Config { action } => handle_config_command(action, config),
        Command::Health => handle_health_command(config),
        Command::Features { file, output } => {
            handle_features_command(&file, output.as_deref(), config)
        }
    }
}

#[allow(clippy::print_stdout)]
fn handle_config_command(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = config_file_path()?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                let saved_path = save_default_config(&Config::default())?;
                println!("Created configuration file: {}", saved_path.display());
                println!("\nNext steps:");
                println!("  fpembed health --server <host:port>");
                println!("  fpembed recording.wav");
            }
            Ok(())
        }
        ConfigAction::Show => {
            let rendered =
                toml::to_string_pretty(config).map_err(|e| Error::ConfigSerialize { source: e })?;
            println!("{rendered}");
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", config_file_path()?.display());
            Ok(())
        }
    }
}

#[allow(clippy::print_stdout)]
fn handle_health_command(config: &Config) -> Result<()> {
    let client = TritonClient::from_config(&config.server)?;
    let model = &config.server.model;

    let server_ready = client.server_ready().map_err(Error::Server)?;
    println!(
        "Server {}: {}",
        client.base_url(),
        if server_ready { "ready" } else { "not ready" }
    );
    if !server_ready {
        return Err(Error::NotReady {
            target: format!("server {}", client.base_url()),
        });
    }

    let model_ready = client.model_ready(model).map_err(Error::Server)?;
    println!(
        "Model {model}: {}",
        if model_ready { "ready" } else { "not ready" }
    );
    if !model_ready {
        return Err(Error::NotReady {
            target: format!("model '{model}'"),
        });
    }

    match client.model_metadata(model) {
        Ok(metadata) => {
            if !metadata.platform.is_empty() {
                println!("  Platform: {}", metadata.platform);
            }
            if !metadata.versions.is_empty() {
                println!("  Versions: {}", metadata.versions.join(", "));
            }
            for tensor in &metadata.inputs {
                println!(
                    "  Input  {}: {} {:?}",
                    tensor.name, tensor.datatype, tensor.shape
                );
            }
            for tensor in &metadata.outputs {
                println!(
                    "  Output {}: {} {:?}",
                    tensor.name, tensor.datatype, tensor.shape
                );
            }
        }
        Err(e) => warn!("Could not fetch metadata for '{}': {}", model, e),
    }

    Ok(())
}

/// Backend for runs that never reach the server.
#[derive(Debug)]
struct Offline;

impl inference::InferenceBackend for Offline {
    fn infer(
        &self,
        _model: &str,
        _request: &inference::InferRequest,
    ) -> std::result::Result<inference::InferResponse, inference::InferenceError> {
        Err(inference::InferenceError::Protocol {
            reason: "feature extraction does not contact the server".to_string(),
        })
    }
}

#[allow(clippy::print_stdout)]
fn handle_features_command(file: &Path, output: Option<&Path>, config: &Config) -> Result<()> {
    let embedder = Embedder::new(config, Offline)?;
    let features = embedder.extract_features(file)?;

    let output_path = output.map_or_else(
        || features_path_for(file, &output_dir_for(file, None)),
        Path::to_path_buf,
    );
    let settings = EmbeddingSettings::new(&config.features, config.batching.chunk_size);
    write_features_json(&output_path, file, &settings, &features)?;

    println!(
        "Wrote features {:?} to {}",
        features.shape(),
        output_path.display()
    );
    Ok(())
}
