//! CLI for generating one web component from a description.
//!
//! # Usage
//!
//! ```bash
//! # Print the generated HTML
//! cargo run -p wgen-generator --bin wgen-generate -- "a red button"
//!
//! # Save output to file
//! cargo run -p wgen-generator --bin wgen-generate -- "a login form" --output form.html
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wgen_generator::{parse_max_tokens, GenerationOrchestrator, GeneratorConfig};
use wgen_model::{CandleBackend, ModelConfig, ModelHandler};

/// Generate a self-contained HTML component from a description.
#[derive(Debug, Parser)]
#[command(name = "wgen-generate", version)]
struct Args {
    /// Natural-language description of the component
    description: String,

    /// Write the HTML here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Model variant, e.g. 1.3b or 6.7b (overrides MODEL_SIZE)
    #[arg(short, long)]
    model_size: Option<String>,

    /// Maximum new tokens
    #[arg(
        short = 'n',
        long,
        default_value_t = GeneratorConfig::default().max_tokens,
        value_parser = parse_max_tokens
    )]
    max_tokens: usize,

    /// Run on CPU even if CUDA is available
    #[arg(long)]
    cpu: bool,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut model_config = ModelConfig::from_env();
    if let Some(size) = args.model_size {
        model_config = model_config.with_model_size(size);
    }
    model_config.use_gpu = !args.cpu;

    let backend = Arc::new(CandleBackend::new(model_config.clone()));
    let handler = Arc::new(ModelHandler::new(backend, &model_config));
    let config = GeneratorConfig {
        max_tokens: args.max_tokens,
        ..Default::default()
    };
    let orchestrator = GenerationOrchestrator::new(Arc::clone(&handler), config);

    let result = orchestrator.run(&args.description).await;
    handler.unload().await;

    match result {
        Ok(output) => {
            if !args.quiet {
                eprintln!("{}", output.format_summary());
            }

            match args.output {
                Some(path) => match std::fs::write(&path, &output.code) {
                    Ok(()) => {
                        if !args.quiet {
                            eprintln!("Code written to: {}", path.display());
                        }
                    }
                    Err(e) => {
                        eprintln!("Failed to write output: {}", e);
                        return ExitCode::FAILURE;
                    }
                },
                None => println!("{}", output.code),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(preview) = e.raw_preview() {
                eprintln!();
                eprintln!("Model output (truncated):");
                eprintln!("{}", preview);
            }
            ExitCode::FAILURE
        }
    }
}
