//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - resolves the compute device
//! - runs the pipeline
//! - prints the run summary

use clap::Parser;

use crate::cli::Cli;
use crate::domain::{BoostParams, Device, DivisorMode, RunConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `salary` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is fine; it only supplies optional defaults.
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
    let cli = Cli::parse();
    let config = config_from_args(&cli)?;
    if cli.lr != RunConfig::default().lr {
        tracing::info!(lr = cli.lr, shrinkage = cli.shrinkage, "--lr is recorded only; boosting uses --shrinkage");
    }

    let run = pipeline::run_pipeline(&config)?;
    print!("{}", crate::report::format_run_summary(&run, &config));
    Ok(())
}

/// Build the run configuration from parsed arguments.
pub fn config_from_args(cli: &Cli) -> Result<RunConfig, AppError> {
    Ok(RunConfig {
        data_path: cli.data_path.clone(),
        synthetic: cli.synthetic,
        tokenizer_path: cli.tokenizer.clone(),
        max_len: cli.max_len,
        vocab_size: cli.vocab_size,
        batch_size: cli.batch_size,
        lr: cli.lr,
        seed: cli.seed,
        test_fraction: cli.test_fraction,
        val_fraction: cli.val_fraction,
        boost: BoostParams {
            n_estimators: cli.epochs,
            learning_rate: cli.shrinkage,
            max_depth: cli.max_depth,
            min_samples_leaf: cli.min_samples_leaf,
            patience: cli.patience,
        },
        loss: cli.loss,
        ordering: cli.ordering,
        divisor: if cli.legacy_divisor {
            DivisorMode::LastIndex
        } else {
            DivisorMode::SampleCount
        },
        device: resolve_device(cli.device)?,
        plot: cli.plot,
        plot_dir: cli.plot_dir.clone(),
        use_trained: cli.use_trained.clone(),
        save_model: cli.save_model.clone(),
        predict: cli.predict.clone(),
        export: cli.export.clone(),
    })
}

/// Pick the device once, up front. Only the CPU backend is built in.
pub fn resolve_device(requested: Device) -> Result<Device, AppError> {
    match requested {
        Device::Auto | Device::Cpu => {
            tracing::debug!(?requested, "using cpu");
            Ok(Device::Cpu)
        }
        Device::Accelerator => Err(AppError::input(
            "No accelerator backend is available in this build; use --device cpu.",
        )),
    }
}
