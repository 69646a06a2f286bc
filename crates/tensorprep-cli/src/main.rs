//! tensorprep CLI - tabular and text preprocessing pipelines.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tensorprep_core::{Device, TabularConfig, TextConfig};
use tensorprep_data::{LoaderConfig, TabularDataset, TextDataset};

/// Compute device tag for produced batches.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum DeviceArg {
    /// CPU computation
    #[default]
    Cpu,
    /// GPU computation
    Gpu,
}

impl From<DeviceArg> for Device {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Cpu => Device::Cpu,
            DeviceArg::Gpu => Device::Gpu,
        }
    }
}

#[derive(Parser)]
#[command(name = "tensorprep")]
#[command(author, version, about = "Dataset preparation for model training", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare a tabular dataset and iterate its batches
    PrepareTabular {
        /// Registered dataset name
        #[arg(short, long, default_value = "weather")]
        name: String,

        /// Directory holding local dataset files
        #[arg(long)]
        data_dir: Option<String>,

        /// Hub token for private dataset repositories
        #[arg(long)]
        hub_token: Option<String>,

        /// Batch size
        #[arg(long, default_value = "32")]
        batch_size: usize,

        /// Random seed for shuffling
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Disable shuffling
        #[arg(long)]
        no_shuffle: bool,

        /// Drop the last incomplete batch
        #[arg(long)]
        drop_last: bool,

        /// Give each split its own freshly seeded shuffle stream
        /// (by default one stream drives every split loader)
        #[arg(long)]
        reseed_per_split: bool,

        /// Compute device tag for produced batches
        #[arg(long, value_enum, default_value = "cpu")]
        device: DeviceArg,
    },

    /// Prepare a text corpus and iterate its batches
    PrepareText {
        /// Registered corpus name
        #[arg(short, long, default_value = "opus_books")]
        name: String,

        /// Subword vocabulary size
        #[arg(long, default_value = "2000")]
        vocab_size: usize,

        /// Directory holding working files (tokens file, tokenizer model)
        #[arg(long)]
        data_dir: Option<String>,

        /// Read split files from this local directory instead of the hub
        #[arg(long)]
        local_dir: Option<String>,

        /// Hub token for private corpus repositories
        #[arg(long)]
        hub_token: Option<String>,

        /// Batch size
        #[arg(long, default_value = "32")]
        batch_size: usize,

        /// Random seed for shuffling
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Disable shuffling
        #[arg(long)]
        no_shuffle: bool,

        /// Drop the last incomplete batch
        #[arg(long)]
        drop_last: bool,

        /// Give each split its own freshly seeded shuffle stream
        #[arg(long)]
        reseed_per_split: bool,

        /// Decode and print the first example of each split
        #[arg(long)]
        show_samples: bool,

        /// Compute device tag for produced batches
        #[arg(long, value_enum, default_value = "cpu")]
        device: DeviceArg,
    },

    /// Inspect or clear the local data directory
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show the data directory location and size
    Info {
        /// Directory holding local dataset files
        #[arg(long)]
        data_dir: Option<String>,
    },
    /// Remove every file in the data directory
    Clear {
        /// Directory holding local dataset files
        #[arg(long)]
        data_dir: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::PrepareTabular {
            name,
            data_dir,
            hub_token,
            batch_size,
            seed,
            no_shuffle,
            drop_last,
            reseed_per_split,
            device,
        } => {
            let config = TabularConfig {
                name,
                device: device.into(),
                data_dir,
                hub_token,
            };
            let loader_config = LoaderConfig {
                batch_size,
                shuffle: !no_shuffle,
                drop_last,
                seed,
                reseed_per_split,
            };
            run_prepare_tabular(config, loader_config)
        }

        Commands::PrepareText {
            name,
            vocab_size,
            data_dir,
            local_dir,
            hub_token,
            batch_size,
            seed,
            no_shuffle,
            drop_last,
            reseed_per_split,
            show_samples,
            device,
        } => {
            let config = TextConfig {
                name,
                vocab_size,
                device: device.into(),
                data_dir,
                local_dir,
                hub_token,
            };
            let loader_config = LoaderConfig {
                batch_size,
                shuffle: !no_shuffle,
                drop_last,
                seed,
                reseed_per_split,
            };
            run_prepare_text(config, loader_config, show_samples)
        }

        Commands::Cache { command } => run_cache(command),
    }
}

fn batch_progress(len: u64, label: &str) -> ProgressBar {
    let progress = ProgressBar::new(len);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} | {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.set_message(label.to_string());
    progress
}

fn run_prepare_tabular(config: TabularConfig, loader_config: LoaderConfig) -> anyhow::Result<()> {
    let dataset = TabularDataset::new(config)?;

    println!("Dataset '{}' prepared.", dataset.policy().name());
    if let Some(scaler) = dataset.scaler() {
        println!(
            "  standardized {} predictor columns",
            scaler.mean().len()
        );
    }

    for (split, mut loader) in dataset.loaders(&loader_config) {
        let progress = batch_progress(loader.num_batches() as u64, split.as_str());
        let samples = loader.len();

        let mut first_shape: Option<Vec<usize>> = None;
        while let Some(batch) = loader.next_batch() {
            if first_shape.is_none() {
                first_shape = Some(batch.x.shape().to_vec());
            }
            progress.inc(1);
        }
        progress.finish();

        println!(
            "  {}: {} samples, batch x shape {:?}",
            split,
            samples,
            first_shape.unwrap_or_default()
        );
    }

    Ok(())
}

fn run_prepare_text(
    config: TextConfig,
    loader_config: LoaderConfig,
    show_samples: bool,
) -> anyhow::Result<()> {
    let dataset = TextDataset::new(config)?;

    println!("Corpus '{}' prepared.", dataset.policy().name());
    println!(
        "  vocabulary: {} subwords + 3 sentinels (pad={}, start={}, stop={})",
        dataset.sp_vocab_size(),
        dataset.pad_token(),
        dataset.start_token(),
        dataset.stop_token()
    );
    println!(
        "  padded lengths: x={}, target={}",
        dataset.x_length(),
        dataset.target_length()
    );

    if show_samples {
        for name in dataset.split_names() {
            if let Some(split) = dataset.split(name) {
                if let Some(seq) = split.x.first() {
                    let ids: Vec<i64> = seq.iter().map(|&id| id as i64).collect();
                    println!("  {} sample: {}", name, dataset.decode_ids(&ids)?);
                }
            }
        }
    }

    for (name, mut loader) in dataset.loaders(&loader_config) {
        let progress = batch_progress(loader.num_batches() as u64, &name);
        let samples = loader.len();

        let mut first_shape: Option<Vec<usize>> = None;
        while let Some(batch) = loader.next_batch() {
            if first_shape.is_none() {
                first_shape = Some(batch.y.shape().to_vec());
            }
            progress.inc(1);
        }
        progress.finish();

        println!(
            "  {}: {} samples, batch y shape {:?}",
            name,
            samples,
            first_shape.unwrap_or_default()
        );
    }

    Ok(())
}

fn run_cache(command: CacheCommands) -> anyhow::Result<()> {
    match command {
        CacheCommands::Info { data_dir } => {
            let dir = tensorprep_hub::data_dir(data_dir.as_deref());
            let size = tensorprep_hub::data_dir_size(&dir)?;
            println!("Data directory: {}", dir.display());
            println!("Size: {} bytes", size);
        }
        CacheCommands::Clear { data_dir } => {
            let dir = tensorprep_hub::data_dir(data_dir.as_deref());
            tensorprep_hub::clear_data_dir(&dir)?;
            println!("Cleared {}", dir.display());
        }
    }
    Ok(())
}
