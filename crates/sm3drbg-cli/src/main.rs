//! CLI for sm3drbg: an SM3 Hash_DRBG seeded from system telemetry.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sm3drbg")]
#[command(about = "sm3drbg: SM3 Hash_DRBG seeded from system telemetry")]
#[command(version = sm3drbg_core::VERSION)]
struct Cli {
    /// JSON configuration file (missing fields take their defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate 256-bit output blocks
    Generate {
        /// Number of 256-bit blocks
        #[arg(long, default_value = "1")]
        count: usize,

        /// Output format: bits (one line per block), hex (one line per block), raw (binary)
        #[arg(long, default_value = "bits", value_parser = ["bits", "hex", "raw"])]
        format: String,

        /// Operating mode 0-3, overrides the config file
        #[arg(long)]
        mode: Option<u8>,

        /// Personalization string used at instantiation
        #[arg(long, default_value = "")]
        personalization: String,

        /// Additional input mixed into every generate call
        #[arg(long, default_value = "")]
        additional: String,
    },

    /// Write a binary sample file for external statistical test suites
    Sample {
        /// Output file
        #[arg(long, default_value = "sample.bin")]
        output: PathBuf,

        /// Sample length in bits, rounded up to whole 256-bit blocks
        #[arg(long, default_value_t = sm3drbg_core::DEFAULT_SAMPLE_BITS)]
        bits: u64,

        /// Operating mode 0-3, overrides the config file
        #[arg(long)]
        mode: Option<u8>,
    },

    /// Estimate the Markov min-entropy of every telemetry source
    Estimate {
        /// Bits collected per source
        #[arg(long, default_value_t = sm3drbg_core::DEFAULT_ESTIMATE_BITS)]
        bits: usize,

        /// Write the per-source estimates to this JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run the known-answer self-test for both derivation variants
    Selftest,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Generate {
            count,
            format,
            mode,
            personalization,
            additional,
        } => commands::generate::run(commands::generate::GenerateCommandConfig {
            config_path: config,
            mode,
            count,
            format: &format,
            personalization: personalization.as_bytes(),
            additional: additional.as_bytes(),
        }),
        Commands::Sample { output, bits, mode } => {
            commands::sample::run(config, mode, &output, bits)
        }
        Commands::Estimate { bits, output } => commands::estimate::run(bits, output.as_deref()),
        Commands::Selftest => commands::selftest::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
