//! adapay offline tool
//!
//! Works without a wallet connection:
//! - Validate and normalize addresses
//! - Estimate fees and sendable amounts
//! - Decode provider balance strings
//! - Build unsigned transactions from a JSON plan

mod plan;

use adapay_core::{
    ada_to_lovelace, decode_balance, lovelace_to_ada, AddressCodec, FeeEstimator, SendConfig,
};
use adapay_params::NetworkType;
use clap::{Parser, Subcommand};
use plan::{BuildPlan, BuildSummary};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "adapay")]
#[command(about = "Offline Cardano send tooling", long_about = None)]
struct Cli {
    /// Network (mainnet, preprod, preview)
    #[arg(short, long, env = "ADAPAY_NETWORK", global = true)]
    network: Option<NetworkType>,

    /// JSON send configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Address checks
    Address {
        #[command(subcommand)]
        command: AddressCommands,
    },

    /// Fee estimates
    Fee {
        #[command(subcommand)]
        command: FeeCommands,
    },

    /// Balance decoding
    Balance {
        #[command(subcommand)]
        command: BalanceCommands,
    },

    /// Build an unsigned transaction from a plan file
    Build {
        /// Plan JSON (recipient, amount_ada, memo, change_address, utxos)
        #[arg(short, long)]
        plan: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AddressCommands {
    /// Check that an address can receive payments on the network
    Validate { address: String },
    /// Render an address (text or hex) in canonical text form
    Normalize { address: String },
}

#[derive(Subcommand)]
enum FeeCommands {
    /// Advisory fee for an amount
    Estimate {
        /// Amount in ADA
        #[arg(short, long)]
        amount: String,

        /// Include a memo
        #[arg(short, long)]
        memo: bool,
    },
    /// Largest amount a balance can send
    MaxSendable {
        /// Balance in ADA
        #[arg(short, long)]
        balance: String,

        /// Include a memo
        #[arg(short, long)]
        memo: bool,
    },
}

#[derive(Subcommand)]
enum BalanceCommands {
    /// Decode a balance string as returned by a wallet
    Decode { raw: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.network)?;

    match cli.command {
        Commands::Address { command } => run_address(&config, command),
        Commands::Fee { command } => run_fee(command),
        Commands::Balance {
            command: BalanceCommands::Decode { raw },
        } => {
            let balance = decode_balance(&raw)?;
            println!(
                "{} ADA ({} lovelace, {:?})",
                lovelace_to_ada(balance.lovelace),
                balance.lovelace,
                balance.encoding
            );
            Ok(())
        }
        Commands::Build { plan, json } => run_build(&config, &plan, json),
    }
}

fn load_config(path: Option<&std::path::Path>, network: Option<NetworkType>) -> anyhow::Result<SendConfig> {
    let mut config = match path {
        Some(path) => SendConfig::from_json_file(path)?,
        None => SendConfig::default(),
    };
    if let Some(network) = network {
        config.network = network;
    }
    config.validate()?;
    Ok(config)
}

fn run_address(config: &SendConfig, command: AddressCommands) -> anyhow::Result<()> {
    match command {
        AddressCommands::Validate { address } => {
            let codec = AddressCodec::new(config.network_params());
            match codec.parse_payment_address(&address) {
                Ok(parsed) => {
                    println!("valid {:?} address on {}", parsed.kind(), config.network);
                    Ok(())
                }
                Err(e) => anyhow::bail!("{}", e),
            }
        }
        AddressCommands::Normalize { address } => {
            println!("{}", AddressCodec::normalize(&address)?);
            Ok(())
        }
    }
}

fn run_fee(command: FeeCommands) -> anyhow::Result<()> {
    let estimator = FeeEstimator::new();
    match command {
        FeeCommands::Estimate { amount, memo } => {
            let fee = estimator.estimate(ada_to_lovelace(&amount)?, memo);
            println!("~{} ADA", lovelace_to_ada(fee));
        }
        FeeCommands::MaxSendable { balance, memo } => {
            let max = estimator.max_sendable(ada_to_lovelace(&balance)?, memo);
            println!("{} ADA", lovelace_to_ada(max));
        }
    }
    Ok(())
}

fn run_build(config: &SendConfig, path: &std::path::Path, json: bool) -> anyhow::Result<()> {
    info!("Building plan {} on {}", path.display(), config.network);

    let plan = BuildPlan::load(path)?;
    let draft = plan.build(config)?;
    let summary = BuildSummary::from_draft(&draft)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Transaction id: {}", summary.transaction_id);
    println!("Inputs:         {}", summary.inputs);
    println!("Fee:            {} ADA", summary.fee_ada);
    match summary.change {
        Some(change) => println!("Change:         {} ADA", lovelace_to_ada(change)),
        None => println!("Change:         none (folded into fee)"),
    }
    println!("Unsigned:       {}", summary.unsigned_transaction);
    Ok(())
}
