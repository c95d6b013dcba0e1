//! Settlement CLI.
//!
//! ```text
//! chain-settlement --config settlement.toml send --network avalanche \
//!     --from 0x.. --to 0x.. --symbol USDC --amount 1.5 --contract-ref c-17
//! chain-settlement deposits --network avalanche --buyer 0x.. --funder 0x.. \
//!     --symbol USDC --start 2024-01-01T00:00:00Z --end 2024-02-01T00:00:00Z
//! chain-settlement block-at --network avalanche --date 2024-01-01T00:00:00Z
//! chain-settlement contract --network fizit --contract-type purchase
//! ```
//!
//! Only `send` needs the signing session token
//! (`SETTLEMENT_SIGNER_SESSION_TOKEN`).

use std::path::PathBuf;
use std::sync::Arc;

use chain_settlement::blockchain::ConnectionRegistry;
use chain_settlement::config::load_config;
use chain_settlement::deposits::{block_from_date, DepositQuery, DepositScanner};
use chain_settlement::observability::logging;
use chain_settlement::payments::{PaymentBuilder, PaymentOutcome, PaymentRail, PaymentRequest};
use chain_settlement::{SettlementConfig, SettlementContext, SettlementError};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chain-settlement")]
#[command(about = "Payments and deposit scans on EVM networks", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "settlement.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Make a payment through a rail
    Send {
        #[arg(long)]
        network: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Native symbol or configured token symbol
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "")]
        contract_ref: String,
        #[arg(long, default_value = "token")]
        rail: String,
        /// External transaction reference (manual rail)
        #[arg(long)]
        reference: Option<String>,
    },
    /// List token transfers from buyer to funder in a date range
    Deposits {
        #[arg(long)]
        network: String,
        #[arg(long)]
        buyer: String,
        #[arg(long)]
        funder: String,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value = "")]
        counterparty: String,
        #[arg(long)]
        start: DateTime<Utc>,
        #[arg(long)]
        end: DateTime<Utc>,
    },
    /// Resolve a date to the first block at or after it
    BlockAt {
        #[arg(long)]
        network: String,
        #[arg(long)]
        date: DateTime<Utc>,
    },
    /// Print the deployed address of a contract type
    Contract {
        #[arg(long)]
        network: String,
        #[arg(long)]
        contract_type: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    logging::init(&config.observability);

    tracing::debug!(
        config = %cli.config.display(),
        networks = config.networks.len(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Send {
            network,
            from,
            to,
            symbol,
            amount,
            contract_ref,
            rail,
            reference,
        } => {
            let context = Arc::new(SettlementContext::from_env(config)?);
            let rail = PaymentRail::from_key(&rail, context)?;
            let request = PaymentRequest {
                contract_ref,
                network,
                funder: from,
                recipient: to,
                symbol,
                amount,
                reference,
            };

            match rail.make_payment(&request).await? {
                PaymentOutcome::Confirmed(receipt) => {
                    println!("confirmed {} in block {:?}", receipt.tx_hash, receipt.block_number);
                }
                PaymentOutcome::AwaitingApproval { mfa_id, .. } => {
                    println!(
                        "awaiting MFA approval{}",
                        mfa_id.map(|id| format!(" ({})", id)).unwrap_or_default()
                    );
                }
                PaymentOutcome::Recorded { reference } => println!("recorded {}", reference),
            }
        }
        Commands::Deposits {
            network,
            buyer,
            funder,
            symbol,
            counterparty,
            start,
            end,
        } => {
            let registry = registry(config);
            let builder = PaymentBuilder::new(&registry);
            let token_contract = builder.resolve_token(&network, &symbol)?;
            let decimals = builder.token_decimals(&network, token_contract).await?;

            let query = DepositQuery {
                network,
                buyer: Some(parse_address(&buyer)?),
                funder: Some(parse_address(&funder)?),
                counterparty,
                token_contract,
                decimals,
                start,
                end,
            };
            let deposits = DepositScanner::new(&registry).find_deposits(&query).await?;
            println!("{}", serde_json::to_string_pretty(&deposits)?);
        }
        Commands::BlockAt { network, date } => {
            let registry = registry(config);
            let connection = registry.get_connection(&network).await?;
            let timestamp = u64::try_from(date.timestamp())
                .map_err(|_| SettlementError::validation("date is before the epoch"))?;
            let block = block_from_date(&*connection, timestamp).await?;
            println!("{}", block);
        }
        Commands::Contract {
            network,
            contract_type,
        } => {
            let contract = config.contract(&contract_type, &network).ok_or_else(|| {
                SettlementError::validation(format!(
                    "no '{}' contract configured on network '{}'",
                    contract_type, network
                ))
            })?;
            println!("{}", parse_address(&contract.address)?);
        }
    }

    Ok(())
}

fn registry(config: SettlementConfig) -> ConnectionRegistry {
    ConnectionRegistry::new(Arc::new(config))
}

fn parse_address(value: &str) -> Result<alloy::primitives::Address, SettlementError> {
    value
        .parse()
        .map_err(|e| SettlementError::validation(format!("invalid address '{}': {}", value, e)))
}
