//! Ledger Core CLI
//!
//! Command-line interface for the Ledger Core client SDK: key and
//! account/asset creation, the issue/transfer/retire flows, and
//! parameterized queries.

use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use ledger_core_client::api::transactions::{
    ControlWithAccount, Issue, Retire, SpendFromAccount,
};
use ledger_core_client::query::QueryBuilder;
use ledger_core_client::{Client, ClientBuilder, Config, Error, HsmSigner, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ledger-cli")]
#[command(about = "Client CLI for the Ledger Core API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a key in the mock HSM
    CreateKey {
        /// Key alias
        #[arg(short, long)]
        alias: Option<String>,
    },

    /// List keys held by the mock HSM
    ListKeys,

    /// Create an account
    CreateAccount {
        #[arg(short, long)]
        alias: String,

        /// Root xpub; repeatable
        #[arg(short = 'k', long = "xpub")]
        xpubs: Vec<String>,

        /// Keys required to sign (defaults to all keys)
        #[arg(short, long)]
        quorum: Option<u32>,

        /// Tag as key=value; repeatable
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Create an asset definition
    CreateAsset {
        #[arg(short, long)]
        alias: String,

        /// Root xpub; repeatable
        #[arg(short = 'k', long = "xpub")]
        xpubs: Vec<String>,

        /// Keys required to issue (defaults to all keys)
        #[arg(short, long)]
        quorum: Option<u32>,

        /// Tag as key=value; repeatable
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Definition field as key=value; repeatable
        #[arg(short, long = "definition")]
        definition: Vec<String>,
    },

    /// Issue asset units into an account
    Issue {
        #[arg(long)]
        asset: String,

        #[arg(long)]
        account: String,

        #[arg(long)]
        amount: u64,
    },

    /// Transfer asset units between accounts
    Transfer {
        #[arg(long)]
        asset: String,

        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        #[arg(long)]
        amount: u64,
    },

    /// Retire asset units from an account
    Retire {
        #[arg(long)]
        asset: String,

        #[arg(long)]
        account: String,

        #[arg(long)]
        amount: u64,
    },

    /// Query asset definitions
    ListAssets(ListArgs),

    /// Query accounts
    ListAccounts(ListArgs),

    /// Query confirmed transactions
    ListTransactions(ListArgs),

    /// Query unspent outputs
    ListUnspents(ListArgs),

    /// Query balances
    ListBalances {
        /// Filter expression with $1, $2, ... placeholders
        #[arg(short, long)]
        filter: Option<String>,

        /// Positional filter parameter; repeatable
        #[arg(short = 'P', long = "param")]
        params: Vec<String>,

        /// Group sums under this field; repeatable
        #[arg(short, long = "sum-by")]
        sum_by: Vec<String>,
    },

    /// Show core status
    Info,

    /// Show current configuration
    Config,
}

#[derive(clap::Args)]
struct ListArgs {
    /// Filter expression with $1, $2, ... placeholders
    #[arg(short, long)]
    filter: Option<String>,

    /// Positional filter parameter; repeatable
    #[arg(short = 'P', long = "param")]
    params: Vec<String>,

    /// Stop after this many items
    #[arg(short, long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env(),
    };
    let client = Client::from_config(&config)?;

    match cli.command {
        Commands::CreateKey { alias } => {
            let key = client.mock_hsm().create_key(alias.as_deref()).await?;
            tracing::info!(alias = ?key.alias, "Created key");
            println!("{}", key.xpub);
        }
        Commands::ListKeys => {
            let stream = client.mock_hsm().list_keys().stream();
            futures::pin_mut!(stream);
            while let Some(key) = stream.try_next().await? {
                println!("{}", serde_json::to_string(&key)?);
            }
        }
        Commands::CreateAccount {
            alias,
            xpubs,
            quorum,
            tags,
        } => {
            let mut builder = client.accounts().create().alias(alias.as_str());
            for xpub in xpubs {
                builder = builder.root_xpub(xpub);
            }
            if let Some(quorum) = quorum {
                builder = builder.quorum(quorum);
            }
            for tag in &tags {
                let (key, value) = parse_kv(tag)?;
                builder = builder.tag(key, value);
            }
            let account = builder.execute().await?;
            tracing::info!(id = %account.id, alias = %alias, "Created account");
            println!("{}", account.id);
        }
        Commands::CreateAsset {
            alias,
            xpubs,
            quorum,
            tags,
            definition,
        } => {
            let mut builder = client.assets().create().alias(alias.as_str());
            for xpub in xpubs {
                builder = builder.root_xpub(xpub);
            }
            if let Some(quorum) = quorum {
                builder = builder.quorum(quorum);
            }
            for tag in &tags {
                let (key, value) = parse_kv(tag)?;
                builder = builder.tag(key, value);
            }
            for field in &definition {
                let (key, value) = parse_kv(field)?;
                builder = builder.definition_field(key, value);
            }
            let asset = builder.execute().await?;
            tracing::info!(id = %asset.id, alias = %alias, "Created asset");
            println!("{}", asset.id);
        }
        Commands::Issue {
            asset,
            account,
            amount,
        } => {
            let template = client
                .transactions()
                .build()
                .add_action(Issue::new(amount).asset_alias(asset.as_str()))
                .add_action(
                    ControlWithAccount::new(amount)
                        .account_alias(account.as_str())
                        .asset_alias(asset.as_str()),
                )
                .execute()
                .await?;
            submit(&client, &config, template).await?;
        }
        Commands::Transfer {
            asset,
            from,
            to,
            amount,
        } => {
            let template = client
                .transactions()
                .build()
                .add_action(
                    SpendFromAccount::new(amount)
                        .account_alias(from.as_str())
                        .asset_alias(asset.as_str()),
                )
                .add_action(
                    ControlWithAccount::new(amount)
                        .account_alias(to.as_str())
                        .asset_alias(asset.as_str()),
                )
                .execute()
                .await?;
            submit(&client, &config, template).await?;
        }
        Commands::Retire {
            asset,
            account,
            amount,
        } => {
            let template = client
                .transactions()
                .build()
                .add_action(
                    SpendFromAccount::new(amount)
                        .account_alias(account.as_str())
                        .asset_alias(asset.as_str()),
                )
                .add_action(Retire::new(amount).asset_alias(asset.as_str()))
                .execute()
                .await?;
            submit(&client, &config, template).await?;
        }
        Commands::ListAssets(args) => {
            run_list(client.assets().list(), args, config.page_size).await?;
        }
        Commands::ListAccounts(args) => {
            run_list(client.accounts().list(), args, config.page_size).await?;
        }
        Commands::ListTransactions(args) => {
            run_list(client.transactions().list(), args, config.page_size).await?;
        }
        Commands::ListUnspents(args) => {
            run_list(client.unspent_outputs().list(), args, config.page_size).await?;
        }
        Commands::ListBalances {
            filter,
            params,
            sum_by,
        } => {
            let mut query = client.balances().list().page_size(config.page_size);
            if let Some(filter) = filter {
                query = query.filter(filter);
            }
            for param in params {
                query = query.param(parse_param(param));
            }
            for field in sum_by {
                query = query.sum_by(field);
            }

            let mut page = query.execute().await?;
            loop {
                for balance in &page.items {
                    println!("{}", serde_json::to_string(balance)?);
                }
                if page.last_page {
                    break;
                }
                page = page.next_page(&client).await?;
            }
        }
        Commands::Info => {
            let info = client.info().await?;
            println!("{}", serde_json::to_string_pretty(&info).unwrap());
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config).unwrap());
        }
    }

    Ok(())
}

/// Sign a template with every key the mock HSM holds, then submit it.
async fn submit(
    client: &Client,
    config: &Config,
    template: ledger_core_client::api::Template,
) -> Result<()> {
    let signer = load_signer(client, config).await?;
    let submitted = client.transactions().sign_and_submit(template, &signer).await?;
    tracing::info!(id = %submitted.id, "Transaction confirmed");
    println!("{}", submitted.id);
    Ok(())
}

/// Register all mock HSM keys with an HsmSigner.
async fn load_signer(client: &Client, config: &Config) -> Result<HsmSigner> {
    let connection = match &config.core.hsm_url {
        // Standalone signing service: its endpoints live at the root.
        Some(url) => ClientBuilder::new(url).build()?,
        None => client.mock_hsm().signer_connection()?,
    };

    let mut signer = HsmSigner::new();
    let stream = client.mock_hsm().list_keys().stream();
    futures::pin_mut!(stream);
    while let Some(key) = stream.try_next().await? {
        signer.add_key(&key, connection.clone());
    }

    if signer.key_count() == 0 {
        tracing::warn!("No keys in the mock HSM - signing will fail");
    }
    Ok(signer)
}

async fn run_list<T>(builder: QueryBuilder<'_, T>, args: ListArgs, page_size: u32) -> Result<()>
where
    T: DeserializeOwned + Serialize,
{
    let mut builder = builder.page_size(page_size);
    if let Some(filter) = args.filter {
        builder = builder.filter(filter);
    }
    for param in args.params {
        builder = builder.param(parse_param(param));
    }

    let stream = builder.stream();
    futures::pin_mut!(stream);
    let mut count = 0;
    while let Some(item) = stream.try_next().await? {
        println!("{}", serde_json::to_string(&item)?);
        count += 1;
        if args.limit.is_some_and(|limit| count >= limit) {
            break;
        }
    }
    Ok(())
}

/// Filter parameters are JSON when they parse as JSON, strings otherwise.
fn parse_param(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

fn parse_kv(raw: &str) -> Result<(String, String)> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| Error::InvalidArgument(format!("expected key=value, got {}", raw)))
}
