use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::adapters::SqliteTransactionRepository;
use crate::config::Config;
use crate::domain::TxStatus;
use crate::middleware::signature::SignatureVerifier;
use crate::ports::{Page, TransactionRepository, TxFilter};
use crate::schemas::TransactionItem;

#[derive(Parser)]
#[command(name = "qris-gateway")]
#[command(about = "QRIS Gateway - QR payment generation and callback processor", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Transaction inspection commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Print the effective configuration and run startup checks
    Config,

    /// Compute the signature headers for a request body
    Sign {
        /// Unix seconds; defaults to now
        #[arg(short, long)]
        timestamp: Option<String>,

        /// Exact request body as it will be sent
        #[arg(value_name = "BODY")]
        body: String,
    },
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Print one transaction as JSON
    Show {
        #[arg(value_name = "REFERENCE_NO")]
        reference_no: String,
    },

    /// Print a page of transactions as JSON, newest first
    List {
        #[arg(long)]
        merchant_id: Option<String>,

        /// CREATED, PENDING, SUCCESS or FAILED
        #[arg(long)]
        status: Option<TxStatus>,

        #[arg(long)]
        limit: Option<i64>,

        #[arg(long)]
        offset: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_tx(pool: &SqlitePool, command: TxCommands) -> anyhow::Result<()> {
    let repository: Arc<dyn TransactionRepository> =
        Arc::new(SqliteTransactionRepository::new(pool.clone()));

    let output = match command {
        TxCommands::Show { reference_no } => tx_show(repository.as_ref(), &reference_no).await?,
        TxCommands::List {
            merchant_id,
            status,
            limit,
            offset,
        } => {
            let filter = TxFilter {
                merchant_id,
                status,
                ..TxFilter::default()
            };
            tx_list(repository.as_ref(), &filter, Page::new(limit, offset)).await?
        }
    };

    println!("{}", output);
    Ok(())
}

async fn tx_show(repository: &dyn TransactionRepository, reference_no: &str) -> anyhow::Result<String> {
    let tx = repository
        .get_by_reference_no(reference_no)
        .await
        .with_context(|| format!("Failed to load transaction {}", reference_no))?;

    Ok(serde_json::to_string_pretty(&TransactionItem::from(&tx))?)
}

async fn tx_list(
    repository: &dyn TransactionRepository,
    filter: &TxFilter,
    page: Page,
) -> anyhow::Result<String> {
    let items: Vec<TransactionItem> = repository
        .list(filter, page)
        .await
        .context("Failed to list transactions")?
        .iter()
        .map(TransactionItem::from)
        .collect();

    Ok(serde_json::to_string_pretty(&items)?)
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool).await?;

    tracing::info!("Database migrations completed");
    println!("✓ Database migrations completed");

    Ok(())
}

pub async fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("{}", render_config(config));

    let pool = crate::db::create_pool(config).await?;
    let report = crate::startup::validate_environment(config, &pool).await?;
    report.print();

    if !report.is_valid() {
        anyhow::bail!("Configuration is invalid");
    }

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

pub fn handle_sign(config: &Config, timestamp: Option<String>, body: &str) -> anyhow::Result<()> {
    let timestamp = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp().to_string());
    timestamp
        .parse::<i64>()
        .with_context(|| format!("Timestamp must be Unix seconds, got {:?}", timestamp))?;

    let signature = SignatureVerifier::from_config(config).sign(body.as_bytes(), &timestamp);
    println!("X-Timestamp: {}", timestamp);
    println!("X-Signature: {}", signature);

    Ok(())
}

fn render_config(config: &Config) -> String {
    let mut out = String::from("Configuration:\n");
    out.push_str(&format!("  Server Port: {}\n", config.server_port));
    out.push_str(&format!("  SQLite DSN: {}\n", config.sqlite_dsn));
    out.push_str(&format!("  HMAC Secret: {}\n", mask_secret(&config.hmac_secret)));
    out.push_str(&format!(
        "  Signature Max Age: {}\n",
        if config.sig_max_age_seconds > 0 {
            format!("{}s", config.sig_max_age_seconds)
        } else {
            "disabled".to_string()
        }
    ));
    out.push_str(&format!(
        "  CORS Origins: {}\n",
        config.cors_allowed_origins.join(", ")
    ));
    out.push_str(&format!(
        "  Strict Status Transitions: {}\n",
        config.strict_status_transitions
    ));
    out.push_str(&format!("  Log Format: {:?}", config.log_format));
    out
}

fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(2).collect();
    if secret.chars().count() <= 4 {
        return "****".to_string();
    }
    format!("{}****", visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewTransaction;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("supersecret-dev"), "su****");
        assert_eq!(mask_secret("abcd"), "****");
        assert_eq!(mask_secret(""), "****");
    }

    #[test]
    fn test_render_config_hides_secret() {
        let config = Config {
            hmac_secret: "do-not-print-me".to_string(),
            sig_max_age_seconds: 0,
            ..Config::default()
        };

        let rendered = render_config(&config);
        assert!(!rendered.contains("do-not-print-me"));
        assert!(rendered.contains("do****"));
        assert!(rendered.contains("Signature Max Age: disabled"));
        assert!(rendered.contains("http://localhost:5173"));
    }

    #[test]
    fn test_cli_defaults_to_no_command() {
        let cli = Cli::try_parse_from(["qris-gateway"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parses_tx_list_filters() {
        let cli = Cli::try_parse_from([
            "qris-gateway",
            "tx",
            "list",
            "--merchant-id",
            "M-1",
            "--status",
            "SUCCESS",
            "--limit",
            "10",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Tx(TxCommands::List {
                merchant_id,
                status,
                limit,
                offset,
            })) => {
                assert_eq!(merchant_id.as_deref(), Some("M-1"));
                assert_eq!(status, Some(TxStatus::Success));
                assert_eq!(limit, Some(10));
                assert_eq!(offset, None);
            }
            _ => panic!("expected tx list"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_status() {
        assert!(Cli::try_parse_from(["qris-gateway", "tx", "list", "--status", "DONE"]).is_err());
    }

    #[test]
    fn test_cli_parses_sign() {
        let cli =
            Cli::try_parse_from(["qris-gateway", "sign", "--timestamp", "1700000000", "{}"]).unwrap();
        match cli.command {
            Some(Commands::Sign { timestamp, body }) => {
                assert_eq!(timestamp.as_deref(), Some("1700000000"));
                assert_eq!(body, "{}");
            }
            _ => panic!("expected sign"),
        }
    }

    #[test]
    fn test_sign_rejects_non_numeric_timestamp() {
        assert!(handle_sign(&Config::default(), Some("yesterday".into()), "{}").is_err());
        assert!(handle_sign(&Config::default(), Some("1700000000".into()), "{}").is_ok());
    }

    #[tokio::test]
    async fn test_tx_show_and_list_render_json() {
        let pool = crate::db::connect_in_memory().await.unwrap();
        let repository = SqliteTransactionRepository::new(pool);
        let tx = repository
            .insert(&NewTransaction::created("M-1".into(), "P-1".into(), 150_000, "IDR".into()))
            .await
            .unwrap();

        let shown: serde_json::Value =
            serde_json::from_str(&tx_show(&repository, &tx.reference_no).await.unwrap()).unwrap();
        assert_eq!(shown["referenceNo"], tx.reference_no.as_str());
        assert_eq!(shown["amount"], "1500.00");

        let listed: serde_json::Value = serde_json::from_str(
            &tx_list(&repository, &TxFilter::default(), Page::default())
                .await
                .unwrap(),
        )
        .unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);

        assert!(tx_show(&repository, "AMISSING").await.is_err());
    }
}
