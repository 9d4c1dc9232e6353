use crate::config::{Config, DEFAULT_HMAC_SECRET};
use anyhow::{Context, Result};
use sqlx::SqlitePool;

pub struct ValidationReport {
    pub environment: bool,
    pub database: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.environment && self.database
    }

    pub fn print(&self) {
        println!("\n=== Startup Validation Report ===");
        println!("Environment Variables: {}", status(self.environment));
        println!("Database Connectivity: {}", status(self.database));

        if !self.warnings.is_empty() {
            println!("\nWarnings:");
            for warning in &self.warnings {
                println!("  ⚠️  {}", warning);
            }
        }

        if !self.errors.is_empty() {
            println!("\nErrors:");
            for error in &self.errors {
                println!("  ❌ {}", error);
            }
        }

        println!("\nOverall Status: {}", if self.is_valid() { "✅ PASS" } else { "❌ FAIL" });
        println!("=================================\n");
    }
}

fn status(ok: bool) -> &'static str {
    if ok { "✅ OK" } else { "❌ FAIL" }
}

pub async fn validate_environment(config: &Config, pool: &SqlitePool) -> Result<ValidationReport> {
    let mut report = ValidationReport {
        environment: true,
        database: true,
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    if let Err(e) = validate_env_vars(config) {
        report.environment = false;
        report.errors.push(format!("Environment: {}", e));
    }

    if config.hmac_secret == DEFAULT_HMAC_SECRET {
        report
            .warnings
            .push("HMAC_SECRET is the development default".to_string());
    }
    if config.sig_max_age_seconds <= 0 {
        report
            .warnings
            .push("SIG_MAX_AGE_SECONDS <= 0 disables signature expiry".to_string());
    }

    if let Err(e) = validate_database(pool).await {
        report.database = false;
        report.errors.push(format!("Database: {:#}", e));
    }

    Ok(report)
}

fn validate_env_vars(config: &Config) -> Result<()> {
    if config.hmac_secret.is_empty() {
        anyhow::bail!("HMAC_SECRET is empty");
    }
    if config.sqlite_dsn.is_empty() {
        anyhow::bail!("SQLITE_DSN is empty");
    }
    if config.server_port == 0 {
        anyhow::bail!("APP_PORT must be greater than 0");
    }
    if config.cors_allowed_origins.is_empty() {
        anyhow::bail!("CORS_ALLOWED_ORIGINS is empty");
    }

    Ok(())
}

async fn validate_database(pool: &SqlitePool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .context("Failed to connect to database")?;

    // Check if migrations are up to date
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .context("Failed to check migrations table")?;

    if applied == 0 {
        anyhow::bail!("No migrations applied");
    }

    Ok(())
}
