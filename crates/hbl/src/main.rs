// # hbl - block-list operator CLI
//
// Thin integration layer: reads configuration from the environment,
// registers the built-in backends and runs one service operation per
// invocation. All block-list logic lives in hbl-core.
//
// ## Configuration
//
// ### Store
// - `HBL_STORE_TYPE`: file (default) or memory
// - `HBL_STORE_PATH`: Path to the store file (for file)
//
// ### Backends
// - `HBL_ENDPOINTS`: Comma-separated endpoint types (cloudflare, powerdns)
// - `HBL_CHECKERS`: Comma-separated checker types (abuseipdb)
// - `HBL_ALERTERS`: Comma-separated alerter types (slack)
// - `CF_API_ACCOUNT`, `CF_API_TOKEN` or `CF_API_EMAIL` + `CF_API_KEY`
// - `PDNS_API_URL`, `PDNS_API_ZONE`, `PDNS_API_KEY`
// - `ABUSEIPDB_API_KEY`, `ABUSEIPDB_MAX_AGE_DAYS` (default 90)
// - `SLACK_WEBHOOK_URL`, `SLACK_WEBHOOK_CHANNEL`, `SLACK_WEBHOOK_USERNAME`
//
// ### Service
// - `HBL_BACKEND_TIMEOUT_SECS`: Upper bound per backend call (default 10)
// - `HBL_REPORT_TTL_SECS`: Cached report lifetime (default: forever)
// - `HBL_MODE`: live (default) or dry-run
// - `HBL_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Example
//
// ```bash
// export HBL_STORE_PATH=/var/lib/hbl/store.json
// export HBL_ENDPOINTS=cloudflare,powerdns
// export CF_API_ACCOUNT=... CF_API_TOKEN=...
// export PDNS_API_URL=http://127.0.0.1:8081/api/v1/servers/localhost
// export PDNS_API_ZONE=rbl.example.net PDNS_API_KEY=...
//
// hbl block 203.0.113.5 --author ops@example.com --comment "ssh brute force"
// hbl sync
// ```

mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use hbl_core::{Address, BlocklistService, Error, FactoryRegistry, NewAddress, parse_ip};
use std::process::ExitCode;
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Command};

/// Exit codes for the CLI
///
/// - 0: Success
/// - 1: Configuration or validation error
/// - 2: Operation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HblExitCode {
    Success = 0,
    ConfigError = 1,
    OperationFailed = 2,
}

impl From<HblExitCode> for ExitCode {
    fn from(code: HblExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl HblExitCode {
    fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<Error>() {
            Some(e) if e.is_validation() => HblExitCode::ConfigError,
            Some(Error::Config(_)) | Some(Error::NotRegistered { .. }) => HblExitCode::ConfigError,
            _ => HblExitCode::OperationFailed,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return HblExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::from(cli.log_level))
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return HblExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return HblExitCode::OperationFailed.into();
        }
    };

    let code = rt.block_on(async {
        let factories = FactoryRegistry::new();
        register_plugins(&factories);

        let service = match BlocklistService::from_config(&config, &factories).await {
            Ok(service) => service,
            Err(e) => {
                error!("Failed to initialize service: {}", e);
                return HblExitCode::ConfigError;
            }
        };

        match run(&service, cli.command).await {
            Ok(()) => HblExitCode::Success,
            Err(e) => {
                error!("{:#}", e);
                HblExitCode::for_error(&e)
            }
        }
    });

    code.into()
}

/// Register the built-in backend factories enabled at compile time
fn register_plugins(factories: &FactoryRegistry) {
    #[cfg(feature = "cloudflare")]
    {
        hbl_endpoint_cloudflare::register(factories);
    }

    #[cfg(feature = "powerdns")]
    {
        hbl_endpoint_pdns::register(factories);
    }

    #[cfg(feature = "abuseipdb")]
    {
        hbl_checker_abuseipdb::register(factories);
    }

    #[cfg(feature = "slack")]
    {
        hbl_alerter_slack::register(factories);
    }
}

async fn run(service: &BlocklistService, command: Command) -> Result<()> {
    match command {
        Command::Block { ip, author, comment } => {
            let record = service
                .block(NewAddress::parse(&ip, author, comment)?)
                .await
                .with_context(|| format!("Failed to block {}", ip))?;
            print_table(&[record]);
        }
        Command::Allow { ip, author, comment } => {
            let record = service
                .allow(NewAddress::parse(&ip, author, comment)?)
                .await
                .with_context(|| format!("Failed to allow {}", ip))?;
            print_table(&[record]);
        }
        Command::Delete { ip } => {
            let addr = parse_ip(&ip)?;
            service
                .delete(addr)
                .await
                .with_context(|| format!("Failed to delete {}", addr))?;
            println!("Deleted {}", addr);
        }
        Command::List { ip: Some(ip) } => {
            let record = service.get_one(parse_ip(&ip)?).await?;
            print_table(&[record]);
        }
        Command::List { ip: None } => {
            print_table(&service.get_all().await?);
        }
        Command::Sync { ip: Some(ip) } => {
            let addr = parse_ip(&ip)?;
            service
                .sync_one(addr)
                .await
                .with_context(|| format!("Failed to sync {}", addr))?;
            println!("Synced {}", addr);
        }
        Command::Sync { ip: None } => {
            let summary = service.sync_all().await?;
            for (addr, e) in &summary.failed {
                error!(ip = %addr, "Sync failed: {}", e);
            }
            println!(
                "Synced {}, skipped {}, failed {}",
                summary.synced.len(),
                summary.skipped.len(),
                summary.failed.len()
            );
            if !summary.is_complete() {
                anyhow::bail!("{} address(es) failed to sync", summary.failed.len());
            }
        }
        Command::Check { checker, ip } => {
            let report = service.check(&checker, parse_ip(&ip)?).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Backends => {
            println!("endpoints: {}", service.endpoints().names().join(", "));
            println!("checkers: {}", service.checkers().names().join(", "));
            println!("alerters: {}", service.alerters().names().join(", "));
        }
    }

    Ok(())
}

fn print_table(records: &[Address]) {
    println!("IP\tACTION\tAUTHOR\tCOMMENT\tCREATED_AT");
    for record in records {
        println!("{}", table_row(record));
    }
}

fn table_row(record: &Address) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        record.ip,
        record.action,
        record.author,
        record.comment,
        record.created_at.to_rfc3339()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_classification() {
        let err = anyhow::Error::from(Error::invalid_input("bad address"));
        assert_eq!(HblExitCode::for_error(&err), HblExitCode::ConfigError);

        let err = anyhow::Error::from(Error::not_registered("checker", "nope"));
        assert_eq!(HblExitCode::for_error(&err), HblExitCode::ConfigError);

        let err = anyhow::Error::from(Error::endpoint("Cloudflare", "Block", Error::http("HTTP 500")))
            .context("Failed to block 203.0.113.5");
        assert_eq!(HblExitCode::for_error(&err), HblExitCode::OperationFailed);

        let err = anyhow::anyhow!("1 address(es) failed to sync");
        assert_eq!(HblExitCode::for_error(&err), HblExitCode::OperationFailed);
    }

    #[test]
    fn test_table_row() {
        let record = Address {
            ip: parse_ip("2001:db8::1").unwrap(),
            action: hbl_core::Action::Block,
            author: "ops@example.com".to_string(),
            comment: "scanner".to_string(),
            created_at: chrono::DateTime::UNIX_EPOCH,
        };
        assert_eq!(
            table_row(&record),
            "2001:db8::1\tBlock\tops@example.com\tscanner\t1970-01-01T00:00:00+00:00"
        );
    }
}
