//! Guardrail Audit - Correlation Check Entry Point
//!
//! Runs the correlation check against the configured log directory,
//! prints the JSON report to stdout and exits 0 when clean, 1 when issues
//! or unreadable logs were found, 2 when the check could not run (including
//! a log directory that does not exist).

use std::process::ExitCode;
use std::sync::Arc;

use guardrail_audit::constants::APP_VERSION;
use guardrail_audit::logic::config::AuditConfig;
use guardrail_audit::logic::correlation::{CheckOptions, CorrelationAuditor};
use guardrail_audit::logic::store::FileLogStore;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting guardrail-audit v{} (correlation check)", APP_VERSION);

    match run() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log::error!("Correlation check failed to run: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<u8, Box<dyn std::error::Error>> {
    let config = AuditConfig::from_env()?;
    log::info!("   Logs: {:?}", config.log_dir);
    log::info!("   Pass logging: {}", config.pass_logging_enabled);

    // A missing log directory fails the run instead of auditing as empty
    let store = FileLogStore::open_existing(&config.log_dir)?;
    let report = CorrelationAuditor::new(Arc::new(store), CheckOptions::from(&config)).check();

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(report.exit_code())
}
