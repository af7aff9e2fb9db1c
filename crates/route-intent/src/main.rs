mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use intent_router::{load_policy, Router};

use crate::cli::{Cli, LogFormat};

fn main() -> Result<()> {
    // 1. Parse CLI args.
    let cli = Cli::parse();

    // 2. Load config, then merge CLI overrides.
    let root = config::install_root();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config::default_config_path(&root));
    let cfg = config::load(&config_path)?;

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        cfg.logging.level.clone()
    };
    let format = cli.log_format.unwrap_or(cfg.logging.format);

    // 3. Init tracing-subscriber on stderr; stdout carries only the result.
    init_tracing(&level, format);

    let policy_path = config::resolve_policy_path(cli.policy.as_deref(), &cfg, &root);
    info!(
        config_file = %config_path.display(),
        policy_file = %policy_path.display(),
        "route-intent starting"
    );

    // 4. Load and normalize the policy.
    let policy = load_policy(Some(policy_path.as_path()))
        .with_context(|| format!("failed to load policy {}", policy_path.display()))?;
    let router = Router::new(policy);
    debug!(?router, "router ready");

    // 5. Route the message, or dump the policy.
    let output = if cli.print_policy {
        serde_json::to_string_pretty(router.policy()).context("failed to serialize policy")?
    } else {
        let decision = router.route(&cli.message());
        info!(
            action = %decision.action,
            matched_rule = ?decision.matched_rule,
            "message routed"
        );
        serde_json::to_string_pretty(&decision).context("failed to serialize decision")?
    };

    println!("{output}");
    Ok(())
}

fn init_tracing(level: &str, format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
