use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "route-intent",
    version,
    about = "Route a user message by trigger rules and print the decision as JSON"
)]
pub struct Cli {
    /// Message text to route, e.g. "STOPRUN run-123". Words are joined with
    /// single spaces.
    #[arg(required_unless_present = "print_policy")]
    pub message: Vec<String>,

    /// Path to the router policy YAML (overrides config file setting).
    /// Defaults to .mcp/router_policy.yaml under the installation root.
    #[arg(short, long)]
    pub policy: Option<PathBuf>,

    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the normalized policy instead of routing a message
    #[arg(long)]
    pub print_policy: bool,

    /// Log format (overrides config file setting)
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The message words joined with single spaces.
    pub fn message(&self) -> String {
        self.message.join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_message_words() {
        let cli = Cli::parse_from(["route-intent", "STOP", "job-1", "now"]);
        assert_eq!(cli.message(), "STOP job-1 now");
        assert!(cli.policy.is_none());
        assert!(!cli.print_policy);
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::parse_from([
            "route-intent",
            "--policy",
            "/tmp/policy.yaml",
            "--log-format",
            "json",
            "-v",
            "@RAM",
        ]);
        assert_eq!(cli.policy, Some(PathBuf::from("/tmp/policy.yaml")));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(cli.verbose);
        assert_eq!(cli.message(), "@RAM");
    }

    #[test]
    fn message_required_unless_printing_policy() {
        assert!(Cli::try_parse_from(["route-intent"]).is_err());
        let cli = Cli::try_parse_from(["route-intent", "--print-policy"]).unwrap();
        assert!(cli.message.is_empty());
    }
}
