use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "kubedash",
    version,
    about = "An interactive terminal dashboard for Kubernetes clusters."
)]
pub struct CliArgs {
    /// Path to the kubeconfig file
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to start in
    #[arg(long)]
    pub context: Option<String>,

    /// Start in a specific namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Start with all namespaces selected
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,

    /// Refresh interval in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_secs: Option<u64>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Append tracing output to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Runtime config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn defaults() {
        let args = CliArgs::parse_from(["kubedash"]);
        assert_eq!(args.refresh_secs, None);
        assert_eq!(args.log_filter, "info");
        assert!(!args.all_namespaces);
    }

    #[test]
    fn short_flags_and_refresh_floor() {
        let args = CliArgs::parse_from(["kubedash", "-A", "-n", "prod", "--refresh-secs", "2"]);
        assert!(args.all_namespaces);
        assert_eq!(args.namespace.as_deref(), Some("prod"));
        assert_eq!(args.refresh_secs, Some(2));
        assert!(CliArgs::try_parse_from(["kubedash", "--refresh-secs", "0"]).is_err());
    }
}
