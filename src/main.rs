use std::path::PathBuf;

use clap::{builder::NonEmptyStringValueParser, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cleanup;
mod error;
mod kubernetes;
mod newrelic;
mod reconciliation;

use newrelic::{
    entity::DEFAULT_TEAM, monitor::parse_frequency, MonitorType, NewRelicClient, Region,
};
use reconciliation::MonitorTemplate;

/// Bridging the gap between OpenShift and New Relic Synthetics.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sync OpenShift Routes to New Relic Synthetics monitors.
    Sync(SyncArgs),
    /// Cleanup New Relic Synthetics monitors if OpenShift Routes do not exist.
    Cleanup(CleanupArgs),
    /// Purge New Relic Synthetics monitors with a prefix.
    Purge(PurgeArgs),
}

#[derive(Debug, clap::Args)]
struct NewRelicArgs {
    /// API key for authenticating with New Relic.
    #[arg(
        long,
        env = "NEW_RELIC_API_KEY",
        hide_env_values = true,
        value_parser = NonEmptyStringValueParser::new()
    )]
    new_relic_api_key: String,

    /// Data center region of the New Relic account.
    #[arg(long, env = "NEW_RELIC_REGION", value_enum, default_value_t = Region::Us)]
    new_relic_region: Region,
}

impl NewRelicArgs {
    fn client(&self) -> error::Result<NewRelicClient> {
        NewRelicClient::new(self.new_relic_api_key.clone(), self.new_relic_region)
    }
}

#[derive(Debug, clap::Args)]
struct KubernetesArgs {
    /// URL of the Kubernetes master.
    #[arg(long, env = "KUBERNETES_MASTER_URL")]
    kubernetes_master_url: Option<String>,

    /// Path to the Kubernetes config file.
    #[arg(long, env = "KUBERNETES_CONFIG")]
    kubernetes_config: Option<PathBuf>,
}

impl KubernetesArgs {
    async fn client(&self) -> error::Result<kube::Client> {
        kubernetes::client(
            self.kubernetes_master_url.as_deref(),
            self.kubernetes_config.as_deref(),
        )
        .await
    }
}

#[derive(Debug, clap::Args)]
struct SyncArgs {
    namespace: String,

    #[command(flatten)]
    new_relic: NewRelicArgs,

    /// Location which monitors will be provisioned.
    #[arg(long, env = "NEW_RELIC_LOCATION", default_value = "AWS_AP_SOUTHEAST_2")]
    new_relic_location: String,

    /// SIMPLE, BROWSER, SCRIPT_BROWSER or SCRIPT_API.
    #[arg(long, env = "NEW_RELIC_MONITOR_TYPE", default_value = "SIMPLE")]
    monitor_type: MonitorType,

    /// Minutes between checks.
    #[arg(
        long,
        env = "NEW_RELIC_MONITOR_FREQUENCY",
        default_value = "60",
        value_parser = parse_frequency
    )]
    monitor_frequency: u32,

    /// Seconds after which a check counts against the SLA.
    #[arg(long, env = "NEW_RELIC_SLA_THRESHOLD", default_value_t = 7.0)]
    sla_threshold: f64,

    /// Team recorded on every monitor's tags.
    #[arg(long, env = "NEW_RELIC_TEAM", default_value = DEFAULT_TEAM)]
    team: String,

    #[command(flatten)]
    kubernetes: KubernetesArgs,

    /// Print out information which would have been executed.
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,
}

#[derive(Debug, clap::Args)]
struct CleanupArgs {
    namespace: String,

    #[command(flatten)]
    new_relic: NewRelicArgs,

    #[command(flatten)]
    kubernetes: KubernetesArgs,

    /// Print out information which would have been executed.
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,
}

#[derive(Debug, clap::Args)]
struct PurgeArgs {
    #[command(flatten)]
    new_relic: NewRelicArgs,

    /// Prefix applied to all objects which are managed by this application.
    #[arg(
        long,
        env = "NEW_RELIC_MONITOR_PREFIX",
        value_parser = NonEmptyStringValueParser::new()
    )]
    new_relic_monitor_prefix: String,

    /// Print out information which would have been executed.
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Sync(args) => {
            let registry = args.new_relic.client()?;
            let client = args.kubernetes.client().await?;

            let routes = kubernetes::list_routes(client, &args.namespace).await?;

            let template = MonitorTemplate {
                kind: args.monitor_type,
                frequency: args.monitor_frequency,
                location: args.new_relic_location,
                sla_threshold: args.sla_threshold,
                team: args.team,
            };

            reconciliation::sync(&registry, &routes, &template, args.dry_run).await?;
        }
        Command::Cleanup(args) => {
            let registry = args.new_relic.client()?;
            let client = args.kubernetes.client().await?;

            let routes = kubernetes::list_routes(client, &args.namespace).await?;

            cleanup::cleanup(&registry, &args.namespace, &routes, args.dry_run).await?;
        }
        Command::Purge(args) => {
            let registry = args.new_relic.client()?;

            cleanup::purge(&registry, &args.new_relic_monitor_prefix, args.dry_run).await?;
        }
    }

    Ok(())
}
