use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use service_updater::{
    aws_cli::AwsCli,
    error::UpdateError,
    task_definition::EnvUpdateMode,
    trigger::DEFAULT_RETRY_COUNT,
    updater::{self, UpdateRequest},
    watcher::DEFAULT_WAIT_TIMEOUT,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Roll a service forward to a new task definition revision.
    Update(UpdateArgs),
    /// Roll a service forward using a request described in a file.
    Apply {
        /// Path to file containing the update request.
        #[arg(short)]
        file: String,
    },
}

#[derive(Debug, Args)]
struct UpdateArgs {
    /// Cluster the service runs in.
    #[arg(long)]
    cluster: String,
    /// Service to update.
    #[arg(long)]
    service: String,
    /// New container image.
    #[arg(long)]
    image: Option<String>,
    /// Credentials profile passed to the aws cli.
    #[arg(long)]
    profile: Option<String>,
    #[arg(long)]
    memory: Option<u32>,
    #[arg(long)]
    cpu: Option<u32>,
    /// Environment variable as KEY=VALUE. Can be repeated.
    #[arg(long = "env", value_parser = parse_env_var)]
    env: Vec<(String, String)>,
    #[arg(long, value_enum, default_value_t = EnvUpdateModeArg::All)]
    env_update_mode: EnvUpdateModeArg,
    /// Wait for the previous deployment to drain.
    #[arg(long)]
    wait: bool,
    /// Seconds to wait for the deployment.
    #[arg(long, default_value_t = DEFAULT_WAIT_TIMEOUT.as_secs())]
    wait_timeout: u64,
    /// Attempts for update and poll calls.
    #[arg(long, default_value_t = DEFAULT_RETRY_COUNT)]
    wait_retry_count: u32,
    /// Log configuration as JSON.
    #[arg(long)]
    log_options: Option<String>,
    /// Command to run in the container.
    #[arg(long)]
    cmd: Option<String>,
    /// Deploy this existing task definition instead of registering a new one.
    #[arg(long)]
    task_definition: Option<String>,
    /// Do not print service events while waiting.
    #[arg(long)]
    hide_events: bool,
    /// Only update the container with this name.
    #[arg(long)]
    container_name: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EnvUpdateModeArg {
    /// Replace the whole environment.
    All,
    /// Overwrite only variables the container already defines.
    Merge,
}

impl From<EnvUpdateModeArg> for EnvUpdateMode {
    fn from(input: EnvUpdateModeArg) -> Self {
        match input {
            EnvUpdateModeArg::All => EnvUpdateMode::All,
            EnvUpdateModeArg::Merge => EnvUpdateMode::Merge,
        }
    }
}

fn parse_env_var(input: &str) -> Result<(String, String), String> {
    input
        .split_once('=')
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {input}"))
}

impl TryFrom<UpdateArgs> for UpdateRequest {
    type Error = UpdateError;

    fn try_from(args: UpdateArgs) -> Result<Self, Self::Error> {
        let log_options = args
            .log_options
            .map(|options| serde_json::from_str::<serde_json::Value>(&options))
            .transpose()
            .map_err(|err| UpdateError::InvalidRequest(format!("log options: {err}")))?;

        Ok(UpdateRequest {
            image_name: args.image,
            profile: args.profile,
            memory: args.memory,
            cpu: args.cpu,
            env_vars: (!args.env.is_empty()).then(|| args.env.into_iter().collect()),
            env_update_mode: args.env_update_mode.into(),
            wait: args.wait,
            wait_timeout_secs: args.wait_timeout,
            wait_retry_count: args.wait_retry_count,
            log_options,
            cmd: args.cmd,
            name: args.task_definition,
            hide_events: args.hide_events,
            container_name: args.container_name,
            ..UpdateRequest::new(args.cluster, args.service)
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let request = match cli.command {
        Commands::Update(args) => UpdateRequest::try_from(args)?,
        Commands::Apply { file } => UpdateRequest::from_file(&file).await?,
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, stopping");
                cancel.cancel();
            }
        }
    });

    let control_plane = AwsCli::new(request.profile.clone());
    let outcome = updater::update_service(&control_plane, &request, &cancel).await?;

    info!(task_definition = %outcome.task_definition_id, "done");

    Ok(())
}
