use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;

use template_provisioner::config::{
    ProvisionConfig, build_http_client, config_path, data_dir, log_path,
};
use template_provisioner::logging;
use template_provisioner::provision::{ProvisionRequest, Provisioner};
use template_provisioner::version::cache::VersionCache;
use template_provisioner::version::resolver::TagResolver;

#[derive(Parser)]
#[command(name = "template-provisioner")]
#[command(version, about = "Resolve, download and extract the application template")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct CommonArgs {
    /// Consider prerelease templates
    #[arg(long)]
    allow_prerelease: bool,

    /// Configuration file (defaults to config.json in the data directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the template version and extract it
    Provision {
        #[command(flatten)]
        common: CommonArgs,

        /// Directory holding the template and its archive
        #[arg(long)]
        user_data_dir: Option<PathBuf>,

        /// Application version passed to the worker
        #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
        app_version: String,

        /// Worker executable (overrides the configuration)
        #[arg(long)]
        worker: Option<PathBuf>,
    },
    /// Print the tag name that would be provisioned
    ResolveTag {
        #[command(flatten)]
        common: CommonArgs,
    },
}

fn load_config(common: &CommonArgs) -> anyhow::Result<ProvisionConfig> {
    match &common.config {
        Some(path) => ProvisionConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path)),
        None => {
            let path = config_path();
            if path.exists() {
                ProvisionConfig::load(&path)
                    .with_context(|| format!("Failed to load configuration from {:?}", path))
            } else {
                Ok(ProvisionConfig::default())
            }
        }
    }
}

async fn provision(
    common: CommonArgs,
    user_data_dir: Option<PathBuf>,
    app_version: String,
    worker: Option<PathBuf>,
) -> anyhow::Result<()> {
    semver::Version::parse(&app_version)
        .with_context(|| format!("Invalid application version {:?}", app_version))?;

    let config = load_config(&common)?;
    let worker = worker
        .or_else(|| config.worker.program.clone())
        .context("No worker configured; pass --worker or set worker.program")?;
    let user_data_dir = user_data_dir.unwrap_or_else(data_dir);

    let provisioner = Provisioner::from_config(&config, worker)?;
    let request = ProvisionRequest::for_user_data_dir(&app_version, &user_data_dir, &config);

    let mut progress = provisioner.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match progress.recv().await {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Progress output skipped {} events", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
        Ok::<_, serde_json::Error>(())
    });

    let allow_prerelease = common.allow_prerelease || config.allow_prerelease;
    let version = provisioner.provision(allow_prerelease, request).await?;

    drop(provisioner);
    printer.await??;

    println!("{}", version);
    Ok(())
}

async fn resolve_tag(common: CommonArgs) -> anyhow::Result<()> {
    let config = load_config(&common)?;
    let client = build_http_client(&config.proxy)?;
    let resolver = TagResolver::from_config(Arc::new(VersionCache::new()), client, &config.sources);

    let allow_prerelease = common.allow_prerelease || config.allow_prerelease;
    println!("{}", resolver.resolve_tag_name(allow_prerelease).await?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init(&log_path())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command {
        Command::Provision {
            common,
            user_data_dir,
            app_version,
            worker,
        } => runtime.block_on(provision(common, user_data_dir, app_version, worker)),
        Command::ResolveTag { common } => runtime.block_on(resolve_tag(common)),
    }
}
