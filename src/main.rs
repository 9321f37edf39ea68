use anyhow::Result;
use clap::{Parser, Subcommand};
use kopia_exporter::{
    config::Config,
    server,
    snapshot::{self, SnapshotRequest},
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML file with defaults for `pushgateway`, `job` and the other settings
    #[arg(long, global = true, env = "KOPIA_EXPORTER_CONF")]
    conf: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve metrics for the latest snapshot of every kopia source
    Server {
        /// Port to listen on for metrics [default: 8123]
        #[arg(short, long, env = "EXPORTER_PORT")]
        port: Option<u16>,

        /// Address to bind to [default: 0.0.0.0]
        #[arg(short, long, env = "EXPORTER_ADDR")]
        addr: Option<String>,

        /// kopia repository config file
        #[arg(long)]
        config_file: Option<String>,

        /// Seconds between snapshot listings [default: 600]
        #[arg(long)]
        refresh_interval: Option<u64>,
    },

    /// Create a kopia snapshot of SOURCE_PATH and push its metrics
    Snapshot {
        /// ZFS snapshot (`pool/dataset@name`) to take before and destroy after the backup
        #[arg(long)]
        zfs: Option<String>,

        /// Logical source path recorded by kopia and exported as the `path` label
        #[arg(long)]
        override_source: Option<String>,

        /// Push gateway job name
        #[arg(long)]
        job: Option<String>,

        /// Push gateway URL
        #[arg(long)]
        pushgateway: Option<String>,

        /// kopia repository config file
        #[arg(long)]
        config_file: Option<String>,

        source_path: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing; stderr keeps fatal errors off stdout
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Parse CLI arguments
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    // Load configuration
    let mut config = Config::load(args.conf.as_deref())?;

    match args.command {
        Command::Server {
            port,
            addr,
            config_file,
            refresh_interval,
        } => {
            // Override with CLI arguments if provided
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(addr) = addr {
                config.server.addr = addr;
            }
            if config_file.is_some() {
                config.kopia.config_file = config_file;
            }
            if let Some(seconds) = refresh_interval {
                config.server.refresh_interval_seconds = seconds;
            }
            config.validate()?;

            info!(
                "Starting kopia exporter v{} (refresh every {}s)",
                env!("CARGO_PKG_VERSION"),
                config.server.refresh_interval_seconds
            );
            server::start(config).await
        }
        Command::Snapshot {
            zfs,
            override_source,
            job,
            pushgateway,
            config_file,
            source_path,
        } => {
            if let Some(job) = job {
                config.job = job;
            }
            if let Some(url) = pushgateway {
                config.pushgateway = url;
            }
            if config_file.is_some() {
                config.kopia.config_file = config_file;
            }
            config.validate()?;

            info!(
                "Snapshotting {} for job '{}' via {}",
                source_path, config.job, config.pushgateway
            );
            let request = SnapshotRequest {
                source: source_path,
                override_source,
                zfs_snapshot: zfs,
            };
            snapshot::run(&config, &request).await
        }
    }
}
