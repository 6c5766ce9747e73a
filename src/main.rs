use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use reelforged::cli::{Cli, Command};
use reelforged::config;
use reelforged::Pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::Version = cli.command {
        println!("reelforged {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = config::load_config_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    let pipeline = Pipeline::new(config);

    match cli.command {
        Command::Run { channels } => {
            pipeline.run(&channels).await?;
        }
        Command::Harvest { channel, budget } => {
            let report = pipeline.harvest(&channel, budget).await?;
            println!(
                "harvested {} clips ({} s) into {}",
                report.clips,
                report.consumed_seconds,
                report.folder.display()
            );
        }
        Command::Compile { folder, channel } => {
            let artifact = pipeline.compile(&folder).await?;
            println!("compiled {}", artifact.display());
            if let Some(channel) = channel {
                pipeline.enqueue(&channel, artifact)?;
                println!("queued for channel {channel}");
            }
        }
        Command::Dispatch => {
            let published = pipeline.dispatch().await?;
            println!("published {published} artifacts");
        }
        Command::CheckTools => {
            for info in pipeline.registry().check_all() {
                let status = if info.available { "ok" } else { "missing" };
                let version = info.version.as_deref().unwrap_or("-");
                let path = info
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                println!("{:10} {:8} {:20} {}", info.name, status, version, path);
            }
        }
        Command::Validate => {
            println!("configuration is valid");
        }
        Command::Version => unreachable!("handled before config load"),
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("reelforged={default},rf_av={default}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
