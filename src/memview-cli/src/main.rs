mod cli;
mod commands;
mod config;
mod parse;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so rendered rows on stdout stay clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memview=info,memview_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::View {
            dump,
            maps,
            base,
            codec,
            rows,
            json,
        } => {
            commands::view::handle(
                &dump,
                maps.as_deref(),
                base.as_deref(),
                codec,
                rows.as_deref(),
                json,
            )
            .await?;
        }

        Commands::Copy {
            dump,
            maps,
            base,
            codec,
            group,
            from,
            to,
        } => {
            commands::copy::handle(
                &dump,
                maps.as_deref(),
                base.as_deref(),
                codec,
                group,
                &from,
                &to,
            )
            .await?;
        }

        Commands::Configure {
            codec,
            base,
            cache_mb,
            show,
        } => {
            commands::configure::handle(codec, base, cache_mb, show)?;
        }
    }

    Ok(())
}
