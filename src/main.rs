use clap::Parser;
use pebble_slug::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pebble_slug=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Slugify {
            text,
            separator,
            slugger,
            max_length,
            keep_case,
        }) => {
            pebble_slug::cli::slugify::run(&text, &separator, &slugger, max_length, keep_case)?;
        }
        Some(Commands::Add { table, fields }) => {
            pebble_slug::cli::records::add(&cli.config, &table, fields)?;
        }
        Some(Commands::Update { table, id, fields }) => {
            pebble_slug::cli::records::update(&cli.config, &table, &id, fields)?;
        }
        Some(Commands::Find { table, slug, scope }) => {
            pebble_slug::cli::find::run(&cli.config, &table, &slug, scope)?;
        }
        Some(Commands::Migrate) => {
            pebble_slug::cli::migrate::run(&cli.config)?;
        }
        None => {
            // No subcommand provided, print help
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
