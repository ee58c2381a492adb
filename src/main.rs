use clap::Parser;
use tracing_subscriber::EnvFilter;

use paper_harvest::config::Config;
use paper_harvest::{FetchClient, Harvester, JsonlSink, SaveMode, Sink, Venue};

/// Harvest bibliographic metadata from conference proceedings sites.
///
/// One invocation runs one venue driver; drivers share nothing, so separate
/// venues can run as parallel processes.
#[derive(Debug, Parser)]
#[command(name = "paper-harvest", version)]
struct Cli {
    /// Venue to harvest: aaai, cvpr, emnlp, icml or neurips
    venue: String,

    /// First year of the harvest range
    #[arg(long)]
    from: i32,

    /// Last year of the harvest range (inclusive)
    #[arg(long)]
    to: i32,

    /// Skip detail-page enrichment (leaves DOI and abstract empty)
    #[arg(long)]
    fast: bool,

    /// Append to the venue's output file instead of overwriting it
    #[arg(long)]
    append: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let venue = Venue::from_id(&cli.venue).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown venue '{}' (expected one of: aaai, cvpr, emnlp, icml, neurips)",
            cli.venue
        )
    })?;
    anyhow::ensure!(
        cli.from <= cli.to,
        "empty year range: --from {} --to {}",
        cli.from,
        cli.to
    );

    let config = Config::from_env();
    let harvester = Harvester::with_fetch(venue, FetchClient::with_config(config.fetch_config()));

    tracing::info!(%venue, from = cli.from, to = cli.to, fast = cli.fast, "starting harvest");
    let records = harvester.crawl(cli.from, cli.to, cli.fast).await?;

    let sink = JsonlSink::new(&config.data_dir);
    let mode = if cli.append {
        SaveMode::Append
    } else {
        SaveMode::Overwrite
    };
    sink.save(venue, &records, mode)?;

    println!(
        "{}: {} records -> {}",
        venue.id(),
        records.len(),
        sink.path_for(venue).display()
    );
    Ok(())
}
