//! dom-mirror CLI
//!
//! Loads a JSON page description into a host tree, mirrors it and prints the
//! resulting records as JSON.

use anyhow::Context;
use clap::{Parser, Subcommand};
use dom_mirror::sink::{EventKind, RecordingSink};
use dom_mirror::{HostTree, Mirror, MirrorConfig, PageSpec};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dom-mirror")]
#[command(version, about = "Mirror a page description into node records")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, global = true, help = "Path to a JSON config file")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Pretty-print the output")]
    pretty: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One breadth-first baseline pass over the top document
    Snapshot {
        /// JSON page description
        page: PathBuf,
    },
    /// Discover the page the way a recording session starts, frames and shadow roots included
    Discover {
        /// JSON page description
        page: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            MirrorConfig::from_json(&json)?
        }
        None => MirrorConfig::default(),
    };

    let (page, kind) = match &cli.command {
        Command::Snapshot { page } => (page, EventKind::Snapshot),
        Command::Discover { page } => (page, EventKind::Discover),
    };
    let json = std::fs::read_to_string(page)
        .with_context(|| format!("Failed to read page {}", page.display()))?;
    let tree = HostTree::load(&PageSpec::from_json(&json)?)?;
    log::info!("loaded {} host nodes from {}", tree.len(), page.display());

    let mut mirror = Mirror::new(config, RecordingSink::new());
    match kind {
        EventKind::Snapshot => {
            mirror.snapshot(&tree, 0);
        }
        _ => {
            mirror.start(&tree)?;
            mirror.flush(kind, 0);
        }
    }

    let sink = mirror.into_sink();
    let output = serde_json::json!({
        "records": sink.batches.iter().flat_map(|b| &b.records).collect::<Vec<_>>(),
        "dimensions": sink.dimensions,
        "schemas": sink.schemas,
        "regions": sink.regions,
        "stylesheets": sink.stylesheets,
        "diagnostics": sink.diagnostics,
    });
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", rendered);
    Ok(())
}
