mod grid;
mod playback;
mod source;
mod tui;


use anyhow::{Context, Result, bail};

use crate::cli::{Cli, Command};

use self::grid::text_grid;
use self::playback::clamp_interval_ms;
use self::source::{Manifest, ManifestSource, Origin, ProducerManifest, ProducerSnapshots};

const SHOW_GRID_WIDTH: usize = 96;

pub fn run(cli: Cli) -> Result<()> {
    let origin = Origin::parse(&cli.source, cli.request_timeout());

    match cli.command {
        Some(Command::List) => run_list(&origin)?,
        Some(Command::Show { ref target }) => run_show(&origin, target)?,
        Some(Command::Play) | None => tui::run_player(origin, clamp_interval_ms(cli.interval))?,
    }

    Ok(())
}

fn load_manifest(origin: &Origin) -> Result<Manifest> {
    ProducerManifest::new(origin.clone())
        .refresh()
        .with_context(|| format!("no manifest yet at {}", origin.describe()))
}

fn run_list(origin: &Origin) -> Result<()> {
    let manifest = load_manifest(origin)?;
    if manifest.is_empty() {
        println!("No snapshots yet. Start the producer to write some.");
        return Ok(());
    }

    println!("Found {} snapshots in {}", manifest.len(), origin.describe());
    println!("{:>6}  {}", "INDEX", "SNAPSHOT");
    for (idx, id) in manifest.entries().iter().enumerate() {
        println!("{idx:>6}  {id}");
    }
    Ok(())
}

fn resolve_target(manifest: &Manifest, target: &str) -> Result<String> {
    let trimmed = target.trim();
    if let Ok(idx) = trimmed.parse::<usize>() {
        return match manifest.get(idx) {
            Some(id) => Ok(id.to_string()),
            None => bail!(
                "index {idx} is out of range (manifest lists {} snapshots)",
                manifest.len()
            ),
        };
    }
    if manifest.entries().iter().any(|id| id == trimmed) {
        return Ok(trimmed.to_string());
    }
    bail!("'{trimmed}' is not listed in the manifest")
}

fn run_show(origin: &Origin, target: &str) -> Result<()> {
    let manifest = load_manifest(origin)?;
    let id = resolve_target(&manifest, target)?;
    let snapshot = ProducerSnapshots::new(origin.clone())
        .try_fetch(&id)
        .with_context(|| format!("failed to load snapshot {id}"))?;

    println!("{id}");
    println!("{}", snapshot.summary());
    println!();
    println!("{}", text_grid(&snapshot, SHOW_GRID_WIDTH));
    Ok(())
}
