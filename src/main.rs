use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use orden::cli::{Cli, OutputFormat};
use orden::comparator::{ProfiledComparator, SortKeyCache};
use orden::profiles::MethodProfiles;
use orden::report::{self, LayoutEntry, ProfileSummary};
use orden::symbols::{IdOrder, MethodId, MethodIndex};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Pre-scan the profile and intern every method name, so parsing can
/// resolve rows without an external symbol table. Data rows are the lines
/// with the full fixed schema that are not the header.
fn collect_symbols(path: &Path) -> Result<MethodIndex> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut index = MethodIndex::new();
    for line in BufReader::new(file).lines() {
        let line = line.context("failed to read profile line")?;
        let cells: Vec<&str> = line.split(',').collect();
        if cells.len() >= 8 && cells[0] != "index" {
            index.insert(cells[1]);
        }
    }
    Ok(index)
}

fn print_layout(
    profiles: &MethodProfiles,
    symbols: &MethodIndex,
    whitelist: &HashSet<String>,
    legacy: bool,
    format: OutputFormat,
) -> Result<()> {
    let cache = SortKeyCache::default();
    let comparator =
        ProfiledComparator::new(profiles, symbols, &IdOrder, whitelist, cache, legacy);

    let mut methods: Vec<MethodId> = symbols.ids().collect();
    methods.sort_by(|a, b| comparator.compare(Some(*a), Some(*b)));

    let entries: Vec<LayoutEntry> = methods
        .iter()
        .map(|&method| LayoutEntry {
            name: symbols.name(method).to_string(),
            sort_key: comparator.sort_key(method),
        })
        .collect();

    match format {
        OutputFormat::Text => print!("{}", report::layout_to_text(&entries)),
        OutputFormat::Json => println!("{}", report::layout_to_json(&entries)?),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let symbols = collect_symbols(&cli.profile)?;
    let mut profiles = MethodProfiles::new();
    profiles
        .parse_file(&cli.profile, &symbols)
        .with_context(|| format!("failed to parse {}", cli.profile.display()))?;
    // Every name was interned up front, so the backlog drains immediately.
    profiles.process_unresolved_lines(&symbols);

    if cli.summary {
        let summary = ProfileSummary::from_profiles(&profiles);
        match cli.format {
            OutputFormat::Text => print!("{}", summary.to_text()),
            OutputFormat::Json => println!("{}", summary.to_json()?),
        }
        return Ok(());
    }

    let whitelist: HashSet<String> = cli.whitelist.iter().cloned().collect();
    print_layout(&profiles, &symbols, &whitelist, cli.legacy, cli.format)
}
