use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use csv::ReaderBuilder;
use reaction_mcs::*;
use tracing::*;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TheoryArg {
    Rings,
    Min,
    Default,
}

impl From<TheoryArg> for Theory {
    fn from(arg: TheoryArg) -> Self {
        match arg {
            TheoryArg::Rings => Theory::Rings,
            TheoryArg::Min => Theory::Min,
            TheoryArg::Default => Theory::Default,
        }
    }
}

/// Map the atoms of educt and product molecules onto each other.
#[derive(Debug, Parser)]
#[command(name = "mcs-pair", version)]
struct Cli {
    /// Educt SMILES (query side)
    #[arg(long, requires = "product", conflicts_with = "batch")]
    educt: Option<String>,

    /// Product SMILES (target side)
    #[arg(long, requires = "educt")]
    product: Option<String>,

    /// CSV file with `educt` and `product` columns, one pair per row
    #[arg(long)]
    batch: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "default")]
    theory: TheoryArg,

    /// Take the first of several tied mappings instead of ranking them by
    /// stereo, fragment and energy scores
    #[arg(long)]
    no_filters: bool,

    /// Compare atom types during exact embedding
    #[arg(long)]
    match_atoms: bool,

    /// Worker threads (defaults to one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Write a DOT rendering of each solution into this directory
    #[arg(long)]
    dot: Option<PathBuf>,

    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn read_batch(path: &PathBuf) -> Result<Vec<(String, String)>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);
    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|header| header.trim() == name)
            .with_context(|| format!("Missing '{}' column in {}", name, path.display()))
    };
    let (educt_column, product_column) = (column("educt")?, column("product")?);

    let mut pairs = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let educt = record.get(educt_column).unwrap_or("").trim();
        let product = record.get(product_column).unwrap_or("").trim();
        if educt.is_empty() || product.is_empty() {
            warn!("Skipping record with empty SMILES: {:?}", record);
            continue;
        }
        pairs.push((educt.to_string(), product.to_string()));
    }
    Ok(pairs)
}

/// Parses a SMILES string into a graph named after it, so identical
/// molecules share cache entries across pairs.
fn named_graph(smiles: &str) -> Result<MolecularGraph> {
    let mut graph = parse_smiles(smiles).with_context(|| format!("Invalid SMILES '{}'", smiles))?;
    graph.set_id(smiles);
    Ok(graph)
}

fn print_solution(solution: &MatchingSolution) {
    println!(
        "#{} {} -> {} [{}]",
        solution.query_position,
        solution.query.label(),
        solution.target.label(),
        solution.origin
    );
    println!(
        "  mapped {} atoms, energy {:.1}, fragments {}, stereo {:.1}",
        solution.mapped_atoms(),
        solution.energy(),
        solution.fragment_size(),
        solution.stereo_score()
    );
    let pairs = solution
        .id_pairs()
        .iter()
        .map(|(query, target)| format!("{}:{}", query, target))
        .collect::<Vec<_>>()
        .join(" ");
    println!("  {}", pairs);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let pairs = match (&cli.educt, &cli.product, &cli.batch) {
        (Some(educt), Some(product), None) => vec![(educt.clone(), product.clone())],
        (None, None, Some(path)) => read_batch(path)?,
        _ => bail!("Pass either --educt and --product, or --batch"),
    };

    let flags = MatcherFlags {
        match_atoms: cli.match_atoms,
        ..MatcherFlags::default()
    };
    let filters = if cli.no_filters {
        ChemFilters::default()
    } else {
        ChemFilters::all()
    };
    let cache = Arc::new(ResultCache::new());

    let mut tasks = Vec::with_capacity(pairs.len());
    for (position, (educt, product)) in pairs.iter().enumerate() {
        let query = named_graph(educt)?;
        let target = named_graph(product)?;
        let mut task = MatchingTask::new(
            &query,
            &target,
            position,
            position,
            flags,
            cli.theory.into(),
            Arc::clone(&cache),
        )?;
        task.set_filters(filters);
        tasks.push(task);
    }

    let pool = RayonPool::new(cli.threads)?;
    let results = pool.run_all(tasks);

    let mut failures = 0;
    for (position, result) in results.iter().enumerate() {
        match result {
            Ok(solution) => {
                print_solution(solution);
                if let Some(dir) = &cli.dot {
                    let path = dir.join(format!("pair-{}.dot", position));
                    visualize_solution(solution, &path.to_string_lossy(), None)?;
                }
            }
            Err(e) => {
                failures += 1;
                error!("Pair {} failed: {}", position, e);
                println!("#{} failed: {}", position, e);
            }
        }
    }

    let stats = cache.stats();
    println!(
        "{} pairs, {} failed; cache: {} entries, {} hits, {} misses",
        results.len(),
        failures,
        stats.entries,
        stats.hits,
        stats.misses
    );
    Ok(())
}
