//! vpfdb command line interface
//!
//! Prints the structure of a VPF database and dumps the features of one
//! feature class as text or GeoJSON-like JSON.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use vpfdb::database::Library;
use vpfdb::logging::init_logging;
use vpfdb::{Feature, FeatureClass, VpfConfig, VpfDatabase};

#[derive(Parser)]
#[command(name = "vpfdb-cli", version, about = "Inspect Vector Product Format databases")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `vpfdb=debug` (defaults to RUST_LOG, then `warn`)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print libraries, coverages, feature classes and feature types
    Info {
        /// Database directory
        database: PathBuf,
    },
    /// Print the features of one feature class
    Features {
        /// Database directory
        database: PathBuf,
        #[arg(long)]
        library: String,
        #[arg(long)]
        coverage: String,
        #[arg(long = "class")]
        feature_class: String,
        /// Stop after this many features
        #[arg(long)]
        limit: Option<usize>,
        /// One JSON object per line
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref())?;

    let config = match &cli.config {
        Some(path) => VpfConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => VpfConfig::default(),
    };

    match cli.command {
        Command::Info { database } => {
            let db = open(&database, config)?;
            print_info(&db)
        }
        Command::Features {
            database,
            library,
            coverage,
            feature_class,
            limit,
            json,
        } => {
            // One forward pass; no need to keep features in memory
            let config = VpfConfig {
                feature_cache: false,
                ..config
            };
            let db = open(&database, config)?;
            let library = db
                .library(&library)
                .ok_or_else(|| anyhow!("library '{}' not found", library))?;
            let class = find_class(library, &coverage, &feature_class)?;
            print_features(class, limit, json)
        }
    }
}

fn open(path: &Path, config: VpfConfig) -> Result<VpfDatabase> {
    VpfDatabase::open_with_config(path, config)
        .with_context(|| format!("opening database {}", path.display()))
}

fn find_class<'a>(library: &'a Library, coverage: &str, class: &str) -> Result<&'a FeatureClass> {
    let coverage = library
        .coverage(coverage)
        .ok_or_else(|| anyhow!("coverage '{}' not found in {}", coverage, library.name()))?;
    coverage
        .feature_class(class)
        .map(|c| c.as_ref())
        .ok_or_else(|| anyhow!("feature class '{}' not found in {}", class, coverage.name()))
}

fn print_info(db: &VpfDatabase) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(
        out,
        "Database {} ({})",
        db.name().unwrap_or("<unnamed>"),
        db.path().display()
    )?;
    if let Some(b) = db.bounds() {
        writeln!(out, "  bounds: {} {} {} {}", b.min_x, b.min_y, b.max_x, b.max_y)?;
    }

    for library in db.libraries() {
        let crs = library
            .crs()
            .map_or_else(|| "unresolved".to_string(), |c| format!("{} (EPSG:{})", c.name(), c.epsg()));
        writeln!(out, "Library {}  crs: {}", library.name(), crs)?;
        if let Some(tiles) = library.tile_map() {
            writeln!(out, "  tiles: {}", tiles.len())?;
        }
        for coverage in library.coverages() {
            writeln!(
                out,
                "  Coverage {} (level {}) {}",
                coverage.name(),
                coverage.topology_level(),
                coverage.description()
            )?;
            for class in coverage.feature_classes() {
                let geometry = class
                    .geometry_kind()
                    .map_or_else(|| "none".to_string(), |k| k.to_string());
                writeln!(
                    out,
                    "    Class {}  primary: {}  columns: {}  geometry: {}",
                    class.name(),
                    class.primary_table(),
                    class.schema().len(),
                    geometry
                )?;
            }
            for feature_type in coverage.feature_types() {
                writeln!(
                    out,
                    "    Type {} [{}] -> {}",
                    feature_type.type_name(),
                    feature_type.facc_code().unwrap_or("*"),
                    feature_type.feature_class().name()
                )?;
            }
        }
    }
    Ok(())
}

fn print_features(class: &FeatureClass, limit: Option<usize>, json: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let limit = limit.unwrap_or(usize::MAX);

    for feature in class.features()?.take(limit) {
        let feature = feature?;
        if json {
            serde_json::to_writer(&mut out, &feature)?;
            writeln!(out)?;
        } else {
            writeln!(out, "{}", describe(&feature))?;
        }
    }
    Ok(())
}

fn describe(feature: &Feature) -> String {
    let schema = feature.schema();
    let attributes: Vec<String> = schema
        .columns()
        .iter()
        .zip(feature.values())
        .enumerate()
        .filter(|(i, _)| Some(*i) != schema.geometry_index())
        .map(|(_, (column, value))| format!("{}={}", column.name(), value))
        .collect();
    let geometry = feature.geometry().map_or("none", |g| g.kind_name());
    format!("{}  {}  [{}]", feature.id(), attributes.join(" "), geometry)
}
