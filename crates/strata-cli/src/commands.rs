use std::fs::{self, File};
use std::path::Path;

use anyhow::Context;
use colored::Colorize;

use strata_catalog::{DataObject, InMemoryCatalog, ReplicaCatalog};
use strata_ingest::{ByteSource, ChecksumDirective, IngestEngine, IngestRequest};
use strata_types::LogicalPath;

use crate::cli::*;
use crate::config::StrataConfig;

type Engine = IngestEngine<InMemoryCatalog, strata_ingest::VaultStore>;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = StrataConfig::load(&cli.config)?;
    let engine = build_engine(&config)?;

    match cli.command {
        Command::Put(args) => cmd_put(&engine, &config, args),
        Command::Checksum(args) => cmd_checksum(&engine, args),
        Command::Ls(args) => cmd_ls(&engine, args),
        Command::Lsresc(_) => cmd_lsresc(&engine),
        Command::Rm(args) => cmd_rm(&engine, &config, args),
    }
}

fn build_engine(config: &StrataConfig) -> anyhow::Result<Engine> {
    let tree = config.build_tree()?;
    let catalog = InMemoryCatalog::new();
    restore_catalog(&catalog, &config.catalog_path())?;
    Ok(IngestEngine::new(
        tree,
        catalog,
        strata_ingest::VaultStore::new(&config.vault_root),
    ))
}

/// Replay persisted objects into the catalog through its transaction API.
fn restore_catalog(catalog: &InMemoryCatalog, state_path: &Path) -> anyhow::Result<()> {
    if !state_path.exists() {
        return Ok(());
    }
    let raw = fs::read_to_string(state_path)
        .with_context(|| format!("reading catalog state {}", state_path.display()))?;
    let objects: Vec<DataObject> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing catalog state {}", state_path.display()))?;
    for object in objects {
        let txn = catalog.begin(&object.path)?;
        catalog.commit(txn, object.replicas.into_values().collect())?;
    }
    Ok(())
}

fn save_catalog(catalog: &InMemoryCatalog, state_path: &Path) -> anyhow::Result<()> {
    let mut objects = Vec::new();
    for path in catalog.list_objects()? {
        objects.push(catalog.get_object(&path)?);
    }
    if let Some(parent) = state_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(state_path, serde_json::to_string_pretty(&objects)?)
        .with_context(|| format!("writing catalog state {}", state_path.display()))?;
    Ok(())
}

fn cmd_put(engine: &Engine, config: &StrataConfig, args: PutArgs) -> anyhow::Result<()> {
    let file = File::open(&args.file)
        .with_context(|| format!("opening source file {}", args.file.display()))?;
    let len = file.metadata()?.len();
    let source = ByteSource::from_reader_sized(file, len);

    let path = LogicalPath::parse(&args.path)?;
    let target = strata_types::ResourceName::new(&args.resource)?;
    let mut request = if args.force {
        IngestRequest::overwrite(path, target)
    } else {
        IngestRequest::create(path, target)
    };
    request = request.with_directive(if args.verify {
        ChecksumDirective::VerifyOnWrite
    } else if args.register {
        ChecksumDirective::RegisterOnly
    } else {
        ChecksumDirective::None
    });

    let receipt = engine.ingest(request, source)?;
    save_catalog(engine.catalog(), &config.catalog_path())?;

    println!(
        "{} {} ({} bytes, {} replica{})",
        "✓".green().bold(),
        receipt.path.to_string().bold(),
        receipt.bytes_written,
        receipt.replicas.len(),
        if receipt.replicas.len() == 1 { "" } else { "s" },
    );
    for replica in &receipt.replicas {
        let checksum = replica.checksum.report();
        let rendered = if checksum.is_empty() {
            "no checksum".dimmed().to_string()
        } else {
            checksum.cyan().to_string()
        };
        println!(
            "  {} {} {}",
            replica.replica_number,
            replica.leaf.to_string().yellow(),
            rendered
        );
    }
    Ok(())
}

fn cmd_checksum(engine: &Engine, args: ChecksumArgs) -> anyhow::Result<()> {
    let path = LogicalPath::parse(&args.path)?;
    // Prints the empty marker (a bare newline) when no verified checksum
    // is recorded.
    println!("{}", engine.checksum_report(&path)?);
    Ok(())
}

fn cmd_ls(engine: &Engine, args: LsArgs) -> anyhow::Result<()> {
    match args.path {
        Some(path) => {
            let path = LogicalPath::parse(&path)?;
            for replica in engine.list_replicas(&path)? {
                let checksum = replica.checksum.report();
                println!(
                    "  {} {} {} {} {}",
                    replica.replica_number,
                    replica.leaf.to_string().yellow(),
                    replica.size,
                    replica.modified_at.to_rfc3339().dimmed(),
                    if checksum.is_empty() {
                        "-".dimmed().to_string()
                    } else {
                        checksum.cyan().to_string()
                    },
                );
            }
        }
        None => {
            for path in engine.catalog().list_objects()? {
                println!("{path}");
            }
        }
    }
    Ok(())
}

fn cmd_lsresc(engine: &Engine) -> anyhow::Result<()> {
    print!("{}", engine.tree().render_ascii());
    Ok(())
}

fn cmd_rm(engine: &Engine, config: &StrataConfig, args: RmArgs) -> anyhow::Result<()> {
    let path = LogicalPath::parse(&args.path)?;
    engine.remove(&path)?;
    save_catalog(engine.catalog(), &config.catalog_path())?;
    println!("{} removed {}", "✓".green().bold(), path.to_string().bold());
    Ok(())
}
