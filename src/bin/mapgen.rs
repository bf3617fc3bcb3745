//! Mapping Generator CLI
//!
//! Loads JSON Schema files (or directories of them), builds the type model and
//! writes a Rust module with one index-mapping constant per record.

use anyhow::Context;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use schema_index_mapping::{load_paths, Generator, GeneratorConfig, MappingRenderer};

#[derive(Parser)]
#[command(name = "schema-mapgen")]
#[command(about = "Generate search index mappings from JSON Schema documents")]
struct Cli {
    /// Schema files or directories of *.json files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file for the mapping module (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file, layered over mapgen.toml and MAPGEN__* variables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write the resolved type model as JSON
    #[arg(long)]
    model: Option<PathBuf>,

    /// Leave out records that are inlined in another record
    #[arg(long)]
    skip_nested: bool,

    /// Inner doc comment for the generated module
    #[arg(long)]
    module_doc: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_ref().map(|p| p.to_string_lossy().into_owned());
    let mut config = GeneratorConfig::load_from(config_path.as_deref())
        .context("failed to load configuration")?;
    if cli.skip_nested {
        config.mapping.skip_nested = true;
    }
    if cli.module_doc.is_some() {
        config.mapping.module_doc = cli.module_doc;
    }

    let bundle = load_paths(&cli.inputs).context("failed to load schemas")?;
    info!(files = bundle.files.len(), checksum = %bundle.checksum.short(), "schemas loaded");

    let mut generator = Generator::new(&bundle.graph, &config.codegen());
    generator.create_types().context("failed to build type model")?;
    let model = generator.into_model();
    if model.is_empty() {
        warn!("schemas produced no records or aliases");
    }

    if let Some(path) = &cli.model {
        let json = serde_json::to_string_pretty(&model)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "type model written");
    }

    let renderer = MappingRenderer::new(&model, &config.mapping);
    let module = renderer.module_text(Some(&bundle.checksum))?;

    match &cli.output {
        Some(path) => {
            fs::write(path, module).with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), records = model.structs.len(), "mapping module written");
        }
        None => print!("{}", module),
    }

    Ok(())
}
