// SPDX-License-Identifier: MIT OR Apache-2.0
//! `PropFlow` runner - loads a graph document, ticks it and prints the outputs.

use clap::Parser;
use propflow_graph::{
    create_standard_registry, DocumentError, GraphDocument, GraphError, System, SystemSettings,
};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Run a property graph document
#[derive(Debug, Parser)]
#[command(name = "propflow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run a typed property graph document")]
struct Args {
    /// Graph document (.ron or .json)
    document: PathBuf,

    /// Number of ticks to run
    #[arg(short, long, default_value_t = 1)]
    ticks: u32,

    /// Seconds per tick
    #[arg(short, long, default_value_t = 1.0 / 60.0)]
    delta: f64,

    /// System settings file (RON)
    #[arg(short, long, env = "PROPFLOW_SETTINGS")]
    settings: Option<PathBuf>,

    /// Write the final graph state to this document
    #[arg(long)]
    save: Option<PathBuf>,

    /// Print the final graph state as a JSON document
    #[arg(long)]
    json: bool,

    /// Log filter directives, e.g. `propflow_graph=debug`
    #[arg(long, env = "PROPFLOW_LOG")]
    log: Option<String>,
}

/// Errors that end the run
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid log filter: {0}")]
    LogFilter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to load settings: {0}")]
    Settings(#[from] std::io::Error),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(args.log.as_deref()) {
        eprintln!("propflow: {e}");
        std::process::exit(2);
    }

    if let Err(e) = run(&args) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn init_logging(directives: Option<&str>) -> Result<(), CliError> {
    let env_filter = match directives {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::from_default_env()
            .add_directive("propflow_graph=info".parse()?)
            .add_directive("propflow=info".parse()?),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

fn run(args: &Args) -> Result<(), CliError> {
    let settings = match &args.settings {
        Some(path) => SystemSettings::load(path)?,
        None => SystemSettings::default(),
    };

    let document = GraphDocument::load(&args.document)?;
    let graph = document.instantiate(&create_standard_registry())?;
    let mut system = System::with_settings(graph, settings);

    for _ in 0..args.ticks {
        let report = system.tick(args.delta)?;
        tracing::debug!(
            "Frame {}: {} updated, {} ticked",
            report.frame,
            report.updated.len(),
            report.ticked.len()
        );
    }
    tracing::info!("Ran {} ticks of '{}'", args.ticks, system.graph().name);

    let state = GraphDocument::from_graph(system.graph());
    if let Some(path) = &args.save {
        state.save(path)?;
        tracing::info!("Saved graph state to {}", path.display());
    }

    if args.json {
        println!("{}", state.to_json_string()?);
    } else {
        for component in system.graph().components() {
            for output in component.outs().iter() {
                println!("{} = {}", output.path(), output.value());
            }
        }
    }
    Ok(())
}
