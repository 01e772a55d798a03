//! statedraw CLI - export a saved automaton as TikZ

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use statedraw::{generate, ExportParams, Graph};

#[derive(Parser, Debug)]
#[command(name = "statedraw-cli", version, about = "Export a statedraw graph as TikZ/automata code")]
struct Cli {
    /// Graph snapshot (JSON) to read, or `-` for stdin
    input: PathBuf,

    /// Write the TikZ block here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not mark the first state as initial
    #[arg(long)]
    no_initial: bool,

    /// Width (cm) to fit the drawing into
    #[arg(long, default_value_t = ExportParams::default().max_width)]
    max_width: f64,

    /// Height (cm) to fit the drawing into
    #[arg(long, default_value_t = ExportParams::default().max_height)]
    max_height: f64,

    /// TikZ `node distance` in cm
    #[arg(long, default_value_t = ExportParams::default().node_spacing)]
    node_spacing: f64,

    /// TikZ `shorten >` in pt
    #[arg(long, default_value_t = ExportParams::default().arrow_shorten)]
    arrow_shorten: f64,
}

impl Cli {
    fn params(&self) -> ExportParams {
        ExportParams {
            mark_initial: !self.no_initial,
            max_width: self.max_width,
            max_height: self.max_height,
            node_spacing: self.node_spacing,
            arrow_shorten: self.arrow_shorten,
        }
    }

    fn read_input(&self) -> Result<String> {
        if self.input.as_os_str() == "-" {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Could not read graph from stdin")?;
            Ok(buf)
        } else {
            fs::read_to_string(&self.input)
                .with_context(|| format!("Could not read file '{}'", self.input.display()))
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let source = cli.read_input()?;
    let graph = Graph::from_json(&source)
        .with_context(|| format!("Invalid graph in '{}'", cli.input.display()))?;
    info!(
        "loaded {} states, {} transitions",
        graph.nodes().len(),
        graph.edges().len()
    );

    let code = generate(graph.nodes(), graph.edges(), &cli.params());

    match &cli.output {
        Some(path) => {
            fs::write(path, &code)
                .with_context(|| format!("Could not write '{}'", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => print!("{}", code),
    }

    Ok(())
}
