//! lapsmooth CLI: mesh smoothing, inspection and validation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lapsmooth_io::contract::BackendKind;

mod commands;

#[derive(Parser)]
#[command(name = "lapsmooth")]
#[command(version, about = "lapsmooth: ping-pong Laplacian mesh smoothing on CPU or GPU")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Smooth an OBJ mesh.
    Smooth {
        /// Pipeline config (TOML). Flags below override its values.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Mesh to read.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Mesh to write.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of smoothing passes.
        #[arg(short = 'n', long)]
        iterations: Option<u32>,

        /// Compute backend (cpu, wgpu).
        #[arg(short, long)]
        backend: Option<BackendKind>,

        /// Center the mesh's bounding box on the origin before smoothing.
        #[arg(long)]
        recenter: bool,

        /// Write run metrics here (.csv, otherwise JSON).
        #[arg(short, long)]
        metrics: Option<PathBuf>,
    },

    /// Print counts, valence statistics and diagnostics for an OBJ mesh.
    Inspect {
        /// Path to the mesh.
        path: PathBuf,
    },

    /// Validate a mesh (.obj) or pipeline config (.toml).
    Validate {
        /// Path to mesh or config file.
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Smooth {
            config,
            input,
            output,
            iterations,
            backend,
            recenter,
            metrics,
        } => commands::smooth(commands::SmoothArgs {
            config,
            input,
            output,
            iterations,
            backend,
            recenter,
            metrics,
        }),
        Commands::Inspect { path } => commands::inspect(&path),
        Commands::Validate { path } => commands::validate(&path),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
