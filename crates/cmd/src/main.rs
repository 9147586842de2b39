use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use cmd::commands::{
    Layer, generate_command, ls_command, match_command, resolve_command, tree_command,
};
use cmd::common::VfsContext;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "overlay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Directory holding vfs.json (overrides OVERLAYFS_ROOT)
    #[arg(long, global = true)]
    vfs_root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the virtual tree described by vfs.json
    Tree {
        /// Emit the tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what a virtual path is backed by
    Resolve {
        /// Path relative to the scope root, e.g. BepInEx\core\BepInEx.dll
        path: String,
    },
    /// List a virtual folder, optionally filtered by a wildcard pattern
    Ls {
        /// Folder or folder\pattern, e.g. BepInEx\plugins\*.dll
        #[arg(default_value = "")]
        pattern: String,
        /// Only list folders
        #[arg(short, long)]
        dirs: bool,
    },
    /// Test names against a wildcard pattern
    Match {
        pattern: String,
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Build a descriptor from host layer directories
    Generate {
        /// Output file (defaults to vfs.json in the vfs root)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Virtual folder for layers that do not name one
        #[arg(long)]
        under: Option<String>,
        /// Layer directories as [folder=]dir; later layers win
        #[arg(required = true)]
        layers: Vec<String>,
    },
}

#[allow(clippy::print_stdout)]
fn print_output(output: &str) {
    print!("{output}");
}

fn main() -> Result<()> {
    diagnostics::init_diagnostics();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tree { json } => {
            let ctx = VfsContext::from_override(cli.vfs_root)?;
            tree_command(&ctx, json, print_output)
        }
        Commands::Resolve { path } => {
            let ctx = VfsContext::from_override(cli.vfs_root)?;
            resolve_command(&ctx, &path, print_output)
        }
        Commands::Ls { pattern, dirs } => {
            let ctx = VfsContext::from_override(cli.vfs_root)?;
            ls_command(&ctx, &pattern, dirs, print_output)
        }
        Commands::Match { pattern, names } => {
            match_command(&pattern, &names, print_output);
            Ok(())
        }
        Commands::Generate {
            output,
            under,
            layers,
        } => {
            let output = match output {
                Some(output) => output,
                None => VfsContext::from_override(cli.vfs_root)?.descriptor_path(),
            };
            let layers: Vec<Layer> = layers
                .iter()
                .map(|spec| Layer::parse(spec, under.as_deref()))
                .collect();
            generate_command(&output, &layers, print_output)
        }
    }
}
