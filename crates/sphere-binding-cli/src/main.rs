//! sphere-binding CLI
//!
//! Adds request-binding struct tags (`uri`, `query`, `form`, `header`, …) to
//! protoc-gen-go output, driven by `sphere.binding` options in the protos:
//! - `tag`: rewrite the generated `.pb.go` files in place
//! - `plan`: print the planned tags as JSON without touching any file
//! - `build-descriptor`: produce the descriptor set JSON with `buf`

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

mod config;
mod generate;
mod proto;

use config::SettingsArgs;
use proto::InputArgs;

#[derive(Parser)]
#[command(name = "sphere-binding")]
#[command(
    author,
    version,
    about = "Inject binding struct tags into protoc-gen-go output"
)]
struct Cli {
    /// More logging on stderr (-v: debug, -vv: trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite generated `.pb.go` files with the planned struct tags.
    Tag {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Print the planned struct tags per proto file as JSON.
    Plan {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        settings: SettingsArgs,
        /// Write the plan here instead of stdout
        #[arg(long = "plan-out")]
        plan_out: Option<PathBuf>,
    },

    /// Build a descriptor set JSON with `buf build`.
    BuildDescriptor {
        /// Buf module root
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Output descriptor JSON
        #[arg(short, long, default_value = "descriptor.json")]
        out: PathBuf,
        /// Leave imported files out of the set
        #[arg(long)]
        exclude_imports: bool,
        /// Leave source info out of the set
        #[arg(long)]
        exclude_source_info: bool,
    },
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Tag { input, settings } => {
            let settings = settings.resolve()?;
            let descriptor = input.read_descriptor()?;
            let units = generate::load_units(&descriptor, &settings)?;
            println!(
                "{} {} proto files into {}",
                "Tagging".green().bold(),
                units.len(),
                settings.rewrite.out_dir.display()
            );
            generate::run_tag(&units, &settings)?;
        }
        Commands::Plan {
            input,
            settings,
            plan_out,
        } => {
            let settings = settings.resolve()?;
            let descriptor = input.read_descriptor()?;
            let units = generate::load_units(&descriptor, &settings)?;
            let plans = generate::plan_units(&units, &settings)?;
            let json = serde_json::to_string_pretty(&plans)?;
            match plan_out {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("failed to write plan: {}", path.display()))?;
                    eprintln!("{} {}", "wrote".green().bold(), path.display().to_string().bold());
                }
                None => println!("{json}"),
            }
        }
        Commands::BuildDescriptor {
            root,
            out,
            exclude_imports,
            exclude_source_info,
        } => {
            proto::build_descriptor_set_json(&root, &out, exclude_imports, exclude_source_info)?;
            println!("  {} {}", "→".cyan(), out.display());
        }
    }
    Ok(())
}
