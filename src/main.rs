use anyhow::Context;
use clap::{Parser, Subcommand};
use hbs2django::converter;
use hbs2django::models::TranspileOptions;
use hbs2django::tpl::parse_template;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(
    name = "hbs2django",
    version,
    about = "Convert Handlebars templates into Django templates."
)]
struct Args {
    /// Log at debug level unless RUST_LOG is set.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert template files, or every template below a directory.
    Convert {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Write converted templates below this directory instead of next to the sources.
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Do not append the original template as a Django comment.
        #[arg(long)]
        no_source_comment: bool,
        /// Degrade partials that pass a whole context instead of failing.
        #[arg(long)]
        lenient_partials: bool,
        /// Print converted templates instead of writing them.
        #[arg(long)]
        stdout: bool,
    },
    /// Print the parsed template as JSON.
    Ast {
        #[arg(required = true)]
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Convert {
            paths,
            out_dir,
            no_source_comment,
            lenient_partials,
            stdout,
        } => {
            let mut options = TranspileOptions::new()
                .source_comment(!no_source_comment)
                .strict_partials(!lenient_partials);
            if let Some(out_dir) = out_dir {
                options = options.out_dir(out_dir);
            }
            for path in &paths {
                if stdout {
                    for file in converter::template_files(path, &options)? {
                        print_converted(&file, &options)?;
                    }
                } else {
                    for file in converter::convert_path(path, &options)? {
                        for diagnostic in &file.diagnostics {
                            warn!(source = %file.source.display(), "{}", diagnostic);
                        }
                        info!(
                            source = %file.source.display(),
                            output = %file.target.display(),
                            "converted"
                        );
                    }
                }
            }
        }
        Command::Ast { file } => {
            let source = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let program = parse_template(&source)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&program)?);
        }
    }
    Ok(())
}

fn print_converted(path: &Path, options: &TranspileOptions) -> anyhow::Result<()> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let (output, diagnostics) =
        converter::convert_source(&path.display().to_string(), &source, options)?;
    for diagnostic in &diagnostics {
        warn!(source = %path.display(), "{}", diagnostic);
    }
    println!("{}", output);
    Ok(())
}
