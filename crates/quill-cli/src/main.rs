use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Quill - preprocess contract source into a dispatching LLL program")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Preprocess {
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the storage and extern tables as JSON
        #[arg(long)]
        tables: Option<PathBuf>,

        /// Print the program on a single line
        #[arg(long)]
        compact: bool,

        /// JSON file with preprocess settings
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(short, long)]
        verbose: bool,
    },

    Layout {
        input: PathBuf,
    },

    Validate {
        path: PathBuf,

        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Preprocess {
            input,
            output,
            tables,
            compact,
            config,
            verbose,
        } => cmd_preprocess(input, output, tables, compact, config, verbose),
        Commands::Layout { input } => cmd_layout(input),
        Commands::Validate { path, verbose } => cmd_validate(path, verbose),
    }
}

/// Parses and preprocesses one file, rendering error spans as `path:line:col`.
fn load_and_preprocess(
    input: &Path,
    config: quill_transform::PreprocessConfig,
) -> Result<quill_transform::PreprocessResult> {
    use quill_core::SourceFiles;

    let mut files = SourceFiles::new();
    let file_id = files.load(input.to_path_buf())?;
    let text = files
        .get_file(file_id)
        .map(|file| file.text.clone())
        .unwrap_or_default();

    let program = quill_parser::parse_program_as_seq(&text, file_id)?;

    quill_transform::preprocess_with_config(&program, config).map_err(|e| match e.span() {
        Some(span) if span.is_valid() => {
            let snippet = files.snippet(span, 0).unwrap_or_default();
            anyhow::anyhow!("{}: {}\n{}", files.describe(span), e, snippet.trim_end())
        }
        _ => e.into(),
    })
}

fn load_config(path: Option<&Path>) -> Result<quill_transform::PreprocessConfig> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&json)?)
        }
        None => Ok(quill_transform::PreprocessConfig::default()),
    }
}

fn cmd_preprocess(
    input: PathBuf,
    output: Option<PathBuf>,
    tables: Option<PathBuf>,
    compact: bool,
    config: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    use colored::*;
    use quill_emit::{tables_to_json, Emitter, SexprEmitter};
    use std::fs;
    use std::time::Instant;

    if verbose {
        println!("{}", " Quill Preprocessor".bright_blue().bold());
        println!("{}", "=".repeat(50).bright_blue());
        println!(" Input: {}", input.display());
        if let Some(ref out) = output {
            println!(" Output: {}", out.display());
        }
        if let Some(ref cfg) = config {
            println!(" Config: {}", cfg.display());
        }
        println!();
    }

    let start = Instant::now();
    let settings = load_config(config.as_deref())?;

    if verbose {
        println!(" Preprocessing...");
    }
    let result = load_and_preprocess(&input, settings)?;

    let emitter = if compact {
        SexprEmitter::compact()
    } else {
        SexprEmitter::default()
    };
    let text = emitter.emit_to_string(&result.program)?;

    if let Some(tables_path) = tables {
        fs::write(&tables_path, tables_to_json(&result)?)?;
        if verbose {
            println!(" Tables written to: {}", tables_path.display());
        }
    }

    if let Some(output_path) = output {
        fs::write(&output_path, &text)?;
        if verbose {
            println!(
                "\n {} Preprocessing successful!",
                "SUCCESS:".bright_green().bold()
            );
            println!("   Time: {:.3}s", start.elapsed().as_secs_f64());
            println!("   Functions: {}", result.externs.functions().count());
            println!("   Storage entries: {}", result.storage.len());
            println!("   Output: {}", output_path.display());
        }
    } else {
        print!("{}", text);
    }

    Ok(())
}

fn cmd_layout(input: PathBuf) -> Result<()> {
    use quill_emit::{EmitterConfig, Emitter, ExternTableEmitter, StorageTableEmitter};

    let result = load_and_preprocess(&input, Default::default())?;
    let config = EmitterConfig::default().with_colors(true);

    print!(
        "{}",
        StorageTableEmitter::new(config.clone()).emit_to_string(&result.storage)?
    );
    print!(
        "{}",
        ExternTableEmitter::new(config).emit_to_string(&result.externs)?
    );
    Ok(())
}

fn cmd_validate(path: PathBuf, verbose: bool) -> Result<()> {
    use colored::*;
    use walkdir::WalkDir;

    if verbose {
        println!("{}", " Validating contract source".bright_cyan().bold());
        println!("{}", "=".repeat(50).bright_cyan());
        println!(" Path: {}", path.display());
        println!();
    }

    let files: Vec<PathBuf> = if path.is_dir() {
        WalkDir::new(&path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "lll"))
            .collect()
    } else {
        vec![path.clone()]
    };

    let mut failures = 0;
    for file in &files {
        let text = std::fs::read_to_string(file)?;
        match quill_parser::parse_in_file(&text, 0) {
            Ok(nodes) => {
                println!("{} {}", " VALID".bright_green().bold(), file.display());
                if verbose {
                    println!("   Parsed {} top-level forms", nodes.len());
                }
            }
            Err(e) => {
                failures += 1;
                println!("{} {}", " INVALID".bright_red().bold(), file.display());
                println!("{}", e);
            }
        }
    }

    if verbose {
        println!("\n Checked {} file(s), {} invalid", files.len(), failures);
    }

    if failures > 0 {
        Err(anyhow::anyhow!("Validation failed"))
    } else {
        Ok(())
    }
}
