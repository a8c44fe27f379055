use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use quill_diff::DiffStats;
use quill_markdown::{stats, MarkdownParser};
use tracing::debug;

#[derive(Parser)]
#[command(version, about = "Quill - Markdown rendering, diffing and stats", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a Markdown file to sanitized HTML
    Render {
        /// Markdown file to render
        file: PathBuf,

        /// Write HTML here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Diff two Markdown files line by line
    Diff {
        /// Old version
        old: PathBuf,

        /// New version
        new: PathBuf,

        /// Emit unified text output instead of an HTML table
        #[arg(long)]
        unified: bool,
    },
    /// Word, character and line counts for a Markdown file
    Stats {
        /// Markdown file to measure
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    init_miette();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { file, out } => render(file, out),
        Commands::Diff { old, new, unified } => diff(old, new, unified),
        Commands::Stats { file } => print_stats(file),
    }
}

fn render(file: PathBuf, out: Option<PathBuf>) -> Result<()> {
    let markdown = read(&file)?;
    debug!(file = %file.display(), bytes = markdown.len(), "rendering");

    let html = MarkdownParser::default().parse(&markdown);
    match out {
        Some(path) => {
            std::fs::write(&path, html).into_diagnostic()?;
            println!("Wrote {}", path.display());
        }
        None => print!("{html}"),
    }
    Ok(())
}

fn diff(old: PathBuf, new: PathBuf, unified: bool) -> Result<()> {
    let old_text = read(&old)?;
    let new_text = read(&new)?;

    let ops = quill_diff::compute_diff(&old_text, &new_text).into_diagnostic()?;
    let stats = DiffStats::from_ops(&ops);

    if unified {
        print!(
            "{}",
            quill_diff::unified(
                &old.display().to_string(),
                &new.display().to_string(),
                &ops
            )
        );
    } else {
        print!("{}", quill_diff::render_html(&ops));
    }
    eprintln!(
        "{} added, {} removed, {} unchanged",
        stats.inserted, stats.deleted, stats.unchanged
    );
    Ok(())
}

fn print_stats(file: PathBuf) -> Result<()> {
    let markdown = read(&file)?;
    println!("words      {}", stats::word_count(&markdown));
    println!("characters {}", stats::char_count(&markdown));
    println!("lines      {}", markdown.lines().count());
    Ok(())
}

fn read(path: &PathBuf) -> Result<String> {
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", path.display()))
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_missing_file_names_the_path() {
        let path = PathBuf::from("/definitely/not/here.md");
        let err = read(&path).unwrap_err();
        assert!(format!("{err}").contains("/definitely/not/here.md"));
    }
}
