use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use crossword_csp::{find_fill, render_grid, Crossword, FillFailure, PuzzleError, SolverOptions};
use log::{error, info, LevelFilter};
use thiserror::Error;

#[derive(Error, Debug)]
enum CliError {
    #[error("{0}")]
    Puzzle(#[from] PuzzleError),
    #[error("Failed to write {path}, more details: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fill a crossword structure with words from a word list.
#[derive(Debug, Parser)]
#[command(author, version, about, arg_required_else_help = true)]
struct Args {
    /// The structure file: one row per line, `_` for fillable cells and anything else for blocks.
    structure: PathBuf,

    /// The word list: one word per line.
    words: PathBuf,

    /// Where to also write the filled grid.
    output: Option<PathBuf>,

    /// Re-run arc consistency after every choice during the search.
    #[arg(long)]
    maintain_arc_consistency: bool,

    /// Give up after trying this many candidate words.
    #[arg(long)]
    state_limit: Option<u64>,

    /// Log progress and statistics to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn configure_logging(verbose: bool) {
    let level_filter = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .format(move |buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .filter_level(level_filter)
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    configure_logging(args.verbose);

    if let Err(e) = run(args) {
        error!("Execution failed, error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let crossword = Crossword::from_files(&args.structure, &args.words)?;
    info!(
        "Loaded a {}x{} grid with {} slots and {} words",
        crossword.height(),
        crossword.width(),
        crossword.variables().len(),
        crossword.word_count()
    );

    let options = SolverOptions {
        maintain_arc_consistency: args.maintain_arc_consistency,
        state_limit: args.state_limit,
    };

    match find_fill(&crossword, options) {
        Ok(result) => {
            info!("{:?}", result.statistics);
            let display_grid = render_grid(&crossword, &result.assignment);
            println!("{}", display_grid);

            if let Some(path) = args.output {
                fs::write(&path, display_grid + "\n")
                    .map_err(|source| CliError::Output { path: path.clone(), source })?;
                info!("Wrote the filled grid to {}", path.display());
            }
        }
        Err(FillFailure::Unsatisfiable) => println!("No solution."),
        Err(failure @ FillFailure::ExhaustedStateLimit) => {
            println!("No solution.");
            info!("Stopped early: {}", failure);
        }
    }

    Ok(())
}
