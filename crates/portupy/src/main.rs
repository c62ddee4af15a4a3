mod build;
mod check;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION")
)]
struct Cli {
    /// Log every compilation stage to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Translate a program into Python")]
    Build {
        file: PathBuf,
        /// Where to write the Python file, defaults to FILE with a .py extension
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the Python code instead of writing a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },
    #[command(about = "Check a program without generating code")]
    Check { file: PathBuf },
}

fn main() -> Result<(), String> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Build {
            file,
            output,
            stdout,
        } => {
            build::cmd(file.as_path(), output.as_deref(), stdout)?;
        }
        Command::Check { file } => {
            check::cmd(file.as_path())?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
