mod args;
mod directives;
mod run_test;

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use run_test::{RunTestResult, TestResult};
use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    time::{Duration, Instant},
};
use walkdir::WalkDir;

const EXT: &str = "ptg";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BLUE: &str = "\x1b[34m";
const RESET: &str = "\x1b[0m";

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{RED}{e}{RESET}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool, String> {
    let args = args::RunnerArgs::new()?;
    let exe = run_test::compile_lang(args.release)?;
    let timeout = Duration::from_millis(args.timeout_ms);

    let start_time = Instant::now();
    let mut files = if let Some(file) = args.file {
        vec![file]
    } else {
        WalkDir::new(&args.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry.path().extension().and_then(|s| s.to_str()) == Some(EXT)
            })
            .map(|entry| entry.path().to_path_buf())
            .collect::<Vec<_>>()
    };
    files.sort();

    println!();
    println!("--- Testing {} files ---", files.len());
    println!();

    let results = files
        .par_iter()
        .map(|file| {
            let result = run_test::run_test_file(&exe, file, timeout).unwrap_or_else(|e| {
                RunTestResult {
                    result: TestResult::Fail {
                        message: format!("Test runner error: {e}"),
                    },
                    mode: directives::Mode::default(),
                    duration: Duration::ZERO,
                }
            });
            (file.clone(), result)
        })
        .collect::<Vec<_>>();

    let mut summary = Summary::default();
    for (file, result) in results {
        summary.add(file, result, args.quiet);
    }
    summary.print_summary(start_time, files.len());
    println!();

    Ok(summary.failed == 0 && summary.timed_out == 0)
}

#[derive(Debug, Default)]
struct Summary {
    passed: usize,
    failed: usize,
    skipped: usize,
    timed_out: usize,

    failures: Vec<(PathBuf, String)>,
    timeouts: Vec<PathBuf>,
    skips: Vec<(PathBuf, String)>,
}

impl Summary {
    fn add(&mut self, file: PathBuf, run: RunTestResult, quiet: bool) {
        let label = format!("{} {:.0?}", run.mode, run.duration);
        match run.result {
            TestResult::Pass => {
                self.passed += 1;
                status_msg(GREEN, "PASS", &file, &label, quiet);
            }
            TestResult::Fail { message } => {
                self.failed += 1;
                status_msg(RED, "FAIL", &file, &label, quiet);
                self.failures.push((file, message));
            }
            TestResult::Timeout => {
                self.timed_out += 1;
                status_msg(BLUE, "TIMEOUT", &file, &label, quiet);
                self.timeouts.push(file);
            }
            TestResult::Skip { message } => {
                self.skipped += 1;
                status_msg(YELLOW, "SKIP", &file, &label, quiet);
                self.skips.push((file, message));
            }
        }
    }

    fn print_summary(&self, start_time: Instant, total: usize) {
        println!();
        println!("--- Test Results ---");
        println!();

        if self.skipped > 0 {
            println!("{}Skipped:{} {}", YELLOW, RESET, self.skipped);
            self.skips.iter().for_each(|(f, m)| {
                println!("{YELLOW}  - {}:{RESET}", f.display());
                println!("    * {m}");
            });
            println!();
        }

        if self.timed_out > 0 {
            println!("{}Timed out:{} {}", BLUE, RESET, self.timed_out);
            self.timeouts
                .iter()
                .for_each(|f| println!("{BLUE}  - {}{RESET}", f.display()));
            println!();
        }

        if self.failed > 0 {
            println!("{}Failed:{} {}", RED, RESET, self.failed);
            self.failures.iter().for_each(|(f, m)| {
                println!("{RED}  - {}:{RESET}", f.display());
                println!("    * {m}");
            });
            println!();
        }

        println!("{GREEN}Passed:{RESET} {} of {total}", self.passed);
        println!();
        println!(
            "{CYAN}Total time:{RESET} {:.2}s",
            start_time.elapsed().as_secs_f64()
        );
    }
}

fn status_msg(color: &str, status: &str, file: &Path, label: &str, quiet: bool) {
    if quiet {
        return;
    }
    println!("{color}[{status}]{RESET} {} ({label})", file.display());
}
