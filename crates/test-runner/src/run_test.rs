use wait_timeout::ChildExt;

use crate::directives::{Directives, ExpectedResult, Mode};
use std::{
    io::Read,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::{Duration, Instant},
};

const ORANGE: &str = "\x1b[93m";
const RESET: &str = "\x1b[0m";

pub struct RunTestResult {
    pub result: TestResult,
    pub mode: Mode,
    pub duration: Duration,
}

#[derive(Debug)]
pub enum TestResult {
    Pass,
    Fail { message: String },
    Timeout,
    Skip { message: String },
}

#[derive(Debug)]
enum ProcessOutcome {
    Pass { stdout: String, stderr: String },
    Fail { output: String },
    Timeout,
}

pub fn run_test_file(cmd: &Path, file: &Path, timeout: Duration) -> Result<RunTestResult, String> {
    let src = std::fs::read_to_string(file).map_err(|e| e.to_string())?;
    let directives = Directives::new(&src)?;
    if let Some(message) = directives.skip.clone() {
        return Ok(RunTestResult {
            result: TestResult::Skip { message },
            mode: directives.mode,
            duration: Duration::ZERO,
        });
    }

    let start_time = Instant::now();
    let outcome = spawn_test_process(cmd, file, timeout, directives.mode)?;
    let elapsed = start_time.elapsed();

    let result = match (outcome, directives.expect) {
        (ProcessOutcome::Pass { stdout, stderr }, ExpectedResult::Success) => {
            match_output(&stdout, &stderr, &directives)
        }
        (ProcessOutcome::Pass { stdout, .. }, ExpectedResult::Error) => TestResult::Fail {
            message: format!("Expected error but got success:\n{stdout}"),
        },
        (ProcessOutcome::Fail { output }, ExpectedResult::Success) => TestResult::Fail {
            message: format!("Expected success but got error:\n{output}"),
        },
        (ProcessOutcome::Fail { output }, ExpectedResult::Error) => {
            match_output(&output, "", &directives)
        }
        (ProcessOutcome::Timeout, _) => TestResult::Timeout,
    };

    Ok(RunTestResult {
        result,
        mode: directives.mode,
        duration: elapsed,
    })
}

/// Exact matches compare against stdout, `@contains` searches everything the process printed.
fn match_output(stdout: &str, stderr: &str, directives: &Directives) -> TestResult {
    if let Some(expected) = &directives.match_exact {
        let got = stdout.lines().collect::<Vec<_>>();
        let want = expected.lines().collect::<Vec<_>>();
        if got.len() != want.len() {
            return TestResult::Fail {
                message: format!("* Expected:\n{expected}\n* Got:\n{stdout}"),
            };
        }

        for (idx, (ln, expected_ln)) in got.iter().zip(want.iter()).enumerate() {
            if ln != expected_ln {
                return TestResult::Fail {
                    message: format!(
                        "* Line {} failed\n* Expected:\n{expected}\n* Got:\n{stdout}",
                        idx + 1
                    ),
                };
            }
        }
    }

    for expected_ln in directives.contains.iter() {
        let found = stdout
            .lines()
            .chain(stderr.lines())
            .any(|ln| ln.contains(expected_ln.as_str()));
        if !found {
            return TestResult::Fail {
                message: format!(
                    "* Expected output to contain:\n{expected_ln}\n* Got:\n{stdout}{stderr}"
                ),
            };
        }
    }

    TestResult::Pass
}

pub fn compile_lang(release: bool) -> Result<PathBuf, String> {
    println!(
        "{ORANGE}Compiling portupy{}{RESET}",
        if release { " (release)..." } else { "..." }
    );
    let mut child = Command::new("cargo")
        .arg("build")
        .arg("--package")
        .arg("portupy")
        .args(if release { vec!["--release"] } else { vec![] })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| e.to_string())?;

    let status = child.wait().map_err(|e| e.to_string())?;
    if !status.success() {
        let mut log = String::new();
        if let Some(mut stderr) = child.stderr.take() {
            let _ = stderr.read_to_string(&mut log);
        }
        return Err(format!("Build failed\n{log}"));
    }

    let profile = if release { "release" } else { "debug" };
    let exe_name = if cfg!(target_os = "windows") {
        "portupy.exe"
    } else {
        "portupy"
    };
    Ok(PathBuf::from("target").join(profile).join(exe_name))
}

fn spawn_test_process(
    cmd: &Path,
    file: &Path,
    timeout: Duration,
    mode: Mode,
) -> Result<ProcessOutcome, String> {
    let mut child = Command::new(cmd)
        .args(mode.args())
        .arg(file)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| e.to_string())?;

    let res = child.wait_timeout(timeout).map_err(|e| e.to_string())?;
    let Some(status) = res else {
        let _ = child.kill();
        let _ = child.wait();
        return Ok(ProcessOutcome::Timeout);
    };

    let mut stdout = String::new();
    let mut stderr = String::new();
    if let Some(mut out) = child.stdout.take() {
        let _ = out.read_to_string(&mut stdout);
    }
    if let Some(mut err) = child.stderr.take() {
        let _ = err.read_to_string(&mut stderr);
    }

    if status.success() {
        Ok(ProcessOutcome::Pass { stdout, stderr })
    } else {
        Ok(ProcessOutcome::Fail {
            output: format!("{stdout}{stderr}"),
        })
    }
}
