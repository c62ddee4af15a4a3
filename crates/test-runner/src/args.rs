use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct RunnerArgs {
    pub root: PathBuf,
    pub timeout_ms: u64,
    pub quiet: bool,
    pub release: bool,
    pub file: Option<PathBuf>,
}

impl RunnerArgs {
    pub fn new() -> Result<Self, String> {
        let args = std::env::args().collect::<Vec<String>>();
        let (root, file) = parse_root_file(&args)?;
        Ok(Self {
            root,
            timeout_ms: parse_timeout(&args)?,
            quiet: has_flag(&args, "--quiet"),
            release: has_flag(&args, "--release"),
            file,
        })
    }
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

fn parse_timeout(args: &[String]) -> Result<u64, String> {
    let Some(value) = args
        .iter()
        .position(|arg| arg == "--timeout")
        .and_then(|i| args.get(i + 1))
    else {
        return Ok(5000);
    };
    value
        .parse::<u64>()
        .map_err(|_| format!("Invalid --timeout value '{value}', expected milliseconds"))
}

fn parse_root_file(args: &[String]) -> Result<(PathBuf, Option<PathBuf>), String> {
    let usage = || "Provide a directory or a .ptg file as first argument".to_string();
    let first = args.get(1).filter(|arg| !arg.starts_with("--")).ok_or_else(usage)?;

    let path = Path::new(first);
    if path.is_dir() {
        return Ok((path.to_path_buf(), None));
    }

    if path.is_file() {
        let root = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        return Ok((root, Some(path.to_path_buf())));
    }

    Err(usage())
}
