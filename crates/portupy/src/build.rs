use portupy_lang::translate_reported;
use std::{fs, path::Path};
use tracing::info;

pub fn cmd(file: &Path, output: Option<&Path>, stdout: bool) -> Result<(), String> {
    let program = fs::read_to_string(file).map_err(|e| format!("Failed to read file: {}", e))?;
    let file_path = file.to_string_lossy().to_string();
    let code = translate_reported(&program, &file_path)?;

    if stdout {
        print!("{code}");
        return Ok(());
    }

    let out = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| file.with_extension("py"));
    fs::write(&out, code)
        .map_err(|e| format!("Failed to write {}: {}", out.display(), e))?;
    info!(output = %out.display(), "wrote translation");
    println!("Translated {} -> {}", file.display(), out.display());
    Ok(())
}
