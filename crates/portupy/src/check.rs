use portupy_lang::check_reported;
use std::{fs, path::Path};
use tracing::info;

pub fn cmd(file: &Path) -> Result<(), String> {
    let program = fs::read_to_string(file).map_err(|e| format!("Failed to read file: {}", e))?;
    let file_path = file.to_string_lossy().to_string();
    let checked = check_reported(&program, &file_path)?;
    info!(
        stmts = checked.program.stmts.len(),
        bindings = checked.analysis.bindings().len(),
        "checked {file_path}"
    );
    println!("File checked successfully");
    Ok(())
}
