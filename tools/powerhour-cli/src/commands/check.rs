//! Check for the external tools.

use powerhour_common::config::config_file_path;
use powerhour_common::error::PowerHourError;
use powerhour_render_engine::command_exists;

pub fn run() -> anyhow::Result<()> {
    println!("Power Hour System Check");
    println!("{}", "=".repeat(50));

    let mut missing = Vec::new();
    for tool in ["ffmpeg", "ffprobe"] {
        if command_exists(tool) {
            println!("[OK] {tool} found");
        } else {
            println!("[MISSING] {tool} not found in PATH");
            missing.push(tool);
        }
    }

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[INFO] Config: defaults ({} not present)", config_path.display());
    }

    println!();
    if missing.is_empty() {
        println!("All external tools are available. `powerhour build` is ready.");
        Ok(())
    } else {
        println!("`powerhour embed` works without them; `plan` and `build` do not.");
        Err(PowerHourError::unsupported(format!("missing: {}", missing.join(", "))).into())
    }
}
