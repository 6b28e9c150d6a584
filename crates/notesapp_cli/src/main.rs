//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `notesapp_core` linkage.
//! - Show the backend configuration the app would start with.

use std::process::ExitCode;

fn main() -> ExitCode {
    println!("notesapp_core ping={}", notesapp_core::ping());
    println!("notesapp_core version={}", notesapp_core::core_version());

    match notesapp_core::BackendConfig::from_env() {
        Ok(config) => {
            println!("backend endpoint={}", config.endpoint);
            println!("backend project={}", config.project_id);
            println!(
                "backend collection={}/{}",
                config.database_id, config.collection_id
            );
            println!("backend timeout_secs={}", config.request_timeout.as_secs());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("backend config error: {err}");
            ExitCode::FAILURE
        }
    }
}
