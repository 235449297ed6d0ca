//! Kodegen Bundler Layer - layer archive bundler for Python libraries.
//!
//! This binary packages a Python library with its full dependency closure
//! into a zip archive for a function platform layer, then refreshes the
//! library in the active environment.

use kodegen_bundler_layer::cli::{self, OutputManager};
use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Run CLI and get exit code
    let exit_code = match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            let output = OutputManager::new(false, false);
            let _ = output.error(&e.to_string());
            for suggestion in e.recovery_suggestions() {
                let _ = output.error(&format!("  hint: {suggestion}"));
            }
            e.exit_code()
        }
    };

    process::exit(exit_code);
}
