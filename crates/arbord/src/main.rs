//! Command-line entry point: loads configuration and assembles the directory.

use std::process::ExitCode;
use std::sync::Arc;

use arbord::{
    ConfigLoader, FileConfigLoader, StaticConfigLoader, StructuredHealthReporter, bootstrap_with,
};

const CONFIG_ENV: &str = "ARBORD_CONFIG";

fn main() -> ExitCode {
    let path = std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os(CONFIG_ENV));
    let loader: Box<dyn ConfigLoader> = match path {
        Some(config_path) => Box::new(FileConfigLoader::new(config_path)),
        None => Box::new(StaticConfigLoader::default()),
    };
    match bootstrap_with(loader.as_ref(), Arc::new(StructuredHealthReporter::new())) {
        Ok(directory) => {
            let suffixes = directory
                .service()
                .nexus()
                .list_suffixes()
                .unwrap_or_default();
            tracing::info!(
                target: "arbord::main",
                suffixes = ?suffixes.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "directory ready"
            );
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}
