//! Help message display for CLI.

#![allow(clippy::print_stdout)]

use crate::config::{Config, config_file_path};

/// Print a short usage reminder when no inputs were given.
///
/// Points first-time users at `config init` when no configuration file
/// exists yet.
pub fn print_smart_help(config: &Config) {
    let has_config_file = config_file_path().is_ok_and(|p| p.exists());
    for line in help_lines(config, has_config_file) {
        println!("{line}");
    }
}

fn help_lines(config: &Config, has_config_file: bool) -> Vec<String> {
    let mut lines = vec![
        "Usage: fpembed [FILES]... [OPTIONS]".to_string(),
        String::new(),
        format!(
            "Server: {}  Model: {}  Chunk size: {}",
            config.server.url, config.server.model, config.batching.chunk_size
        ),
        String::new(),
        "Example: fpembed recording.wav -s localhost:8000 -f json,csv".to_string(),
    ];

    if !has_config_file {
        lines.push(String::new());
        lines.push("No configuration file found; built-in defaults are in use.".to_string());
        lines.push("Run 'fpembed config init' to create one.".to_string());
    }

    lines.push(String::new());
    lines.push("Run 'fpembed -h' for all options or 'fpembed health' to check the server.".to_string());
    lines
}
