//! formation_viewer — interactive entry point.
//!
//! ```text
//! formation_viewer [--config <path>] [--quick]
//! ```

use std::path::PathBuf;

use formation_viewer::app::{load_config, run};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          Formation Viewer — gesture-driven particles         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("  Mode: keyboard + mouse simulation");
    println!();

    let path = config_path();
    match &path {
        Some(path) => println!("  Config: {}\n", path.display()),
        None       => println!("  Quick-start: default formation and tuning\n"),
    }

    let result = load_config(path.as_deref()).and_then(|cfg| {
        println!("  Opening preview window…");
        println!();
        run(cfg)
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// `--config <path>` wins; `--quick` or no flag means defaults.
fn config_path() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => return args.next().map(PathBuf::from),
            "--quick"  => return None,
            _ => {}
        }
    }
    None
}
