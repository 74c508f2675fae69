//! docsort: watch-folder PDF classifier.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use docsort_core::DocSortConfig;
use docsort_server::cli::{self, CategoryCommand};
use docsort_server::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("DOCSORT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("serve");

    if matches!(command, "--help" | "-h" | "help") {
        cli::print_help();
        return Ok(());
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());
    let config = DocSortConfig::from_env(&data_dir)?;

    match command {
        "search" => {
            let query = args[2..].join(" ");
            cli::search(&config, &query)
        }
        "categories" => match CategoryCommand::parse(&args[2..]) {
            Ok(cmd) => cli::categories(&config, cmd),
            Err(usage) => {
                eprintln!("{}", usage);
                std::process::exit(1);
            }
        },
        "pending" => {
            let state = AppState::new(config)?;
            cli::pending(&state)
        }
        "classify" => {
            if args.len() < 4 {
                eprintln!("Usage: docsort classify <file> <category>");
                std::process::exit(1);
            }
            let state = AppState::new(config)?;
            cli::classify(&state, &args[2], &args[3]).await
        }
        "watch" => {
            let state = Arc::new(AppState::new(config)?);
            cli::watch(state).await
        }
        "serve" => {
            let state = Arc::new(AppState::new(config)?);
            cli::serve(state).await
        }
        other => {
            eprintln!("Unknown command: {}. Use 'docsort help' for usage.", other);
            std::process::exit(1);
        }
    }
}
