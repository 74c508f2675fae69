//! Command-line subcommands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::info;

use docsort_core::{CategoryStore, DocSortConfig, Outcome};
use docsort_store::{DocumentIndex, DocumentRecord};

use crate::routes;
use crate::state::AppState;

/// `docsort categories ...` actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryCommand {
    List,
    Add { name: String, folder: Option<PathBuf> },
    Rename { old: String, new: String },
    Delete { name: String },
    Folder { name: String, folder: Option<PathBuf> },
}

impl CategoryCommand {
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let arg = |i: usize| args.get(i).cloned();
        match args.first().map(String::as_str) {
            None | Some("list") => Ok(Self::List),
            Some("add") => match arg(1) {
                Some(name) => Ok(Self::Add {
                    name,
                    folder: arg(2).map(PathBuf::from),
                }),
                None => Err("Usage: docsort categories add <name> [folder]".into()),
            },
            Some("rename") => match (arg(1), arg(2)) {
                (Some(old), Some(new)) => Ok(Self::Rename { old, new }),
                _ => Err("Usage: docsort categories rename <old> <new>".into()),
            },
            Some("delete") => match arg(1) {
                Some(name) => Ok(Self::Delete { name }),
                None => Err("Usage: docsort categories delete <name>".into()),
            },
            Some("folder") => match arg(1) {
                Some(name) => Ok(Self::Folder {
                    name,
                    folder: arg(2).map(PathBuf::from),
                }),
                None => Err("Usage: docsort categories folder <name> [folder]".into()),
            },
            Some(other) => Err(format!("Unknown categories action: {}", other)),
        }
    }
}

/// One search hit as printed by `docsort search`.
pub fn format_document(record: &DocumentRecord) -> String {
    format!(
        "{} -> {}: {}",
        record.category, record.filename, record.summary
    )
}

pub fn print_help() {
    println!("docsort: watch-folder PDF classifier");
    println!();
    println!("Usage: docsort [command]");
    println!();
    println!("Commands:");
    println!("  serve (default)              Watch the input folder and serve the HTTP API");
    println!("  watch                        Watch the input folder only");
    println!("  search <query>               Search indexed documents");
    println!("  pending                      List documents waiting in the holding folder");
    println!("  classify <file> <category>   File a pending document manually");
    println!("  categories [list]            List categories");
    println!("  categories add <name> [dir]  Add a category (optional output folder)");
    println!("  categories rename <old> <new>");
    println!("  categories delete <name>");
    println!("  categories folder <name> [dir]  Set or clear a category's output folder");
    println!("  help                         Show this help message");
}

pub fn search(config: &DocSortConfig, query: &str) -> anyhow::Result<()> {
    let index = DocumentIndex::open(&config.data_paths.index)?;
    let hits = index.search(query)?;
    if hits.is_empty() {
        println!("No documents found.");
    }
    for record in &hits {
        println!("{}", format_document(record));
    }
    Ok(())
}

pub fn categories(config: &DocSortConfig, command: CategoryCommand) -> anyhow::Result<()> {
    let store = CategoryStore::load(&config.data_paths.categories_file)?;
    match command {
        CategoryCommand::List => {}
        CategoryCommand::Add { name, folder } => {
            store.add(&name, folder)?;
        }
        CategoryCommand::Rename { old, new } => {
            store.rename(&old, &new)?;
        }
        CategoryCommand::Delete { name } => {
            store.delete(&name)?;
        }
        CategoryCommand::Folder { name, folder } => {
            store.set_folder(&name, folder)?;
        }
    }

    for category in store.snapshot().categories() {
        match &category.folder {
            Some(folder) => println!("{} ({})", category.name, folder.display()),
            None => println!("{}", category.name),
        }
    }
    Ok(())
}

pub fn pending(state: &AppState) -> anyhow::Result<()> {
    let pending = state.review.list_pending()?;
    if pending.is_empty() {
        println!("Nothing pending in {}", state.pipeline.filing().holding_dir().display());
    }
    for name in pending {
        println!("{}", name);
    }
    Ok(())
}

pub async fn classify(state: &AppState, filename: &str, category: &str) -> anyhow::Result<()> {
    let event = state.review.classify_manually(filename, category).await?;
    println!("{}", event.message);
    if event.outcome == Outcome::Failed {
        bail!("{} was not filed", filename);
    }
    Ok(())
}

pub async fn watch(state: Arc<AppState>) -> anyhow::Result<()> {
    state.watch.start()?;
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    state.watch.stop();
    Ok(())
}

pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    state.watch.start()?;

    let app = routes::build_router(Arc::clone(&state));
    let addr = format!("0.0.0.0:{}", state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("docsort listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    state.watch.stop();
    Ok(())
}
