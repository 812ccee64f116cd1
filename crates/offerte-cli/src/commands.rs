use std::io;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{Value, json};
use tokio::io::BufReader;

use offerte_cli::config::AppConfig;
use offerte_cli::session::{SessionReport, run_session};
use offerte_interaction::relative_time;
use offerte_store::{FilePersister, ScopedStore, load_document, load_document_optional};

use crate::cli::{DocumentArgs, FlagsCommand};
use crate::summary::print_flags;

pub fn run_edit(args: &DocumentArgs, config: &AppConfig) -> Result<SessionReport> {
    let initial = match load_document_optional::<Value>(&args.document)
        .with_context(|| format!("Failed to open {}", args.document.display()))?
    {
        Some(document) => {
            tracing::info!(
                "Editing {} (saved {})",
                args.document.display(),
                document.saved_at
            );
            document.data
        }
        None => {
            tracing::info!("Starting new document {}", args.document.display());
            json!({})
        }
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(async {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = io::stdout();
        run_session(
            stdin,
            &mut stdout,
            initial,
            FilePersister::new(&args.document),
            config.autosave.clone(),
        )
        .await
    })
}

pub fn run_show(args: &DocumentArgs) -> Result<()> {
    let document = load_document::<Value>(&args.document)
        .map_err(|error| anyhow::anyhow!("{}", error.user_message()))?;
    println!("{}", serde_json::to_string_pretty(&document.data)?);
    println!(
        "Saved: {} ({})",
        document.saved_at.format("%Y-%m-%d %H:%M:%S UTC"),
        relative_time(document.saved_at, Utc::now())
    );
    Ok(())
}

pub fn run_flags(command: &FlagsCommand, config: &AppConfig) -> Result<()> {
    let path = config.flags_path();
    let mut store = ScopedStore::open(&path)
        .with_context(|| format!("Failed to open flags at {}", path.display()))?;

    match command {
        FlagsCommand::List => print_flags(&store),
        FlagsCommand::Get { name } => println!("{}", store.flag(name)),
        FlagsCommand::Set { name, value } => {
            store.set_flag(name, value.unwrap_or(true))?;
        }
        FlagsCommand::Clear { name } => {
            if !store.remove(name)? {
                tracing::info!("Flag {name} was not set");
            }
        }
    }
    Ok(())
}
