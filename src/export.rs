//! Export stored analyses as JSON.
//!
//! The same array is served by `GET /export` and written by
//! `insight export`, either to a file or to stdout for piping.

use anyhow::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::Path;

use crate::config::Config;
use crate::{db, migrate, store};

/// One exported row.
#[derive(Debug, Serialize)]
pub struct ExportRow {
    pub id: i64,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub persons: Option<String>,
    pub original_text: String,
}

/// Every stored analysis, oldest first.
pub async fn export_rows(pool: &SqlitePool) -> Result<Vec<ExportRow>> {
    let rows = store::all_analyses(pool).await?;
    Ok(rows
        .into_iter()
        .map(|a| ExportRow {
            id: a.id,
            summary: a.summary,
            category: a.category,
            persons: a.persons,
            original_text: a.original_text,
        })
        .collect())
}

/// Export all analyses as JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout.
pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::create_schema(&pool).await?;
    let rows = export_rows(&pool).await?;
    pool.close().await;

    let count = rows.len();
    let json = serde_json::to_string_pretty(&rows)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, &json)?;
            eprintln!("Exported {} analyses to {}", count, path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}
