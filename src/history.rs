//! History listing and single-row lookup.
//!
//! Backs the `insight history` and `insight show` commands. The server
//! reads the same rows through [`crate::store`].

use anyhow::{bail, Result};

use crate::analyze::print_analysis;
use crate::config::Config;
use crate::{db, migrate, store};

/// Print the `limit` most recent analyses (default `analysis.history_limit`).
pub async fn run_history(config: &Config, limit: Option<i64>) -> Result<()> {
    let limit = limit.unwrap_or(config.analysis.history_limit);
    if limit < 1 {
        bail!("--limit must be >= 1");
    }

    let pool = db::connect(config).await?;
    migrate::create_schema(&pool).await?;
    let rows = store::recent_analyses(&pool, limit).await?;
    pool.close().await;

    if rows.is_empty() {
        println!("No analyses stored.");
        return Ok(());
    }

    println!("{:>5}  {:<14} {:<30} SUMMARY", "ID", "CATEGORY", "PERSONS");
    println!("{}", "-".repeat(100));
    for a in &rows {
        println!(
            "{:>5}  {:<14} {:<30} {}",
            a.id,
            a.category.as_deref().unwrap_or("Other"),
            clip(a.persons.as_deref().unwrap_or(""), 30),
            clip(a.summary.as_deref().unwrap_or(""), 60)
        );
    }

    Ok(())
}

/// Print one analysis. Exits with status 1 when the id is unknown.
pub async fn run_show(config: &Config, id: i64) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::create_schema(&pool).await?;
    let row = store::get_analysis(&pool, id).await?;
    pool.close().await;

    match row {
        Some(analysis) => {
            print_analysis(&analysis);
            Ok(())
        }
        None => {
            eprintln!("Error: analysis not found: {}", id);
            std::process::exit(1);
        }
    }
}

/// Shorten to `max` characters for table display, on a single line.
fn clip(s: &str, max: usize) -> String {
    let flat: String = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut)
}
