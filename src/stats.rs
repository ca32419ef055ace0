//! Database statistics overview.
//!
//! Provides a quick summary of what's stored: the row count, database size
//! and a per-category breakdown. Used by `insight stats`.

use anyhow::Result;

use crate::config::Config;
use crate::{db, migrate, store};

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::create_schema(&pool).await?;

    let total = store::count_analyses(&pool).await?;
    let by_category = store::category_counts(&pool).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Insight — Database Stats");
    println!("========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Model:       {}", config.ollama.model);
    println!();
    println!("  Analyses:    {}", total);

    if !by_category.is_empty() {
        println!();
        println!("  By category:");
        println!("  {:<16} {:>6} {:>6}", "CATEGORY", "COUNT", "SHARE");
        println!("  {}", "-".repeat(30));

        for (category, count) in &by_category {
            println!(
                "  {:<16} {:>6} {:>5}%",
                category,
                count,
                percent(*count, total)
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

fn percent(part: i64, total: i64) -> i64 {
    if total > 0 {
        (part * 100) / total
    } else {
        0
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
