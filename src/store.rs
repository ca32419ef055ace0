//! Read and insert access to the `analyses` table.
//!
//! There is no update or delete here: a row is written once by
//! [`insert_analysis`] and only read afterwards.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{Analysis, NewAnalysis};

const COLUMNS: &str = "id, original_text, summary, persons, category";

fn row_to_analysis(row: &SqliteRow) -> Analysis {
    Analysis {
        id: row.get("id"),
        original_text: row.get("original_text"),
        summary: row.get("summary"),
        persons: row.get("persons"),
        category: row.get("category"),
    }
}

/// Insert a new row and return it with its assigned id.
pub async fn insert_analysis(pool: &SqlitePool, new: &NewAnalysis) -> Result<Analysis> {
    let result = sqlx::query(
        "INSERT INTO analyses (original_text, summary, persons, category) VALUES (?, ?, ?, ?)",
    )
    .bind(&new.original_text)
    .bind(&new.summary)
    .bind(&new.persons)
    .bind(&new.category)
    .execute(pool)
    .await?;

    Ok(Analysis {
        id: result.last_insert_rowid(),
        original_text: new.original_text.clone(),
        summary: Some(new.summary.clone()),
        persons: Some(new.persons.clone()),
        category: Some(new.category.clone()),
    })
}

/// The `limit` most recent rows, newest first.
pub async fn recent_analyses(pool: &SqlitePool, limit: i64) -> Result<Vec<Analysis>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM analyses ORDER BY id DESC LIMIT ?",
        COLUMNS
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_analysis).collect())
}

/// Every row, oldest first.
pub async fn all_analyses(pool: &SqlitePool) -> Result<Vec<Analysis>> {
    let rows = sqlx::query(&format!("SELECT {} FROM analyses ORDER BY id ASC", COLUMNS))
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(row_to_analysis).collect())
}

pub async fn get_analysis(pool: &SqlitePool, id: i64) -> Result<Option<Analysis>> {
    let row = sqlx::query(&format!("SELECT {} FROM analyses WHERE id = ?", COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(row_to_analysis))
}

pub async fn count_analyses(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analyses")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Row counts per category label, largest first.
pub async fn category_counts(pool: &SqlitePool) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query(
        r#"
        SELECT COALESCE(category, 'Other') AS category, COUNT(*) AS n
        FROM analyses
        GROUP BY COALESCE(category, 'Other')
        ORDER BY n DESC, category ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| (row.get("category"), row.get("n")))
        .collect())
}
