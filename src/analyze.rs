//! The analyze operation: validate text, ask the model, store one row.
//!
//! Shared by `POST /analyze` and the `insight analyze` command.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::analyzer::{fallback_outcome, AnalyzeError, Analyzer, OllamaAnalyzer};
use crate::config::{AnalysisConfig, Config, OnModelError};
use crate::models::{Analysis, NewAnalysis};
use crate::{db, migrate, store};

/// Analyze `text` and persist the result.
///
/// The text is trimmed before analysis and stored trimmed. Nothing is
/// retried; a model failure either aborts the request or, with
/// `on_model_error = "fallback"`, stores a placeholder row.
pub async fn analyze_and_store(
    pool: &SqlitePool,
    analyzer: &dyn Analyzer,
    settings: &AnalysisConfig,
    text: &str,
) -> Result<Analysis, AnalyzeError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AnalyzeError::EmptyInput);
    }
    if text.chars().count() > settings.max_input_chars {
        return Err(AnalyzeError::InputTooLong {
            max: settings.max_input_chars,
        });
    }

    let outcome = match analyzer.analyze(text).await {
        Ok(outcome) => outcome,
        Err(e) if settings.on_model_error == OnModelError::Fallback && e.is_model_error() => {
            warn!(error = %e, "analysis failed, storing fallback result");
            fallback_outcome()
        }
        Err(e) => {
            warn!(error = %e, "analysis failed");
            return Err(e);
        }
    };

    let row = NewAnalysis::from_outcome(text, &outcome);
    let stored = store::insert_analysis(pool, &row)
        .await
        .map_err(|e| AnalyzeError::Storage(e.to_string()))?;

    info!(
        id = stored.id,
        category = %outcome.category,
        persons = outcome.persons.len(),
        "stored analysis"
    );

    Ok(stored)
}

/// CLI entry point for `insight analyze`: analyze with Ollama and print the stored row.
pub async fn run_analyze(config: &Config, text: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::create_schema(&pool).await?;

    let analyzer = OllamaAnalyzer::new(&config.ollama)?;
    let result = analyze_and_store(&pool, &analyzer, &config.analysis, text).await;
    pool.close().await;

    let analysis = result?;
    print_analysis(&analysis);
    Ok(())
}

/// Print one row in the `key: value` layout shared by `analyze` and `show`.
pub fn print_analysis(analysis: &Analysis) {
    println!("--- Analysis {} ---", analysis.id);
    println!("category: {}", analysis.category.as_deref().unwrap_or("Other"));
    println!("persons:  {}", analysis.persons.as_deref().unwrap_or(""));
    println!("summary:  {}", analysis.summary.as_deref().unwrap_or(""));
    println!();
    println!("--- Original text ---");
    println!("{}", analysis.original_text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisOutcome, Category};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FixedAnalyzer {
        result: fn() -> Result<AnalysisOutcome, AnalyzeError>,
        calls: AtomicUsize,
    }

    impl FixedAnalyzer {
        fn new(result: fn() -> Result<AnalysisOutcome, AnalyzeError>) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Analyzer for FixedAnalyzer {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn analyze(&self, _text: &str) -> Result<AnalysisOutcome, AnalyzeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn ok_outcome() -> Result<AnalysisOutcome, AnalyzeError> {
        Ok(AnalysisOutcome {
            summary: "A rocket launched.".to_string(),
            persons: vec!["Elon Musk".to_string(), "Gwynne Shotwell".to_string()],
            category: Category::Science,
        })
    }

    fn unreachable_model() -> Result<AnalysisOutcome, AnalyzeError> {
        Err(AnalyzeError::Unreachable("connection refused".to_string()))
    }

    async fn setup(tmp: &TempDir) -> SqlitePool {
        let cfg = Config::minimal(tmp.path().join("insight.db"));
        let pool = db::connect(&cfg).await.unwrap();
        migrate::create_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_stores_trimmed_text_and_outcome() {
        let tmp = TempDir::new().unwrap();
        let pool = setup(&tmp).await;
        let analyzer = FixedAnalyzer::new(ok_outcome);

        let stored = analyze_and_store(
            &pool,
            &analyzer,
            &AnalysisConfig::default(),
            "  SpaceX launched a rocket.\n",
        )
        .await
        .unwrap();

        assert_eq!(stored.original_text, "SpaceX launched a rocket.");
        assert_eq!(stored.summary.as_deref(), Some("A rocket launched."));
        assert_eq!(stored.persons.as_deref(), Some("Elon Musk, Gwynne Shotwell"));
        assert_eq!(stored.category.as_deref(), Some("Science"));

        let fetched = store::get_analysis(&pool, stored.id).await.unwrap().unwrap();
        assert_eq!(fetched, stored);
    }

    #[tokio::test]
    async fn test_empty_text_rejected_without_model_call() {
        let tmp = TempDir::new().unwrap();
        let pool = setup(&tmp).await;
        let analyzer = FixedAnalyzer::new(ok_outcome);

        let err = analyze_and_store(&pool, &analyzer, &AnalysisConfig::default(), "   \n\t")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::EmptyInput));
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store::count_analyses(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_too_long_text_rejected() {
        let tmp = TempDir::new().unwrap();
        let pool = setup(&tmp).await;
        let analyzer = FixedAnalyzer::new(ok_outcome);
        let settings = AnalysisConfig {
            max_input_chars: 5,
            ..AnalysisConfig::default()
        };

        let err = analyze_and_store(&pool, &analyzer, &settings, "abcdef")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::InputTooLong { max: 5 }));
    }

    #[tokio::test]
    async fn test_model_error_stores_nothing() {
        let tmp = TempDir::new().unwrap();
        let pool = setup(&tmp).await;
        let analyzer = FixedAnalyzer::new(unreachable_model);

        let err = analyze_and_store(&pool, &analyzer, &AnalysisConfig::default(), "text")
            .await
            .unwrap_err();
        assert!(err.is_model_error());
        assert_eq!(store::count_analyses(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fallback_mode_stores_placeholder() {
        let tmp = TempDir::new().unwrap();
        let pool = setup(&tmp).await;
        let analyzer = FixedAnalyzer::new(unreachable_model);
        let settings = AnalysisConfig {
            on_model_error: OnModelError::Fallback,
            ..AnalysisConfig::default()
        };

        let stored = analyze_and_store(&pool, &analyzer, &settings, "some article")
            .await
            .unwrap();
        assert_eq!(stored.summary.as_deref(), Some("No summary, error"));
        assert_eq!(stored.persons.as_deref(), Some("No people, error"));
        assert_eq!(stored.category.as_deref(), Some("Other"));
        assert_eq!(stored.original_text, "some article");
    }
}
