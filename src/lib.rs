//! # Insight
//!
//! A small local-first text analysis service. Paste an article into the web
//! form and Insight asks a local Ollama model for a summary, the people it
//! mentions and a category, stores the result in SQLite, and shows or
//! exports the accumulated history.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────────┐   ┌──────────┐
//! │ Browser  │──▶│  /analyze │──▶│ Ollama       │──▶│  Reply   │
//! │ form     │   │  handler  │   │ /api/generate│   │  parser  │
//! └──────────┘   └──────────┘   └──────────────┘   └────┬─────┘
//!                                                       ▼
//!                    ┌──────────┐                  ┌──────────┐
//!                    │ / export │◀─────────────────│  SQLite  │
//!                    │ HTML/JSON│                  │ analyses │
//!                    └──────────┘                  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! insight init                         # create database
//! insight serve                        # start the web app
//! insight analyze --file article.txt   # one-off analysis from the CLI
//! insight export --output out.json     # dump every analysis
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`analyzer`] | Prompt, Ollama client, reply parsing |
//! | [`analyze`] | Validate, analyze and store one text |
//! | [`store`] | Insert and read rows |
//! | [`render`] | HTML page |
//! | [`server`] | HTTP server |
//! | [`export`] | JSON export |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod analyze;
pub mod analyzer;
pub mod config;
pub mod db;
pub mod export;
pub mod history;
pub mod migrate;
pub mod models;
pub mod render;
pub mod server;
pub mod stats;
pub mod store;
