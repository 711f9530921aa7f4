//! # flowlens-core
//!
//! Core library for flowlens - action recording and session mining for a
//! Flow → Plan → Task tracking engine.
//!
//! This library provides:
//! - A non-blocking action recorder writing append-only per-flow JSONL logs
//! - Instrumentation wrappers for the engine's state-mutating operations
//! - Session reconstruction, pattern mining, and inefficiency analysis
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! The write path is fire-and-forget; the read path runs on demand:
//!
//! ```text
//! InstrumentedEngine ─► Instrumentor ─► AsyncRecorder ─► ActionLogStore
//!                                        (worker thread)      │
//!                                                             ▼
//!                    Recommendations ◄─ Signals/Patterns ◄─ Sessions
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flowlens_core::{ActionLogStore, Config};
//! use flowlens_core::recorder::AsyncRecorder;
//! use flowlens_core::instrument::InstrumentedEngine;
//! use flowlens_core::analysis::generate_report;
//!
//! # fn main() -> flowlens_core::Result<()> {
//! let config = Config::load()?;
//! let store = ActionLogStore::open_default();
//! let recorder = Arc::new(AsyncRecorder::start(&config.recorder, store.clone())?);
//!
//! let engine = InstrumentedEngine::new(recorder.clone(), config.recorder.payload_cap_bytes);
//! let flow = engine.create_flow("demo")?;
//! engine.create_task(&flow.id, None, "write docs")?;
//!
//! recorder.shutdown();
//! let report = generate_report(&store, &flow.id, &config.analysis)?;
//! println!("{} sessions", report.sessions.len());
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use store::ActionLogStore;
pub use types::*;

// Public modules
pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod instrument;
pub mod logging;
pub mod recorder;
pub mod store;
pub mod types;
