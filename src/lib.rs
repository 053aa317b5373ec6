//! # attention-viz
//!
//! Streaming engine behind a live token-attention graph: it debounces input,
//! consumes the analysis backend's event stream, filters tokens, lays them out
//! on a circle, picks the strongest attention edges and keeps three views
//! (token chips, graph, relationship list) highlighted in lockstep.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use attention_viz::backend::HttpBackend;
//! use attention_viz::config::VizConfig;
//! use attention_viz::session::{DriverInput, SessionController, SessionDriver};
//! use tokio::sync::mpsc;
//!
//! # async fn demo() {
//! let config = VizConfig::default();
//! let backend = Arc::new(HttpBackend::from_config("http://localhost:5000", &config));
//! let driver = SessionDriver::new(SessionController::new(config), backend);
//!
//! let (input_tx, input_rx) = mpsc::unbounded_channel();
//! let (event_tx, mut event_rx) = mpsc::unbounded_channel();
//! tokio::spawn(driver.run(input_rx, event_tx));
//!
//! input_tx.send(DriverInput::TextChanged("The cat chased the mouse.".into())).ok();
//! while let Some(event) = event_rx.recv().await {
//!     println!("{}", serde_json::to_string(&event).unwrap_or_default());
//! }
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Tokens, attention matrix, wire messages, host events |
//! | [`config`] | `VizConfig` and the named thresholds and limits |
//! | [`classifier`] | Meaningful-token filter |
//! | [`layout`] | Deterministic circular layout with a safe-radius fallback |
//! | [`selection`] | Top-K connection selector and relationship list builder |
//! | [`stream`] | Incremental `data:` frame decoder and stream consumer |
//! | [`backend`] | `AnalysisBackend` trait and the reqwest implementation |
//! | [`session`] | Session state machine and its single-owner async driver |
//! | [`render`] | Drawable primitives, strength palette, SVG export |
//! | [`highlight`] | Cross-view highlighter and delegated pointer dispatch |
//! | [`error`] | `VizError` with thiserror |

pub mod backend;
pub mod classifier;
pub mod config;
pub mod error;
pub mod highlight;
pub mod layout;
pub mod render;
pub mod selection;
pub mod session;
pub mod stream;
pub mod types;

pub use error::{VizError, VizResult};
pub use types::*;
