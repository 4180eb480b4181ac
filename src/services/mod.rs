//! Services Layer
//!
//! The screening pipeline, one service per stage. Services are stateless and
//! take the `AppState` explicitly; the CLI and library callers both go
//! through them.
//!
//! # Architecture
//!
//! ```text
//! CLI / library --> OptionsService ──┬──> QuotesService ──┐
//!                                    ├──> ChainService ───┼──> MarketDataGateway
//!                                    └──> expiry dates ───┘
//! BatchService --> OptionsService (per ticker, bounded pool)
//! ```
//!
//! # Services
//!
//! - `QuotesService` - Market snapshot and mid-price
//! - `ChainService` - Option chain fetch and strike pruning
//! - `OptionsService` - Single-ticker screening pipeline
//! - `BatchService` - Multi-ticker screening with range pre-filter

pub mod retry;
pub mod strike_window;
pub mod expiry_selector;
pub mod metrics;
pub mod filter_cascade;
pub mod quotes_service;
pub mod chain_service;
pub mod options_service;
pub mod batch_service;

// Re-export commonly used types and services
pub use retry::{with_retry, RetryPolicy};
pub use strike_window::{StrikeWindow, ALLOWED_INCREMENTS};
pub use filter_cascade::{CascadeReport, FilterStage, StageReport, Thresholds};
pub use quotes_service::QuotesService;
pub use chain_service::ChainService;
pub use options_service::{OptionsScreen, OptionsService};
pub use batch_service::{BatchOutcome, BatchRow, BatchService, Universe, UniverseEntry};
