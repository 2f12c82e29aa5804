//! Azure Pricing Domain
//!
//! Retrieval and resolution engine over the public Azure Retail Prices API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │    Tools     │  ← Named entry points, argument sanitizing, rendering
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │   Service    │  ← Search, comparison, estimates, discovery
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │ PriceSource  │  ← Upstream client (trait + HTTP implementation)
//! └──────────────┘
//! ```
//!
//! Each tool call opens its own [`AzurePricingClient`] session and releases it
//! when the call finishes. Nothing is cached between calls.

pub mod client;
pub mod compare;
pub mod config;
pub mod discovery;
pub mod error;
pub mod estimate;
pub mod filter;
pub mod metrics;
pub mod models;
pub mod recommend;
pub mod render;
pub mod reservation;
pub mod resolver;
pub mod retry;
pub mod service;
pub mod tools;

// Re-export commonly used types
pub use client::{AzurePricingClient, PriceQuery, PriceSource};
pub use compare::{CompareRequest, ComparisonResult, ComparisonRow, ComparisonType, SkipReason};
pub use config::PricingConfig;
pub use discovery::{DiscoveryResult, MatchType, SkuCatalog};
pub use error::{PricingError, PricingResult};
pub use estimate::{CostEstimate, EstimateRequest};
pub use models::{PricePage, PriceRow, ResultEnvelope, SearchCriteria};
pub use resolver::{NormalizedSkuTerm, normalize_sku, resolve_service};
pub use service::PricingService;
pub use tools::{Tool, ToolOutput, dispatch, handle_tool_call, sanitize_arguments};
