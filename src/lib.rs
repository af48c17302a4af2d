//! arbitrex - cross-venue prediction-market arbitrage opportunity engine.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── market/      # shared data model: Market, Outcome, MarketKey
//! ├── normalize/    # outcome-label normalization (YES/NO/OTHER)
//! ├── matcher/      # cross-venue market identity matching
//! ├── linker/       # persistent manual/discovered equivalence graph
//! ├── cache/        # bounded LRU+TTL cache with single-flight compute
//! ├── scorer/       # opportunity scoring, sizing, slippage, Kelly
//! ├── risk/         # execution/timing/platform/liquidity/correlation risk
//! ├── breaker/      # layered circuit breaker / safety gate
//! ├── features/     # optional rolling tick/orderbook signal collaborator
//! ├── analytics/    # discovery/outcome/platform-pair recording & queries
//! ├── opportunity.rs # Opportunity lifecycle domain type
//! ├── ports/        # external capability traits (MarketFeed, Store, ...)
//! ├── store/         # Store adapters: in-memory, sqlite
//! ├── feed/          # MarketFeed adapters: mock, http-polling
//! ├── engine/        # orchestrates scan cycles, realtime updates, lifecycle
//! ├── app/           # config loading, logging init, wiring
//! └── cli/           # operator CLI
//! ```
//!
//! The engine never talks to a venue SDK, a wallet, or a concrete database
//! directly: it consumes the [`ports`] traits, and the `store`/`feed` modules
//! are example adapters a deployment can swap out.

pub mod analytics;
pub mod app;
pub mod breaker;
pub mod cache;
pub mod cli;
pub mod engine;
pub mod error;
pub mod features;
pub mod feed;
pub mod linker;
pub mod market;
pub mod matcher;
pub mod normalize;
pub mod opportunity;
pub mod ports;
pub mod risk;
pub mod scorer;
pub mod store;

pub use error::{Error, Result};
