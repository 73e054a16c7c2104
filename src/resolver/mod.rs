//! Server-side media resolution
//!
//! ## Key Components
//!
//! - [`BackendAdapter`] - one strategy turning a content id into a [`Candidate`]
//! - [`PhaseChain`] - runs the adapters in reliability order, first success wins
//! - [`FleetRacer`] - races a bounded, shuffled subset of mirror endpoints
//! - [`formats`] - stream models and the per-backend selection policies
//!
//! ## Example
//!
//! ```rust,ignore
//! use tunebox::resolver::{MediaKind, PhaseChain};
//!
//! let chain = PhaseChain::from_config(&config, &config.mirror_table(), http, metrics);
//! let candidate = chain.resolve("dQw4w9WgXcQ", MediaKind::Audio).await?;
//! ```

pub mod adapters;
mod chain;
mod fleet;
pub mod formats;
mod traits;
mod types;

pub use chain::{ChainError, ChainRun, PhaseChain, PhaseReport};
pub use fleet::{FleetRacer, RaceOutcome};
pub use traits::{AdapterError, BackendAdapter};
pub use types::{
    BackendKind, Candidate, MediaKind, MediaRequest, MirrorClass, MirrorEndpoint, Mode,
    ParseKindError, PhaseOutcome,
};
