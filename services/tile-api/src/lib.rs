//! Weather tile API service library.
//!
//! The binary in `main.rs` wires these modules to a listener; tests drive
//! the router directly.

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod pipeline;
pub mod state;
pub mod sweeper;

pub use config::{Args, TileServerConfig};
pub use handlers::build_router;
pub use pipeline::{CacheStatus, TilePipeline, TileResponse};
pub use state::AppState;
pub use sweeper::{CacheSweeper, SweeperConfig};
