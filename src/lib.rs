pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod server;
pub mod services;

pub use config::Config;
pub use engine::{FreezeEngine, FreezeOutcome};
pub use error::{Result, SentinelError};
pub use monitor::ApprovalMonitor;
pub use server::{ApiServer, BroadcastHub};
