pub mod api;
pub mod hub;
pub mod websocket;

pub use api::{routes, ApiServer};
pub use hub::{BroadcastHub, BroadcastResult, Subscription};
