pub mod chain;
pub mod connection;
pub mod contracts;
pub mod credential;
pub mod freezer;
pub mod token;

pub use chain::{decode_approval, ChainEventSource};
pub use connection::ChainConnection;
pub use credential::{SecretKey, SigningCredential};
pub use freezer::{ChainFreezer, FreezeExecutor};
pub use token::{TokenContract, TokenReader};
