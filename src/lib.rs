pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod library;
pub mod machine;
pub mod model;
pub mod playlist;
pub mod playlist_store;
pub mod transport;

pub use crate::error::{BackendError, PlayerError};
pub use crate::transport::{PlayerStatus, TransportController};
