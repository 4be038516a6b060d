pub mod config;
pub mod error;
pub mod location;

pub use config::{ConfigError, NodeConfig};
pub use error::{NameplateError, Result};
pub use location::{BarrierLocation, ChannelLocation, Location};
