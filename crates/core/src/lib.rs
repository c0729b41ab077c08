pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod logging;
pub mod registry;
pub mod resolver;
pub mod visibility;

pub use config::{CacheConfig, DenyMode, IsolationConfig};
pub use engine::{ContainerBuilder, IsolationContainer, IsolationHandle};
pub use error::{BulkheadError, Result};
