pub mod error;
pub mod models;
pub mod service;
pub mod stats;
pub mod store;

// Re-export commonly used types
pub use error::{ResolveError, ResolveResult};
pub use models::*;
pub use service::{IntrospectionService, RegistrationService, ResolutionService};
pub use stats::{CacheCounters, CacheStats, IndexStats};
pub use store::{EmptyStore, InMemoryStore, ModuleStore};

/// Composite trait for a full isolation container.
/// Collaborators can depend on a single trait instead of the individual surfaces.
pub trait IsolationEngine: RegistrationService + ResolutionService + IntrospectionService {}

impl<T> IsolationEngine for T where T: RegistrationService + ResolutionService + IntrospectionService {}
