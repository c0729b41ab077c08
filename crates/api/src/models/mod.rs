pub mod identity;
pub mod lifecycle;
pub mod resolution;
pub mod spec;

pub use identity::*;
pub use lifecycle::*;
pub use resolution::*;
pub use spec::*;
