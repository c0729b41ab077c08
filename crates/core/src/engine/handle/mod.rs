use super::IsolationContainer;
use std::sync::Arc;

mod introspection;
mod registration;
mod resolution;

/// Shareable handle implementing the collaborator-facing service traits.
#[derive(Clone)]
pub struct IsolationHandle {
    pub(crate) container: Arc<IsolationContainer>,
}

impl IsolationHandle {
    pub fn new(container: IsolationContainer) -> Self {
        Self {
            container: Arc::new(container),
        }
    }

    pub fn container(&self) -> &Arc<IsolationContainer> {
        &self.container
    }
}
