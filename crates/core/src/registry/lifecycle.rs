use super::ConsumerRecord;
use bulkhead_api::{ConsumerState, ResolveError, ResolveResult};

impl ConsumerRecord {
    pub fn state(&self) -> ConsumerState {
        *self.state.lock()
    }

    /// Move to `next`, returning the previous state.
    pub fn transition(&self, next: ConsumerState) -> ResolveResult<ConsumerState> {
        let mut state = self.state.lock();
        let from = *state;
        if !from.can_transition_to(next) {
            return Err(ResolveError::InvalidTransition {
                consumer: self.id.to_string(),
                from,
                to: next,
            });
        }
        *state = next;
        tracing::debug!("Consumer {} moved {} -> {}", self.id, from, next);
        Ok(from)
    }

    pub(super) fn force_state(&self, next: ConsumerState) {
        *self.state.lock() = next;
    }
}
