//! In-memory connector — a scripted FIFO source.

use async_trait::async_trait;
use rapport_core::{
    error::RapportError,
    message::LiveMessage,
    traits::{Connector, PollFilter},
};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Connector backed by an in-process queue. Messages are seeded with
/// [`InMemoryConnector::push`] and drained by the next poll.
pub struct InMemoryConnector {
    name: String,
    queue: Mutex<VecDeque<LiveMessage>>,
}

impl InMemoryConnector {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Seed a message for the next poll cycle.
    pub fn push(&self, message: LiveMessage) {
        let mut queue = match self.queue.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        queue.push_back(message);
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn poll_new_messages(
        &self,
        filter: &PollFilter,
    ) -> Result<Vec<LiveMessage>, RapportError> {
        let drained: Vec<LiveMessage> = {
            let mut queue = match self.queue.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            queue.drain(..).collect()
        };
        Ok(drained.into_iter().filter(|m| filter.matches(m)).collect())
    }
}
