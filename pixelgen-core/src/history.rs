//! Recent-topic exclusion history.
//!
//! A sliding window of the last topics the topic model produced. It is fed
//! back into prompt diversification so the model is told what not to repeat.
//! Lives for the lifetime of the process and is never persisted.

use std::collections::VecDeque;

/// Maximum number of topics remembered.
pub const MAX_RECENT_TOPICS: usize = 50;

/// Bounded FIFO of recently generated topics, oldest first.
#[derive(Debug, Clone)]
pub struct TopicHistory {
    topics: VecDeque<String>,
    capacity: usize,
}

impl TopicHistory {
    /// Create an empty history holding up to [`MAX_RECENT_TOPICS`].
    pub fn new() -> Self {
        Self::with_capacity(MAX_RECENT_TOPICS)
    }

    /// Create an empty history with a custom bound.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: VecDeque::with_capacity(capacity.saturating_add(1)),
            capacity,
        }
    }

    /// Record a topic, evicting the oldest entries past the bound.
    pub fn push(&mut self, topic: impl Into<String>) {
        self.topics.push_back(topic.into());
        self.trim();
    }

    /// Topics oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }

    /// The most recently recorded topic.
    pub fn latest(&self) -> Option<&str> {
        self.topics.back().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn trim(&mut self) {
        while self.topics.len() > self.capacity {
            self.topics.pop_front();
        }
    }
}

impl Default for TopicHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_creation() {
        let history = TopicHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), MAX_RECENT_TOPICS);
        assert_eq!(history.latest(), None);
    }

    #[test]
    fn test_push_keeps_order() {
        let mut history = TopicHistory::new();
        history.push("red dragon in snowy cave");
        history.push("spaceship over mars");

        let topics: Vec<_> = history.iter().collect();
        assert_eq!(topics, vec!["red dragon in snowy cave", "spaceship over mars"]);
        assert_eq!(history.latest(), Some("spaceship over mars"));
    }

    #[test]
    fn test_trim_history() {
        let mut history = TopicHistory::new();

        for i in 0..70 {
            history.push(format!("topic {i}"));
            assert!(history.len() <= MAX_RECENT_TOPICS);
        }

        assert_eq!(history.len(), MAX_RECENT_TOPICS);
        assert_eq!(history.iter().next(), Some("topic 20"));
        assert_eq!(history.latest(), Some("topic 69"));
    }

    #[test]
    fn test_zero_capacity_holds_nothing() {
        let mut history = TopicHistory::with_capacity(0);
        history.push("anything");
        assert!(history.is_empty());
    }
}
