use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};

use crate::connection::Connection;
use crate::event::Event;

/// Ephemeral per-room state: live connections plus a bounded FIFO history
#[derive(Debug)]
pub(super) struct RoomState {
    pub(super) connections: HashMap<String, Connection>,
    history: VecDeque<Event>,
    capacity: usize,
    pub(super) last_activity: DateTime<Utc>,
}

impl RoomState {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            connections: HashMap::new(),
            history: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            last_activity: Utc::now(),
        }
    }

    pub(super) fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Appends to history, evicting the oldest entry once at capacity
    pub(super) fn record(&mut self, event: Event) {
        while self.history.len() >= self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(event);
    }

    /// The most recent `limit` events, oldest first, non-destructively
    pub(super) fn recent(&self, limit: usize) -> Vec<Event> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).cloned().collect()
    }

    pub(super) fn history_len(&self) -> usize {
        self.history.len()
    }
}
