use serde_json::Value;

#[derive(Default)]
pub struct EventQueue {
    // Events of the mirror in order of occurrence.
    _events: Vec<Value>,
}

impl EventQueue {
    /// Create a new instance of the event queue.
    ///
    /// # Returns
    /// New instance of the event queue.
    pub fn new() -> Self {
        Self {
            _events: Vec::new(),
        }
    }

    /// Check if there are any events to publish.
    pub fn has_event(&self) -> bool {
        !self._events.is_empty()
    }

    /// Add an event.
    pub fn add_event(&mut self, event: Value) {
        self._events.push(event);
    }

    /// Get the latest event with the ID.
    ///
    /// # Arguments
    /// * `id` - Event ID.
    ///
    /// # Returns
    /// Latest event if any.
    pub fn get_latest_event(&self, id: &str) -> Option<&Value> {
        self._events.iter().rev().find(|event| event["id"] == id)
    }

    /// Get the events and clear the internal events.
    ///
    /// # Returns
    /// Events.
    pub fn get_events_and_clear(&mut self) -> Vec<Value> {
        std::mem::take(&mut self._events)
    }
}
