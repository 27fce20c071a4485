//! Per-run pipeline context
//!
//! Holds the shared state, the event log and token usage for one run. Stages
//! receive it by `&mut`, one at a time.

use crate::event::{Event, EventKind};
use crate::provider::UsageTracker;
use crate::state::PipelineState;

type EventListener = Box<dyn Fn(&Event) + Send + Sync>;

pub struct PipelineContext {
    /// The request that started the run
    pub user_request: String,
    /// Shared stage outputs
    pub state: PipelineState,
    /// Token usage across LLM stages
    pub usage: UsageTracker,
    events: Vec<Event>,
    listener: Option<EventListener>,
}

impl PipelineContext {
    pub fn new(user_request: impl Into<String>) -> Self {
        Self {
            user_request: user_request.into(),
            state: PipelineState::new(),
            usage: UsageTracker::new(),
            events: Vec::new(),
            listener: None,
        }
    }

    /// Start from existing state instead of an empty one
    pub fn with_state(mut self, state: PipelineState) -> Self {
        self.state = state;
        self
    }

    /// Call `listener` for every emitted event, as it happens
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn emit(&mut self, event: Event) {
        match event.kind {
            EventKind::Error => tracing::warn!(author = %event.author, "{}", event.text),
            EventKind::Status | EventKind::Message => {
                tracing::debug!(author = %event.author, "{}", event.text)
            }
        }

        if let Some(listener) = &self.listener {
            listener(&event);
        }
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events authored by one stage
    pub fn events_by<'a>(&'a self, author: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.author == author)
    }

    /// Consume the context, keeping state, events and usage
    pub fn into_parts(self) -> (PipelineState, Vec<Event>, UsageTracker) {
        (self.state, self.events, self.usage)
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("user_request", &self.user_request)
            .field("state", &self.state)
            .field("events", &self.events.len())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}
