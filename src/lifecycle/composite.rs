// src/lifecycle/composite.rs

//! Fan-out composition of lifecycle observers.

use tracing::error;

use crate::errors::Result;
use crate::lifecycle::{LifeCycle, LifecycleEvent};

/// Forwards every event to all members in registration order.
///
/// A failure in one observer does not prevent delivery to the remaining
/// observers for that event; the first failure is surfaced to the caller
/// once the fan-out completes.
pub struct CompositeLifeCycle {
    members: Vec<Box<dyn LifeCycle>>,
}

impl CompositeLifeCycle {
    pub fn new(members: Vec<Box<dyn LifeCycle>>) -> Self {
        Self { members }
    }

    pub fn empty() -> Self {
        Self { members: Vec::new() }
    }

    pub fn push(&mut self, member: Box<dyn LifeCycle>) {
        self.members.push(member);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl LifeCycle for CompositeLifeCycle {
    fn on_event(&mut self, event: &LifecycleEvent) -> Result<()> {
        let mut first_error = None;
        for member in &mut self.members {
            if let Err(err) = member.on_event(event) {
                error!(error = %err, "lifecycle observer failed; continuing fan-out");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
