//! The manipulator pipeline: the ordered stage set over one queue.
//!
//! A pass runs every stage, in the fixed order, over the current queue
//! contents. Passes are triggered by the dispatcher whenever a new entry is
//! admitted or a pending simultaneous-rule deadline elapses; they never
//! block – "wait for more input" is always expressed as a lazy entry plus
//! a deadline, not a blocking call.

use std::sync::Arc;

use retap_core::{AbsoluteTime, Queue};

use crate::manipulator::{
    BasicManipulator, FunctionKeyManipulator, Manipulator, PostManipulator,
    SimultaneousManipulator,
};
use crate::rules::{RuleError, RuleSet};
use crate::sink::EventSink;

/// The ordered manipulator stages plus the queue they operate on.
#[derive(Debug)]
pub struct Pipeline {
    queue: Arc<Queue>,
    stages: Vec<Manipulator>,
}

impl Pipeline {
    /// Builds the fixed stage order from a rule set and an output sink.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] when the rule set is structurally invalid.
    pub fn new(rules: &RuleSet, sink: Arc<dyn EventSink>) -> Result<Self, RuleError> {
        rules.validate()?;
        Ok(Self {
            queue: Arc::new(Queue::new()),
            stages: vec![
                Manipulator::Basic(BasicManipulator::new(&rules.basic)),
                Manipulator::Simultaneous(SimultaneousManipulator::new(&rules.simultaneous)),
                Manipulator::FunctionKeys(FunctionKeyManipulator::new(&rules.function_keys)),
                Manipulator::PostToVirtualDevices(PostManipulator::new(sink)),
            ],
        })
    }

    /// The queue producers admit entries into.
    pub fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }

    /// Runs all stages once, in order, at time `now`.
    pub fn run_pass(&mut self, now: AbsoluteTime) {
        for stage in &mut self.stages {
            stage.run(&self.queue, now);
        }
    }

    /// Earliest time a deferred entry becomes resolvable without new input.
    pub fn next_deadline(&self) -> Option<AbsoluteTime> {
        self.stages.iter().filter_map(Manipulator::next_deadline).min()
    }

    /// Teardown: discards all queued entries and pending stage state
    /// without forwarding anything.
    pub fn clear(&mut self) {
        self.queue.clear();
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}
