//! # retap-engine
//!
//! The manipulation engine: an ordered set of manipulator stages that
//! consume the event queue, rewrite or suppress entries according to the
//! configured rule set, and forward the survivors to an output sink.
//!
//! Stage order is fixed: basic remapping → simultaneous (complex) rules →
//! function-key remapping → post to virtual devices. The simultaneous stage
//! is the only one that defers entries (`lazy = true`): it sometimes needs
//! to see *future* events – or the lack of them, via a timeout – before it
//! can commit to a transformation.
//!
//! # Threading
//!
//! The pipeline itself is single-owner and never blocks. The [`dispatcher`]
//! module wraps it in a Tokio task: producer threads admit entries through
//! an [`dispatcher::InputHandle`], timers are `select!`ed sleeps until the
//! next pending deadline, and both merely *wake* the owner – nothing but
//! the owner task ever mutates queue or stage state.

pub mod clock;
pub mod dispatcher;
pub mod manipulator;
pub mod pipeline;
pub mod rules;
pub mod sink;

pub use clock::{Clock, MonotonicClock};
pub use dispatcher::{Dispatcher, InputHandle};
pub use pipeline::Pipeline;
pub use rules::{BasicRule, FunctionKeyRule, RuleError, RuleSet, SimultaneousRule};
pub use sink::EventSink;
