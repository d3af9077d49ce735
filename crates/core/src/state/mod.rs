//! Step state machine and run tracking.
//!
//! `step` holds the transition functions for a single `StepRunState`; `run`
//! applies whole workflow events to a `RunState`.

pub mod run;
pub mod step;

pub use run::{new_run_state, RunCompletion, RunOutcome, RunTracker};
pub use step::{
    append_output, attach_tool_result, complete_step, fail_step, record_tool_call, skip_step,
    start_step, TransitionError,
};
