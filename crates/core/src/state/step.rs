//! Step state machine.
//!
//! ```text
//! pending ──start──▶ running ──complete──▶ done
//!    │                  └─────fail──────▶ error
//!    └──────skip──────▶ skipped
//! ```
//!
//! `done`, `error` and `skipped` are terminal. Each function checks the
//! current status first and leaves the state untouched when the transition
//! does not apply.

use serde_json::Value;
use sf_protocol::run_models::{StepRunState, StepStatus, ToolCallRecord};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot {action} a step that is {status:?}")]
    InvalidStatus {
        action: &'static str,
        status: StepStatus,
    },

    #[error("no pending call to '{tool}' matches this result")]
    UnmatchedToolResult {
        tool: String,
        call_id: Option<String>,
    },
}

fn require(
    step: &StepRunState,
    action: &'static str,
    allowed: &[StepStatus],
) -> Result<(), TransitionError> {
    if allowed.contains(&step.status) {
        Ok(())
    } else {
        Err(TransitionError::InvalidStatus {
            action,
            status: step.status,
        })
    }
}

/// Move a pending step to running and clear its accumulators.
pub fn start_step(step: &mut StepRunState) -> Result<(), TransitionError> {
    require(step, "start", &[StepStatus::Pending])?;
    step.status = StepStatus::Running;
    step.output.clear();
    step.error = None;
    step.tool_calls.clear();
    Ok(())
}

/// Append a streamed chunk to a running step's output.
pub fn append_output(step: &mut StepRunState, content: &str) -> Result<(), TransitionError> {
    require(step, "stream into", &[StepStatus::Running])?;
    step.output.push_str(content);
    Ok(())
}

pub fn record_tool_call(
    step: &mut StepRunState,
    tool: &str,
    args: Value,
    call_id: Option<String>,
) -> Result<(), TransitionError> {
    require(step, "record a tool call on", &[StepStatus::Running])?;
    step.tool_calls.push(ToolCallRecord {
        tool: tool.to_string(),
        args,
        call_id,
        result: None,
    });
    Ok(())
}

/// Attach a tool result to the call it answers.
///
/// With a `call_id`, the result goes to the unresolved record carrying that
/// id. When no record carries it, or the result has no `call_id`, it goes to
/// the most recent unresolved record for the same tool name; a result with a
/// `call_id` only falls back to records that were recorded without one.
pub fn attach_tool_result(
    step: &mut StepRunState,
    tool: &str,
    result: &str,
    call_id: Option<&str>,
) -> Result<(), TransitionError> {
    require(step, "attach a tool result to", &[StepStatus::Running])?;

    let calls = &step.tool_calls;
    let by_id = call_id.and_then(|id| {
        calls
            .iter()
            .rposition(|r| r.result.is_none() && r.call_id.as_deref() == Some(id))
    });
    let index = by_id.or_else(|| {
        calls.iter().rposition(|r| {
            r.result.is_none() && r.tool == tool && (call_id.is_none() || r.call_id.is_none())
        })
    });

    match index {
        Some(index) => {
            step.tool_calls[index].result = Some(result.to_string());
            Ok(())
        }
        None => Err(TransitionError::UnmatchedToolResult {
            tool: tool.to_string(),
            call_id: call_id.map(str::to_string),
        }),
    }
}

/// Finish a running step.
///
/// The streamed output is kept when there is any; otherwise `preview` becomes
/// the output.
pub fn complete_step(step: &mut StepRunState, preview: &str) -> Result<(), TransitionError> {
    require(step, "complete", &[StepStatus::Running])?;
    step.status = StepStatus::Done;
    if step.output.is_empty() {
        step.output = preview.to_string();
    }
    Ok(())
}

/// Fail a step. A pending step may fail before it ever started.
pub fn fail_step(step: &mut StepRunState, message: &str) -> Result<(), TransitionError> {
    require(step, "fail", &[StepStatus::Pending, StepStatus::Running])?;
    step.status = StepStatus::Error;
    step.error = Some(message.to_string());
    Ok(())
}

/// Skip a pending step, giving it its default output.
pub fn skip_step(
    step: &mut StepRunState,
    default_output: Option<&str>,
) -> Result<(), TransitionError> {
    require(step, "skip", &[StepStatus::Pending])?;
    step.status = StepStatus::Skipped;
    step.output = default_output.unwrap_or_default().to_string();
    step.error = None;
    step.tool_calls.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn running() -> StepRunState {
        let mut step = StepRunState::default();
        start_step(&mut step).unwrap();
        step
    }

    #[test]
    fn test_stream_then_complete_keeps_full_output() {
        let mut step = running();
        append_output(&mut step, "Hel").unwrap();
        append_output(&mut step, "lo").unwrap();
        complete_step(&mut step, "He").unwrap();

        assert_eq!(step.status, StepStatus::Done);
        assert_eq!(step.output, "Hello");
    }

    #[test]
    fn test_complete_without_stream_uses_preview() {
        let mut step = running();
        complete_step(&mut step, "preview text").unwrap();
        assert_eq!(step.output, "preview text");
    }

    #[test]
    fn test_terminal_states_reject_events() {
        let mut step = running();
        complete_step(&mut step, "").unwrap();
        let before = step.clone();

        assert!(append_output(&mut step, "late").is_err());
        assert!(fail_step(&mut step, "late").is_err());
        assert!(start_step(&mut step).is_err());
        assert!(skip_step(&mut step, None).is_err());
        assert_eq!(step, before);
    }

    #[test]
    fn test_stream_before_start_is_rejected() {
        let mut step = StepRunState::default();
        let err = append_output(&mut step, "x").unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidStatus {
                action: "stream into",
                status: StepStatus::Pending
            }
        );
        assert!(step.output.is_empty());
    }

    #[test]
    fn test_fail_records_message() {
        let mut step = running();
        append_output(&mut step, "partial").unwrap();
        fail_step(&mut step, "rate limited").unwrap();

        assert_eq!(step.status, StepStatus::Error);
        assert_eq!(step.error.as_deref(), Some("rate limited"));
        assert_eq!(step.output, "partial");

        let mut never_started = StepRunState::default();
        fail_step(&mut never_started, "agent missing").unwrap();
        assert_eq!(never_started.status, StepStatus::Error);
    }

    #[test]
    fn test_skip_sets_default_output() {
        let mut step = StepRunState::default();
        skip_step(&mut step, Some("n/a")).unwrap();
        assert_eq!(step.status, StepStatus::Skipped);
        assert_eq!(step.output, "n/a");

        let mut step = StepRunState::default();
        skip_step(&mut step, None).unwrap();
        assert_eq!(step.output, "");
        assert!(step.tool_calls.is_empty());
    }

    #[test]
    fn test_tool_result_by_call_id() {
        let mut step = running();
        record_tool_call(&mut step, "search", json!({"q": "a"}), Some("c1".into())).unwrap();
        record_tool_call(&mut step, "search", json!({"q": "b"}), Some("c2".into())).unwrap();

        attach_tool_result(&mut step, "search", "result a", Some("c1")).unwrap();

        assert_eq!(step.tool_calls[0].result.as_deref(), Some("result a"));
        assert_eq!(step.tool_calls[1].result, None);
    }

    #[test]
    fn test_tool_result_by_name_picks_latest_unresolved() {
        let mut step = running();
        record_tool_call(&mut step, "search", json!({}), None).unwrap();
        record_tool_call(&mut step, "fetch", json!({}), None).unwrap();
        record_tool_call(&mut step, "search", json!({}), None).unwrap();

        attach_tool_result(&mut step, "search", "second", None).unwrap();
        attach_tool_result(&mut step, "search", "first", None).unwrap();

        assert_eq!(step.tool_calls[0].result.as_deref(), Some("first"));
        assert_eq!(step.tool_calls[1].result, None);
        assert_eq!(step.tool_calls[2].result.as_deref(), Some("second"));

        let err = attach_tool_result(&mut step, "search", "third", None).unwrap_err();
        assert!(matches!(err, TransitionError::UnmatchedToolResult { .. }));
    }

    #[test]
    fn test_unknown_call_id_is_rejected() {
        let mut step = running();
        record_tool_call(&mut step, "search", json!({}), Some("c1".into())).unwrap();

        assert!(attach_tool_result(&mut step, "search", "x", Some("c9")).is_err());
        assert_eq!(step.tool_calls[0].result, None);
    }

    #[test]
    fn test_call_id_falls_back_to_unidentified_call() {
        let mut step = running();
        record_tool_call(&mut step, "search", json!({}), Some("c1".into())).unwrap();
        record_tool_call(&mut step, "search", json!({}), None).unwrap();

        attach_tool_result(&mut step, "search", "late id", Some("c7")).unwrap();
        assert_eq!(step.tool_calls[0].result, None);
        assert_eq!(step.tool_calls[1].result.as_deref(), Some("late id"));

        // Only the identified call is left, and its id does not match
        assert!(attach_tool_result(&mut step, "search", "x", Some("c7")).is_err());
        attach_tool_result(&mut step, "search", "first", Some("c1")).unwrap();
        assert_eq!(step.tool_calls[0].result.as_deref(), Some("first"));
    }
}
