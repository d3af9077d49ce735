//! Terminal rendering of workflow events and run results.

use color_eyre::eyre::Result;
use colored::{ColoredString, Colorize};
use sf_core::sse::encode::{done_line, encode_event};
use sf_core::state::RunOutcome;
use sf_core::workflow::Workflow;
use sf_protocol::events::WorkflowEvent;
use sf_protocol::run_models::StepStatus;
use std::io::Write;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::Receiver;

const RESULT_PREVIEW_CHARS: usize = 120;

/// Print events as they arrive until every sender is gone.
pub async fn print_events(mut rx: Receiver<WorkflowEvent>) {
    let mut printer = EventPrinter::default();
    while let Some(event) = rx.recv().await {
        printer.print(&event);
    }
    printer.end_line();
}

/// Write events to stdout as SSE frames, closing with `[DONE]` once the run
/// reached `workflow_done` or `error`.
pub async fn write_sse(mut rx: Receiver<WorkflowEvent>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut finished = false;

    while let Some(event) = rx.recv().await {
        finished = matches!(event, WorkflowEvent::WorkflowDone(_) | WorkflowEvent::Error(_));
        stdout.write_all(encode_event(&event)?.as_bytes()).await?;
        stdout.flush().await?;
    }

    if finished {
        stdout.write_all(done_line().as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

/// Streamed content is printed inline; anything else starts on a fresh line.
#[derive(Default)]
struct EventPrinter {
    mid_line: bool,
}

impl EventPrinter {
    fn end_line(&mut self) {
        if self.mid_line {
            println!();
            self.mid_line = false;
        }
    }

    fn print(&mut self, event: &WorkflowEvent) {
        if let WorkflowEvent::StepStream(e) = event {
            print!("{}", e.content);
            let _ = std::io::stdout().flush();
            self.mid_line = !e.content.ends_with('\n');
            return;
        }

        self.end_line();
        match event {
            WorkflowEvent::StepStart(e) => {
                println!("{} {} {}", "▶".cyan(), e.step_id.bold(), format!("[{}]", e.agent_name).dimmed());
            }
            WorkflowEvent::StepToolCall(e) => {
                println!("  {} {} {}", "⚙".yellow(), e.tool.yellow(), e.args);
            }
            WorkflowEvent::StepToolResult(e) => {
                println!("  {} {}", "↳".yellow(), preview(&e.result));
            }
            WorkflowEvent::StepDone(e) => {
                println!("{} {} ({} chars)", "✓".green(), e.step_id, e.output_length);
            }
            WorkflowEvent::StepError(e) => {
                println!("{} {}: {}", "✗".red(), e.step_id, e.error.red());
            }
            WorkflowEvent::StepSkip(e) => {
                println!("{} {} skipped", "↷".dimmed(), e.step_id);
            }
            WorkflowEvent::WorkflowDone(e) => {
                println!("{} workflow finished, {} steps", "✓".green().bold(), e.total_steps);
            }
            WorkflowEvent::Error(e) => {
                eprintln!("{} {}", "Error:".red().bold(), e.message);
            }
            WorkflowEvent::StepStream(_) => {}
        }
    }
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(RESULT_PREVIEW_CHARS).collect();
    if text.chars().count() > RESULT_PREVIEW_CHARS {
        preview.push('…');
    }
    preview
}

fn status_label(status: StepStatus) -> ColoredString {
    match status {
        StepStatus::Pending => "pending".dimmed(),
        StepStatus::Running => "running".cyan(),
        StepStatus::Done => "done".green(),
        StepStatus::Error => "error".red(),
        StepStatus::Skipped => "skipped".yellow(),
    }
}

/// Print final outputs in step order, or the step statuses of a cancelled run.
pub fn print_outcome(workflow: &Workflow, outcome: &RunOutcome) {
    match outcome.step_outputs() {
        Some(outputs) => {
            println!("\n{}", "Outputs:".cyan().bold());
            for step in &workflow.steps {
                let output = outputs.get(&step.id).map(String::as_str).unwrap_or_default();
                println!("{} {}", format!("{}:", step.id).bold(), output);
            }
        }
        None => {
            eprintln!("\n{}", "Run cancelled:".yellow().bold());
            for step in &workflow.steps {
                let status = outcome.step(&step.id).map(|s| s.status).unwrap_or_default();
                eprintln!("  {} {}", step.id, status_label(status));
            }
        }
    }
}
