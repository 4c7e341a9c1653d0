//! Interactive steady-state cutoff selection.
//!
//! The operator is shown the raw order-parameter series for the run that
//! just completed (plotting happens externally) and asked for the
//! simulation step at which steady state begins. The exchange is modeled
//! as an explicit finite state machine with a pure transition function,
//! so the protocol can be driven by a scripted input source in tests
//! instead of a terminal.
//!
//! ```text
//! AwaitingCutoff --invalid--> AwaitingCutoff
//! AwaitingCutoff --valid----> AwaitingConfirmation
//! AwaitingCutoff --skip-----> Skipped
//! AwaitingConfirmation --no-> AwaitingCutoff
//! AwaitingConfirmation --yes> Done
//! ```

use crate::error::Result;
use crate::series::{cutoff_index, mean};
use crate::SAMPLE_STRIDE;

/// Literal token that skips the current run without producing a result.
pub const SKIP_TOKEN: &str = "skip";

/// Operator input/output channel.
///
/// `read_line` blocks until a line is available and returns `None` on
/// end-of-input or interrupt, which aborts the selection.
pub trait LinePrompt {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Shows a message to the operator.
    fn say(&mut self, message: &str);
}

/// Terminal outcome of a cutoff selection.
#[derive(Debug, Clone, PartialEq)]
pub enum CutoffOutcome {
    /// Operator confirmed a cutoff; the preview mean was computed over
    /// the series tail at selection time.
    Chosen { cutoff_step: u64, preview_mean: f64 },
    /// Operator skipped this run; no result is produced.
    Skipped,
    /// Input channel closed or interrupted; the whole workflow stops.
    Aborted,
}

/// Selector state. Only `Done` and `Skipped` are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorState {
    AwaitingCutoff,
    AwaitingConfirmation { cutoff_step: u64, preview_mean: f64 },
    Done { cutoff_step: u64, preview_mean: f64 },
    Skipped,
}

impl SelectorState {
    /// Pure transition over one line of operator input. Returns the next
    /// state and any messages to surface to the operator.
    pub fn advance(self, series: &[f64], input: &str) -> (SelectorState, Vec<String>) {
        let input = input.trim();
        match self {
            SelectorState::AwaitingCutoff => {
                if input.eq_ignore_ascii_case(SKIP_TOKEN) {
                    return (SelectorState::Skipped, Vec::new());
                }
                let step = match input.parse::<i64>() {
                    Ok(s) => s,
                    Err(_) => {
                        return (
                            SelectorState::AwaitingCutoff,
                            vec![format!("Please enter a valid integer or '{}'", SKIP_TOKEN)],
                        )
                    }
                };
                if step < 0 {
                    return (
                        SelectorState::AwaitingCutoff,
                        vec!["Cutoff step must be non-negative".to_string()],
                    );
                }
                let step = step as u64;
                let index = cutoff_index(step);
                if index >= series.len() {
                    let max_step = (series.len() as u64 - 1) * SAMPLE_STRIDE;
                    return (
                        SelectorState::AwaitingCutoff,
                        vec![format!(
                            "Cutoff step too large. Max available step: {}",
                            max_step
                        )],
                    );
                }
                let tail = &series[index..];
                let preview_mean = mean(tail);
                let messages = vec![
                    format!("Using cutoff at step {} (sample {}):", step, index),
                    format!("  - Remaining data points: {}", tail.len()),
                    format!("  - Steady-state mean: {:.6}", preview_mean),
                ];
                (
                    SelectorState::AwaitingConfirmation {
                        cutoff_step: step,
                        preview_mean,
                    },
                    messages,
                )
            }
            SelectorState::AwaitingConfirmation {
                cutoff_step,
                preview_mean,
            } => match input.to_lowercase().as_str() {
                "y" | "yes" => (
                    SelectorState::Done {
                        cutoff_step,
                        preview_mean,
                    },
                    Vec::new(),
                ),
                // anything else rejects the candidate cutoff
                _ => (SelectorState::AwaitingCutoff, Vec::new()),
            },
            // terminal states don't move
            state => (state, Vec::new()),
        }
    }

    fn prompt_text(&self) -> &'static str {
        match self {
            SelectorState::AwaitingConfirmation { .. } => "Confirm this cutoff? [y/n]: ",
            _ => "Cutoff step (simulation step, or 'skip' to skip this run): ",
        }
    }
}

/// Runs the selection protocol against a prompt until a terminal state is
/// reached. Blocks on operator input with no timeout.
pub fn select_cutoff<P: LinePrompt>(series: &[f64], prompt: &mut P) -> Result<CutoffOutcome> {
    prompt.say(&format!(
        "Available data points: {} (every {}th simulation step)",
        series.len(),
        SAMPLE_STRIDE
    ));
    prompt.say("Choose the cutoff step where steady-state begins.");

    let mut state = SelectorState::AwaitingCutoff;
    loop {
        let line = match prompt.read_line(state.prompt_text())? {
            Some(l) => l,
            None => {
                debug!("cutoff prompt closed, aborting selection");
                return Ok(CutoffOutcome::Aborted);
            }
        };
        let (next, messages) = state.advance(series, &line);
        for message in &messages {
            prompt.say(message);
        }
        state = next;
        match state {
            SelectorState::Done {
                cutoff_step,
                preview_mean,
            } => {
                return Ok(CutoffOutcome::Chosen {
                    cutoff_step,
                    preview_mean,
                })
            }
            SelectorState::Skipped => return Ok(CutoffOutcome::Skipped),
            _ => continue,
        }
    }
}

/// Scripted prompt used in tests; feeds canned lines and collects output.
#[cfg(test)]
pub struct ScriptedPrompt {
    lines: std::collections::VecDeque<String>,
    pub said: Vec<String>,
}

#[cfg(test)]
impl ScriptedPrompt {
    pub fn new(lines: &[&str]) -> Self {
        ScriptedPrompt {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            said: Vec::new(),
        }
    }
}

#[cfg(test)]
impl LinePrompt for ScriptedPrompt {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(self.lines.pop_front())
    }

    fn say(&mut self, message: &str) {
        self.said.push(message.to_string());
    }
}

#[test]
fn selector_accepts_confirmed_cutoff() {
    let series: Vec<f64> = (1..=9).map(|i| i as f64 / 10.0).collect();
    let mut prompt = ScriptedPrompt::new(&["20", "y"]);
    let outcome = select_cutoff(&series, &mut prompt).unwrap();
    match outcome {
        CutoffOutcome::Chosen {
            cutoff_step,
            preview_mean,
        } => {
            assert_eq!(cutoff_step, 20);
            assert!((preview_mean - 0.7).abs() < 1e-12);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn selector_reprompts_on_invalid_input() {
    let series = vec![0.1, 0.2, 0.3];
    // garbage, negative, too large, then a valid confirmed cutoff
    let mut prompt = ScriptedPrompt::new(&["abc", "-5", "100", "5", "yes"]);
    let outcome = select_cutoff(&series, &mut prompt).unwrap();
    assert_eq!(
        outcome,
        CutoffOutcome::Chosen {
            cutoff_step: 5,
            preview_mean: 0.25,
        }
    );
    assert!(prompt
        .said
        .iter()
        .any(|m| m.contains("Max available step: 10")));
}

#[test]
fn selector_rejection_returns_to_cutoff_prompt() {
    let series = vec![0.1, 0.2, 0.3, 0.4];
    let mut prompt = ScriptedPrompt::new(&["10", "n", "5", "y"]);
    let outcome = select_cutoff(&series, &mut prompt).unwrap();
    match outcome {
        CutoffOutcome::Chosen { cutoff_step, .. } => assert_eq!(cutoff_step, 5),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn selector_skip_token_skips_run() {
    let series = vec![0.1, 0.2];
    let mut prompt = ScriptedPrompt::new(&["skip"]);
    assert_eq!(
        select_cutoff(&series, &mut prompt).unwrap(),
        CutoffOutcome::Skipped
    );
}

#[test]
fn selector_aborts_on_closed_input() {
    let series = vec![0.1, 0.2];
    let mut prompt = ScriptedPrompt::new(&[]);
    assert_eq!(
        select_cutoff(&series, &mut prompt).unwrap(),
        CutoffOutcome::Aborted
    );
}

#[test]
fn advance_is_pure_on_terminal_states() {
    let series = vec![0.1];
    let (state, _) = SelectorState::Skipped.advance(&series, "0");
    assert_eq!(state, SelectorState::Skipped);
}
