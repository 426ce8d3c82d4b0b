//! UI Components

use leptos::prelude::*;

use crate::api::{ApiError, ChatMessage, StreamEvent, ThoughtStep};

/// Tool name shown for a reply the agent could not parse
const INVALID_FORMAT: &str = "Invalid format";

/// A transcript entry plus the thoughts that produced it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayMessage {
    pub id: usize,
    pub role: String,
    pub content: String,
    pub steps: Vec<ThoughtStep>,
}

impl DisplayMessage {
    /// Number the transcript; steps attach to the last assistant entry
    pub fn from_transcript(transcript: Vec<ChatMessage>, steps: Vec<ThoughtStep>) -> Vec<Self> {
        let last = transcript.len().saturating_sub(1);
        let mut steps = Some(steps);

        transcript
            .into_iter()
            .enumerate()
            .map(|(id, msg)| {
                let own_steps = if id == last && msg.role == "assistant" {
                    steps.take().unwrap_or_default()
                } else {
                    Vec::new()
                };
                Self {
                    id,
                    role: msg.role,
                    content: msg.content,
                    steps: own_steps,
                }
            })
            .collect()
    }
}

/// How a streamed turn ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnEnd {
    Done {
        session_id: String,
        transcript: Vec<ChatMessage>,
    },
    Failed(ApiError),
}

/// Thoughts of the turn in flight, folded from socket events
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiveTurn {
    pub steps: Vec<ThoughtStep>,
    /// Text of the step still being written
    pub draft: String,
    pub answer: Option<String>,
}

impl LiveTurn {
    /// Fold one event in, returning the end of the turn once it arrives
    pub fn apply(&mut self, event: StreamEvent) -> Option<TurnEnd> {
        match event {
            StreamEvent::Token { content } => self.draft.push_str(&content),
            StreamEvent::Action { tool, input } => self.steps.push(ThoughtStep {
                tool,
                input,
                log: std::mem::take(&mut self.draft),
                observation: None,
            }),
            StreamEvent::Observation { tool, content } => {
                if let Some(step) = self
                    .steps
                    .iter_mut()
                    .rev()
                    .find(|s| s.tool == tool && s.observation.is_none())
                {
                    step.observation = Some(content);
                }
            }
            StreamEvent::ParseError { message } => self.steps.push(ThoughtStep {
                tool: INVALID_FORMAT.into(),
                input: String::new(),
                log: std::mem::take(&mut self.draft),
                observation: Some(message),
            }),
            StreamEvent::Finish { output } => {
                self.draft.clear();
                self.answer = Some(output);
            }
            StreamEvent::Error { error, code } => return Some(TurnEnd::Failed(ApiError { error, code })),
            StreamEvent::Done {
                session_id,
                transcript,
            } => return Some(TurnEnd::Done { session_id, transcript }),
        }
        None
    }

    /// Index of the step being worked on: an open tool call, or none while
    /// the next thought is still streaming
    pub fn current(&self) -> Option<usize> {
        if !self.draft.is_empty() {
            return None;
        }
        self.steps
            .iter()
            .rposition(|s| s.observation.is_none())
    }
}

/// Expandable record of one tool call
#[component]
fn ThoughtItem(step: ThoughtStep, #[prop(optional)] open: bool) -> impl IntoView {
    let summary = if step.input.is_empty() {
        format!("🛠️ {}", step.tool)
    } else {
        format!("🛠️ {}: {}", step.tool, step.input)
    };
    let observation = step.observation.unwrap_or_else(|| "…".into());

    view! {
        <details class="thought" open=open>
            <summary>{summary}</summary>
            <pre class="thought-log">{step.log}</pre>
            <p class="thought-observation">{observation}</p>
        </details>
    }
}

/// Thoughts streaming in for the pending answer. Finished steps collapse,
/// the current one stays expanded.
#[component]
pub fn LiveThoughts(turn: LiveTurn) -> impl IntoView {
    let current = turn.current();
    let draft = turn.draft;
    let answer = turn.answer;

    view! {
        <div class="message message-assistant pending">
            <span class="role">"assistant"</span>
            <div class="thoughts">
                {turn
                    .steps
                    .into_iter()
                    .enumerate()
                    .map(|(i, step)| view! { <ThoughtItem step=step open=current == Some(i) /> })
                    .collect_view()}
                {(!draft.is_empty()).then(|| view! {
                    <details class="thought" open=true>
                        <summary>"🤔 Thinking..."</summary>
                        <pre class="thought-log">{draft}</pre>
                    </details>
                })}
            </div>
            {answer.map(|text| view! { <p class="content">{text}</p> })}
        </div>
    }
}

/// Message bubble component
#[component]
pub fn MessageBubble(message: DisplayMessage) -> impl IntoView {
    let class = format!("message message-{}", message.role);
    let steps = message.steps;

    view! {
        <div class=class>
            <span class="role">{message.role}</span>
            {(!steps.is_empty()).then(|| view! {
                <div class="thoughts">
                    {steps.into_iter().map(|step| view! { <ThoughtItem step=step /> }).collect_view()}
                </div>
            })}
            <p class="content">{message.content}</p>
        </div>
    }
}
