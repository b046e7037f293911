//! Provider-independent prompt with two renderings.

use crate::models::{ChatMessage, recent_turns};

pub const ANSWER_INSTRUCTION: &str =
    "You are a helpful assistant. Use the following context to answer the user's question.";

pub const SUMMARIZE_INSTRUCTION: &str =
    "You are a helpful assistant. Summarize the following content as clearly and concisely as possible.";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Task {
    Answer { context: String, question: String },
    Summarize { content: String },
}

/// What the LLM is asked to do, plus the conversation leading up to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    task: Task,
    history: Vec<ChatMessage>,
}

impl Prompt {
    /// Answer `question` from retrieved `context`.
    ///
    /// Only the most recent history entries are kept, and of those only
    /// user and assistant turns.
    pub fn answer(
        context: impl Into<String>,
        question: impl Into<String>,
        history: &[ChatMessage],
    ) -> Self {
        Self {
            task: Task::Answer {
                context: context.into(),
                question: question.into(),
            },
            history: recent_turns(history).cloned().collect(),
        }
    }

    pub fn summarize(content: impl Into<String>) -> Self {
        Self {
            task: Task::Summarize {
                content: content.into(),
            },
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn system_instruction(&self) -> &'static str {
        match self.task {
            Task::Answer { .. } => ANSWER_INSTRUCTION,
            Task::Summarize { .. } => SUMMARIZE_INSTRUCTION,
        }
    }

    /// Structured rendering for chat-completion APIs: system, history, user.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        let user_turn = match &self.task {
            Task::Answer { context, question } => {
                format!("Context: {context}\n\nQuestion: {question}")
            }
            Task::Summarize { content } => content.clone(),
        };

        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::system(self.system_instruction()));
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(user_turn));
        messages
    }

    /// Single-string rendering for completion APIs without roles.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for message in &self.history {
            if let Some(label) = message.role.label() {
                text.push_str(label);
                text.push_str(": ");
                text.push_str(&message.content);
                text.push('\n');
            }
        }

        match &self.task {
            Task::Answer { context, question } => text.push_str(&format!(
                "Context: {context}\n\nQuestion: {question}\n\nAnswer as helpfully as possible."
            )),
            Task::Summarize { content } => text.push_str(&format!(
                "Summarize the following content as clearly and concisely as possible.\n\nContent:\n{content}"
            )),
        }
        text
    }
}
