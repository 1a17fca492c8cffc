//! Conversation history shared with the model.
//!
//! The history always starts with the system message for the current mode.
//! Turns are added through [`Exchange`], which removes its user message again
//! unless an answer is committed, so a failed request leaves no trace.

use serde::{Deserialize, Serialize};

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message, serialized as `{"role": ..., "content": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered conversation, system message first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    /// Start a conversation governed by `system`.
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system)],
        }
    }

    /// Replace the system message in place, keeping every other turn.
    pub fn set_system(&mut self, content: impl Into<String>) {
        self.messages[0] = Message::system(content);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Append `question` as a user message and return a guard for the reply.
    ///
    /// Dropping the guard without [`Exchange::commit`] rolls the user message back.
    /// A history that already ends in an unanswered user message is a broken
    /// invariant.
    pub fn begin(&mut self, question: impl Into<String>) -> Exchange<'_> {
        debug_assert!(
            self.messages.last().map(|m| m.role) != Some(Role::User),
            "history already ends with an unanswered user message"
        );
        self.messages.push(Message::user(question));
        Exchange {
            history: self,
            committed: false,
        }
    }
}

/// A user message awaiting its answer.
#[derive(Debug)]
pub struct Exchange<'a> {
    history: &'a mut History,
    committed: bool,
}

impl Exchange<'_> {
    /// The full conversation to send, including the pending question.
    pub fn messages(&self) -> &[Message] {
        self.history.messages()
    }

    /// Record the assistant's answer, keeping both messages.
    pub fn commit(mut self, answer: impl Into<String>) {
        self.history.messages.push(Message::assistant(answer));
        self.committed = true;
    }
}

impl Drop for Exchange<'_> {
    fn drop(&mut self) {
        if !self.committed
            && self.history.messages.last().map(|m| m.role) == Some(Role::User)
        {
            self.history.messages.pop();
        }
    }
}
