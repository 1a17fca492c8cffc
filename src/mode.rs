//! Interaction modes, prompt directives and the per-mode system instructions.

use crate::context::Environment;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The active interaction discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Questions are answered with a single shell command to review and run.
    #[default]
    Command,
    /// Questions are answered conversationally.
    Chat,
}

impl Mode {
    /// Capitalised name shown in the prompt.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Command => "Command",
            Mode::Chat => "Chat",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a line typed at the prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Blank line, ignored.
    Empty,
    /// `exit` or `quit`.
    Exit,
    /// `/chat` or `/command`.
    Switch(Mode),
    /// Anything else is a question for the current mode.
    Ask(String),
}

impl Directive {
    /// Classify one line of input. Surrounding whitespace is ignored and the
    /// keywords match case-insensitively.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Directive::Empty;
        }
        match line.to_lowercase().as_str() {
            "exit" | "quit" => Directive::Exit,
            "/chat" => Directive::Switch(Mode::Chat),
            "/command" => Directive::Switch(Mode::Command),
            _ => Directive::Ask(line.to_string()),
        }
    }
}

/// System instructions for both modes, fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPrompts {
    command: String,
    chat: String,
}

impl SystemPrompts {
    /// Build both instructions from the environment snapshot taken at startup.
    ///
    /// `share_context` adds the host description to the command instruction;
    /// `location` is only mentioned in chat mode.
    pub fn new(env: &Environment, share_context: bool, location: Option<&str>) -> Self {
        let mut command = String::from(
            "You are an expert in shell commands. Given a user's question, your task is to \
             provide the single, most appropriate shell command that answers the question. \
             You remember the conversation history. Return ONLY the shell command and nothing \
             else. Do not provide any explanation, markdown formatting, or any text other than \
             the command itself.",
        );
        if share_context {
            command.push_str("\n\n");
            command.push_str(&env.describe());
        }

        let mut chat = String::from(
            "You are a helpful and conversational AI assistant. \
             Provide concise and informative answers.",
        );
        if let Some(location) = location {
            chat.push_str(&format!(" The user is located in {}.", location));
        }
        chat.push_str(&format!(" The current time is {}.", env.local_time));

        Self { command, chat }
    }

    /// Instruction governing `mode`.
    pub fn for_mode(&self, mode: Mode) -> &str {
        match mode {
            Mode::Command => &self.command,
            Mode::Chat => &self.chat,
        }
    }
}
