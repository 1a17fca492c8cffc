//! Terminal input and output for the session.
//!
//! The session only talks to a [`Console`]: it reads lines, asks yes/no
//! questions and shows [`Notice`]s. [`TerminalConsole`] is the real one.

pub mod panel;
pub mod prompt;

use crate::exec::{ExecError, ExecutionResult};
use crate::llm::ModelError;
use crate::mode::Mode;
use anyhow::{Context, Result};
use async_trait::async_trait;
use crossterm::style::{Color as TermColor, Stylize};
use panel::Panel;
use prompt::{parse_confirmation, Label};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

pub use prompt::ReadOutcome;

const BANNER: &str = r"
██╗    ██╗ █████╗ ██████╗ ██╗
██║    ██║██╔══██╗██╔══██╗██║
██║ █╗ ██║███████║██████╔╝██║
██║███╗██║██╔══██║██╔══██╗██║
╚███╔███╔╝██║  ██║██║  ██║██║
 ╚══╝╚══╝ ╚═╝  ╚═╝╚═╝  ╚═╝╚═╝
";

const CONFIRM_QUESTION: &str = "Do you want to execute this command? [y/n] (y)";

/// Everything the session shows the user.
#[derive(Debug)]
pub enum Notice {
    /// Startup greeting naming the initial mode.
    Banner(Mode),
    ModeSwitched(Mode),
    /// A model request is about to be sent.
    Thinking { backend: String, model: String },
    /// The startup reachability check failed.
    BackendUnreachable(String),
    SuggestedCommand(String),
    Executing(String),
    Execution(ExecutionResult),
    ExecutionFailed(ExecError),
    Cancelled,
    /// The model answered, but not with anything runnable.
    NoCommand,
    ModelFailed(ModelError),
    Answer(String),
    Goodbye,
}

/// The session's view of the terminal.
#[async_trait(?Send)]
pub trait Console {
    /// Read one line at the prompt for `mode`.
    async fn read_line(&mut self, mode: Mode) -> Result<ReadOutcome>;

    /// Ask a yes/no question; `None` when the user interrupts instead.
    async fn confirm(&mut self, default: bool) -> Result<Option<bool>>;

    fn show(&mut self, notice: Notice) -> Result<()>;

    /// Resolves when the user asks to abort (Ctrl-C) outside of line input.
    async fn interrupted(&self);
}

/// Console on the process's stdin and stdout.
pub struct TerminalConsole {
    /// Raw-mode line editing when both ends are a terminal.
    interactive: bool,
    /// Plain line reader for piped input.
    lines: Lines<BufReader<Stdin>>,
}

impl TerminalConsole {
    pub fn new() -> Self {
        let interactive = atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout);
        debug!(interactive, "console ready");
        Self {
            interactive,
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn read(&mut self, label: Label) -> Result<ReadOutcome> {
        if self.interactive {
            return prompt::read_line(&label).context("Failed to read from terminal");
        }

        let mut stdout = io::stdout();
        write!(stdout, "{}: ", label.text.with(label.color).bold())?;
        stdout.flush()?;
        tokio::select! {
            line = self.lines.next_line() => {
                match line.context("Failed to read from stdin")? {
                    Some(line) => Ok(ReadOutcome::Line(line)),
                    None => {
                        writeln!(stdout)?;
                        Ok(ReadOutcome::Interrupted)
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                writeln!(stdout)?;
                Ok(ReadOutcome::Interrupted)
            }
        }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Console for TerminalConsole {
    async fn read_line(&mut self, mode: Mode) -> Result<ReadOutcome> {
        println!();
        self.read(mode_label(mode)).await
    }

    async fn confirm(&mut self, default: bool) -> Result<Option<bool>> {
        loop {
            let label = Label {
                text: CONFIRM_QUESTION.to_string(),
                color: TermColor::Reset,
            };
            match self.read(label).await? {
                ReadOutcome::Interrupted => return Ok(None),
                ReadOutcome::Line(answer) => match parse_confirmation(&answer, default) {
                    Some(yes) => return Ok(Some(yes)),
                    None => println!("{}", "Please select one of the available options".red()),
                },
            }
        }
    }

    fn show(&mut self, notice: Notice) -> Result<()> {
        let width = crossterm::terminal::size().map(|(w, _)| w).unwrap_or(80);
        let mut stdout = io::stdout().lock();
        render_notice(&mut stdout, &notice, width)?;
        Ok(())
    }

    async fn interrupted(&self) {
        if tokio::signal::ctrl_c().await.is_err() {
            // No signal handling available; never report an interrupt.
            std::future::pending::<()>().await;
        }
    }
}

fn mode_label(mode: Mode) -> Label {
    Label {
        text: format!("You ({} Mode)", mode),
        color: match mode {
            Mode::Command => TermColor::Cyan,
            Mode::Chat => TermColor::Magenta,
        },
    }
}

/// Write `notice` to `out`, panels no wider than `width`.
pub fn render_notice<W: Write>(out: &mut W, notice: &Notice, width: u16) -> io::Result<()> {
    match notice {
        Notice::Banner(mode) => {
            writeln!(out, "{}", BANNER.magenta().bold())?;
            writeln!(out, "{}", "Shell & Chat Assistant".green().bold())?;
            writeln!(
                out,
                "{}",
                format!(
                    "Starting in {} Mode. Type '/chat' to switch to Chat Mode or '/command' to switch back.",
                    mode
                )
                .dim()
            )?;
            writeln!(out, "{}", "Type 'exit' or 'quit' to end the session.".dim())?;
        }
        Notice::ModeSwitched(Mode::Chat) => {
            writeln!(out, "\n{} Ask me anything!", "Switched to Chat Mode.".magenta().bold())?;
        }
        Notice::ModeSwitched(Mode::Command) => {
            writeln!(
                out,
                "\n{} Ask for a shell command.",
                "Switched to Command Mode.".cyan().bold()
            )?;
        }
        Notice::Thinking { backend, model } => {
            writeln!(
                out,
                "{}",
                format!("Thinking... asking {} model '{}'", backend, model).cyan().dim()
            )?;
        }
        Notice::BackendUnreachable(reason) => {
            writeln!(out, "{}", format!("Warning: {}", reason).yellow().bold())?;
            writeln!(
                out,
                "{}",
                "Questions will fail until the model server is running.".yellow()
            )?;
        }
        Notice::SuggestedCommand(command) => {
            let panel = Panel::new("Suggested Command", Color::Blue).block_of(
                command,
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            );
            panel.write_to(out, width)?;
        }
        Notice::Executing(command) => {
            writeln!(
                out,
                "\n{} {}",
                "Executing command:".green().bold(),
                command.as_str().yellow()
            )?;
        }
        Notice::Execution(result) => {
            execution_panel(result).write_to(out, width)?;
        }
        Notice::ExecutionFailed(ExecError::CommandNotFound { program, detail }) => {
            writeln!(
                out,
                "{}",
                format!(
                    "Command not found: {}. Please ensure the command is valid and in your system's PATH.",
                    program
                )
                .red()
                .bold()
            )?;
            if !detail.is_empty() {
                writeln!(out, "{}", detail.as_str().dim())?;
            }
        }
        Notice::ExecutionFailed(err @ ExecError::Unexpected(_)) => {
            writeln!(
                out,
                "{}",
                format!("An unexpected error occurred: {}", err).red().bold()
            )?;
        }
        Notice::Cancelled => {
            writeln!(out, "{}", "Command execution cancelled.".yellow().bold())?;
        }
        Notice::NoCommand => {
            writeln!(
                out,
                "{}",
                "Could not determine a command to execute. Please try another question."
                    .red()
                    .bold()
            )?;
        }
        Notice::ModelFailed(err) => {
            writeln!(
                out,
                "{}",
                format!("Error communicating with the model: {}", err).red().bold()
            )?;
            writeln!(
                out,
                "{}",
                "Please ensure the model server is running and the specified model is available."
                    .yellow()
                    .bold()
            )?;
        }
        Notice::Answer(text) => {
            let panel = Panel::new("Assistant", Color::Magenta).block_of(text, Style::default());
            panel.write_to(out, width)?;
        }
        Notice::Goodbye => {
            writeln!(out, "\n{}", "Goodbye!".yellow().bold())?;
        }
    }
    out.flush()
}

/// Panel summarising a finished command: titled by outcome, output first.
pub fn execution_panel(result: &ExecutionResult) -> Panel {
    let stdout = result.stdout.trim();
    let stderr = result.stderr.trim();
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let heading = |text: &'static str| Line::styled(text, bold);

    let mut panel;
    if result.success() {
        panel = Panel::new("Success", Color::Green);
        if !stdout.is_empty() {
            panel = panel.line(heading("Output:")).block_of(stdout, Style::default());
        }
        if !stderr.is_empty() {
            panel = panel
                .line(Line::styled("Standard Error:", bold.fg(Color::Yellow)))
                .block_of(stderr, Style::default());
        }
    } else {
        panel = Panel::new("Error", Color::Red).line(Line::from(vec![
            Span::styled("Return Code: ", bold),
            Span::raw(result.exit_code.to_string()),
        ]));
        if !stdout.is_empty() {
            panel = panel
                .line(Line::default())
                .line(heading("Standard Output:"))
                .block_of(stdout, Style::default());
        }
        if !stderr.is_empty() {
            panel = panel
                .line(Line::default())
                .line(heading("Standard Error:"))
                .block_of(stderr, Style::default());
        }
    }

    if panel.body().lines.is_empty() {
        panel = panel.line(Line::styled(
            "Command executed with no output.",
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    panel
}
