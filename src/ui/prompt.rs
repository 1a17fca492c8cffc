//! Single-line input editor.
//!
//! Runs in raw mode so Ctrl-C and Ctrl-D arrive as keys rather than signals;
//! both end the session. Editing keys are handled by `tui-input`.

use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::queue;
use std::io::{self, Write};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

/// What a read from the user produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C, Ctrl-D on an empty line, or end of input.
    Interrupted,
}

/// Coloured label shown before the cursor, e.g. `You (Chat Mode)`.
#[derive(Debug, Clone)]
pub struct Label {
    pub text: String,
    pub color: Color,
}

/// Read one line interactively from the terminal.
pub fn read_line(label: &Label) -> io::Result<ReadOutcome> {
    let _guard = RawModeGuard::acquire()?;
    let mut stdout = io::stdout();
    let mut input = Input::default();

    loop {
        render(&mut stdout, label, &input)?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => {
                finish(&mut stdout)?;
                return Ok(ReadOutcome::Line(input.value().to_string()));
            }
            KeyCode::Char('c') if ctrl => {
                finish(&mut stdout)?;
                return Ok(ReadOutcome::Interrupted);
            }
            KeyCode::Char('d') if ctrl && input.value().is_empty() => {
                finish(&mut stdout)?;
                return Ok(ReadOutcome::Interrupted);
            }
            _ => {
                input.handle_event(&Event::Key(key));
            }
        }
    }
}

/// Redraw the prompt line, scrolling the input horizontally when it overflows.
fn render<W: Write>(out: &mut W, label: &Label, input: &Input) -> io::Result<()> {
    let (cols, _) = terminal::size().unwrap_or((80, 24));
    let prefix_width = label.text.chars().count() as u16 + 2;
    let room = cols.saturating_sub(prefix_width + 1).max(1) as usize;

    let scroll = input.visual_scroll(room);
    let visible: String = input.value().chars().skip(scroll).take(room).collect();
    let cursor = prefix_width + (input.visual_cursor().saturating_sub(scroll)) as u16;

    queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        SetForegroundColor(label.color),
        SetAttribute(Attribute::Bold),
        Print(&label.text),
        SetAttribute(Attribute::Reset),
        ResetColor,
        Print(": "),
        Print(visible),
        MoveToColumn(cursor),
    )?;
    out.flush()
}

fn finish<W: Write>(out: &mut W) -> io::Result<()> {
    queue!(out, Print("\r\n"))?;
    out.flush()
}

/// Interpret a yes/no answer. An empty answer takes `default`; anything
/// unrecognised yields `None` so the question can be asked again.
pub fn parse_confirmation(answer: &str, default: bool) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Raw mode lifetime guard so terminal state is restored on any return path.
struct RawModeGuard;

impl RawModeGuard {
    fn acquire() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
