//! The interactive read-evaluate-render loop.

use crate::assistant;
use crate::conversation::History;
use crate::exec::Executor;
use crate::llm::ChatModel;
use crate::mode::{Directive, Mode, SystemPrompts};
use crate::normalize::normalize;
use crate::ui::{Console, Notice, ReadOutcome};
use anyhow::Result;
use std::future::Future;
use tracing::{debug, info, warn};

/// Whether the loop keeps going after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// How a model request ended.
enum Reply {
    Answer(String),
    /// Already reported to the user.
    Failed,
    Interrupted,
}

/// One interactive session: the current mode plus the conversation so far.
pub struct Session<M, E, C> {
    model: M,
    executor: E,
    console: C,
    prompts: SystemPrompts,
    mode: Mode,
    history: History,
}

impl<M, E, C> Session<M, E, C>
where
    M: ChatModel,
    E: Executor,
    C: Console,
{
    pub fn new(model: M, executor: E, console: C, prompts: SystemPrompts, mode: Mode) -> Self {
        let history = History::new(prompts.for_mode(mode));
        Self {
            model,
            executor,
            console,
            prompts,
            mode,
            history,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Run until the user quits or interrupts. Model and command failures are
    /// reported and never end the loop; only console I/O errors do.
    pub async fn run(&mut self) -> Result<()> {
        info!(mode = %self.mode, "session started");
        while self.step().await? == Flow::Continue {}
        info!(turns = (self.history.len() - 1) / 2, "session ended");
        Ok(())
    }

    async fn step(&mut self) -> Result<Flow> {
        let line = match self.console.read_line(self.mode).await? {
            ReadOutcome::Line(line) => line,
            ReadOutcome::Interrupted => return self.farewell(),
        };

        match Directive::parse(&line) {
            Directive::Empty => Ok(Flow::Continue),
            Directive::Exit => self.farewell(),
            Directive::Switch(mode) => {
                self.switch_mode(mode)?;
                Ok(Flow::Continue)
            }
            Directive::Ask(question) => match self.mode {
                Mode::Command => self.suggest_command(&question).await,
                Mode::Chat => self.chat(&question).await,
            },
        }
    }

    fn switch_mode(&mut self, mode: Mode) -> Result<()> {
        debug!(from = %self.mode, to = %mode, "switching mode");
        self.mode = mode;
        self.history.set_system(self.prompts.for_mode(mode));
        self.console.show(Notice::ModeSwitched(mode))
    }

    async fn suggest_command(&mut self, question: &str) -> Result<Flow> {
        let raw = match self.query(question).await? {
            Reply::Answer(text) => text,
            Reply::Failed => String::new(),
            Reply::Interrupted => return self.farewell(),
        };

        let command = normalize(&raw);
        if command.is_empty() {
            self.console.show(Notice::NoCommand)?;
            return Ok(Flow::Continue);
        }

        self.console.show(Notice::SuggestedCommand(command.clone()))?;
        match self.console.confirm(true).await? {
            None => self.farewell(),
            Some(false) => {
                self.console.show(Notice::Cancelled)?;
                Ok(Flow::Continue)
            }
            Some(true) => self.execute(&command).await,
        }
    }

    async fn chat(&mut self, question: &str) -> Result<Flow> {
        match self.query(question).await? {
            Reply::Answer(text) if !text.is_empty() => {
                self.console.show(Notice::Answer(text))?;
                Ok(Flow::Continue)
            }
            Reply::Answer(_) | Reply::Failed => Ok(Flow::Continue),
            Reply::Interrupted => self.farewell(),
        }
    }

    /// Ask the model, giving up immediately if the user interrupts.
    async fn query(&mut self, question: &str) -> Result<Reply> {
        self.console.show(Notice::Thinking {
            backend: self.model.name().to_string(),
            model: self.model.model().to_string(),
        })?;

        let outcome = tokio::select! {
            biased;
            _ = self.console.interrupted() => None,
            result = assistant::ask(&self.model, &mut self.history, question) => Some(result),
        };

        match outcome {
            None => Ok(Reply::Interrupted),
            Some(Ok(text)) => Ok(Reply::Answer(text)),
            Some(Err(err)) => {
                self.console.show(Notice::ModelFailed(err))?;
                Ok(Reply::Failed)
            }
        }
    }

    async fn execute(&mut self, command: &str) -> Result<Flow> {
        self.console.show(Notice::Executing(command.to_string()))?;

        let outcome = tokio::select! {
            biased;
            _ = self.console.interrupted() => None,
            result = self.executor.run(command) => Some(result),
        };

        match outcome {
            None => return self.farewell(),
            Some(Ok(result)) => self.console.show(Notice::Execution(result))?,
            Some(Err(err)) => self.console.show(Notice::ExecutionFailed(err))?,
        }
        Ok(Flow::Continue)
    }

    fn farewell(&mut self) -> Result<Flow> {
        self.console.show(Notice::Goodbye)?;
        Ok(Flow::Exit)
    }
}

/// Run the startup reachability `check`, warning when it fails. Returns
/// `false` if the user interrupted it; the farewell has been shown by then.
pub async fn preflight<C, F>(console: &mut C, check: F) -> Result<bool>
where
    C: Console,
    F: Future<Output = Result<()>>,
{
    let outcome = tokio::select! {
        biased;
        _ = console.interrupted() => None,
        result = check => Some(result),
    };

    match outcome {
        None => {
            console.show(Notice::Goodbye)?;
            Ok(false)
        }
        Some(Err(err)) => {
            warn!("Backend health check failed: {:#}", err);
            console.show(Notice::BackendUnreachable(format!("{:#}", err)))?;
            Ok(true)
        }
        Some(Ok(())) => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::tests::ScriptedModel;
    use crate::context::Environment;
    use crate::conversation::{Message, Role};
    use crate::exec::tests::RecordingExecutor;
    use crate::exec::ExecutionResult;
    use crate::ui::tests::ScriptedConsole;
    use std::path::PathBuf;

    type TestSession = Session<ScriptedModel, RecordingExecutor, ScriptedConsole>;

    fn prompts() -> SystemPrompts {
        let env = Environment {
            cwd: PathBuf::from("/tmp"),
            shell: "/bin/bash".to_string(),
            os: "Linux".to_string(),
            distro: None,
            local_time: "10:00 AM on Friday, May 02, 2025".to_string(),
        };
        SystemPrompts::new(&env, true, None)
    }

    fn session(model: ScriptedModel, console: ScriptedConsole, mode: Mode) -> TestSession {
        Session::new(model, RecordingExecutor::ok("a\nb\n"), console, prompts(), mode)
    }

    fn count(shown: &[Notice], pred: impl Fn(&Notice) -> bool) -> usize {
        shown.iter().filter(|n| pred(n)).count()
    }

    #[tokio::test]
    async fn test_declined_command_is_not_executed() {
        let model = ScriptedModel::new().reply("ls");
        let console = ScriptedConsole::lines(&["list files"]).answer(false);
        let mut session = session(model, console, Mode::Command);

        session.run().await.unwrap();

        assert!(session.executor.runs().is_empty());
        assert_eq!(
            session.history().messages(),
            &[
                Message::system(prompts().for_mode(Mode::Command)),
                Message::user("list files"),
                Message::assistant("ls"),
            ]
        );
        let shown = &session.console.shown;
        assert!(shown
            .iter()
            .any(|n| matches!(n, Notice::SuggestedCommand(c) if c == "ls")));
        assert_eq!(count(shown, |n| matches!(n, Notice::Cancelled)), 1);
        // Input ran out afterwards, which ends the session like Ctrl-D.
        assert!(matches!(shown.last(), Some(Notice::Goodbye)));
        assert_eq!(session.console.prompts.len(), 2);
    }

    #[tokio::test]
    async fn test_confirmed_command_runs_normalized() {
        let model = ScriptedModel::new().reply("```bash\nls -la\n```");
        let console = ScriptedConsole::lines(&["show everything here"]).answer(true);
        let mut session = session(model, console, Mode::Command);

        session.run().await.unwrap();

        assert_eq!(session.executor.runs(), vec!["ls -la".to_string()]);
        // History keeps the raw completion.
        assert_eq!(
            session.history().messages()[2],
            Message::assistant("```bash\nls -la\n```")
        );
        let shown = &session.console.shown;
        assert!(shown
            .iter()
            .any(|n| matches!(n, Notice::Executing(c) if c == "ls -la")));
        assert!(shown.iter().any(|n| matches!(
            n,
            Notice::Execution(ExecutionResult { exit_code: 0, .. })
        )));
    }

    #[tokio::test]
    async fn test_blank_input_never_reaches_model() {
        let console = ScriptedConsole::lines(&["", "   ", "\t"]);
        let mut session = session(ScriptedModel::new(), console, Mode::Command);

        session.run().await.unwrap();

        assert_eq!(session.model.calls(), 0);
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.console.prompts.len(), 4);
    }

    #[tokio::test]
    async fn test_mode_round_trip_restores_system_message() {
        let model = ScriptedModel::new().reply("pwd");
        let console = ScriptedConsole::lines(&["where am i", "/chat", "/command"]).answer(false);
        let mut session = session(model, console, Mode::Command);
        let original_system = prompts().for_mode(Mode::Command).to_string();

        session.run().await.unwrap();

        let messages = session.history().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], Message::system(original_system));
        assert_eq!(messages[1], Message::user("where am i"));
        assert_eq!(messages[2], Message::assistant("pwd"));
        assert_eq!(session.mode(), Mode::Command);
        assert_eq!(
            session.console.prompts,
            vec![Mode::Command, Mode::Command, Mode::Chat, Mode::Command]
        );
    }

    #[tokio::test]
    async fn test_switch_to_chat_replaces_system_in_place() {
        let model = ScriptedModel::new().reply("ls").reply("It lists files.");
        let console = ScriptedConsole::lines(&["list files", "/CHAT", "what does it do?"]).answer(false);
        let mut session = session(model, console, Mode::Command);

        session.run().await.unwrap();

        let messages = session.history().messages();
        assert_eq!(messages[0].content, prompts().for_mode(Mode::Chat));
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        // The chat request carried the earlier command turn.
        assert_eq!(session.model.seen.lock().unwrap()[1].len(), 4);
        assert!(session
            .console
            .shown
            .iter()
            .any(|n| matches!(n, Notice::Answer(t) if t == "It lists files.")));
        assert!(session
            .console
            .shown
            .iter()
            .any(|n| matches!(n, Notice::ModeSwitched(Mode::Chat))));
    }

    #[tokio::test]
    async fn test_chat_failure_rolls_back_and_continues() {
        let model = ScriptedModel::new().reply("Hello!").fail().reply("Still here.");
        let console = ScriptedConsole::lines(&["hi", "tell me more", "again"]);
        let mut session = session(model, console, Mode::Chat);

        session.run().await.unwrap();

        let messages = session.history().messages();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[3], Message::user("again"));
        let shown = &session.console.shown;
        assert_eq!(count(shown, |n| matches!(n, Notice::ModelFailed(_))), 1);
        assert_eq!(count(shown, |n| matches!(n, Notice::Answer(_))), 2);
    }

    #[tokio::test]
    async fn test_command_failure_reports_and_skips_execution() {
        let model = ScriptedModel::new().fail();
        let console = ScriptedConsole::lines(&["list files"]);
        let mut session = session(model, console, Mode::Command);

        session.run().await.unwrap();

        assert_eq!(session.history().len(), 1);
        assert!(session.executor.runs().is_empty());
        let shown = &session.console.shown;
        assert_eq!(count(shown, |n| matches!(n, Notice::ModelFailed(_))), 1);
        assert_eq!(count(shown, |n| matches!(n, Notice::NoCommand)), 1);
        assert_eq!(count(shown, |n| matches!(n, Notice::SuggestedCommand(_))), 0);
    }

    #[tokio::test]
    async fn test_empty_completion_is_no_command() {
        let model = ScriptedModel::new().reply("```\n```");
        let console = ScriptedConsole::lines(&["do nothing"]);
        let mut session = session(model, console, Mode::Command);

        session.run().await.unwrap();

        // The exchange itself succeeded.
        assert_eq!(session.history().len(), 3);
        assert!(session.executor.runs().is_empty());
        assert_eq!(
            count(&session.console.shown, |n| matches!(n, Notice::NoCommand)),
            1
        );
    }

    #[tokio::test]
    async fn test_empty_chat_answer_renders_nothing() {
        let model = ScriptedModel::new().reply("   ");
        let console = ScriptedConsole::lines(&["..."]);
        let mut session = session(model, console, Mode::Chat);

        session.run().await.unwrap();

        assert_eq!(session.history().len(), 3);
        assert_eq!(
            count(&session.console.shown, |n| matches!(n, Notice::Answer(_))),
            0
        );
    }

    #[tokio::test]
    async fn test_exit_stops_reading() {
        let console = ScriptedConsole::lines(&["Quit", "list files"]);
        let mut session = session(ScriptedModel::new(), console, Mode::Command);

        session.run().await.unwrap();

        assert_eq!(session.model.calls(), 0);
        assert_eq!(session.console.input.len(), 1);
        assert!(matches!(session.console.shown.last(), Some(Notice::Goodbye)));
    }

    #[tokio::test]
    async fn test_interrupt_during_model_call_rolls_back() {
        let model = ScriptedModel::new().reply("ls");
        let mut console = ScriptedConsole::lines(&["list files", "never read"]);
        console.interrupt_at = Some(0);
        let mut session = session(model, console, Mode::Command);

        session.run().await.unwrap();

        assert_eq!(session.history().len(), 1);
        assert_eq!(session.console.input.len(), 1);
        assert!(matches!(session.console.shown.last(), Some(Notice::Goodbye)));
    }

    #[tokio::test]
    async fn test_interrupt_during_execution_ends_session() {
        let model = ScriptedModel::new().reply("sleep 60");
        let mut console = ScriptedConsole::lines(&["wait a minute", "never read"]).answer(true);
        console.interrupt_at = Some(1);
        let mut session = session(model, console, Mode::Command);

        session.run().await.unwrap();

        // The executor was never polled, so nothing was recorded as run.
        assert!(session.executor.runs().is_empty());
        assert_eq!(session.history().len(), 3);
        assert_eq!(session.console.input.len(), 1);
        let shown = &session.console.shown;
        assert!(shown
            .iter()
            .any(|n| matches!(n, Notice::Executing(c) if c == "sleep 60")));
        assert_eq!(count(shown, |n| matches!(n, Notice::Execution(_))), 0);
        assert_eq!(count(shown, |n| matches!(n, Notice::ExecutionFailed(_))), 0);
        assert!(matches!(shown.last(), Some(Notice::Goodbye)));
    }

    #[tokio::test]
    async fn test_interrupt_at_confirmation_ends_session() {
        let model = ScriptedModel::new().reply("rm -rf build");
        // No scripted answer: the confirmation reads as an interrupt.
        let console = ScriptedConsole::lines(&["clean up", "never read"]);
        let mut session = session(model, console, Mode::Command);

        session.run().await.unwrap();

        assert!(session.executor.runs().is_empty());
        assert_eq!(session.console.input.len(), 1);
        assert_eq!(
            count(&session.console.shown, |n| matches!(n, Notice::Goodbye)),
            1
        );
    }

    #[tokio::test]
    async fn test_preflight_warns_and_continues() {
        let mut console = ScriptedConsole::default();
        let proceed = preflight(&mut console, async {
            Err(anyhow::anyhow!("connection refused"))
        })
        .await
        .unwrap();

        assert!(proceed);
        assert!(matches!(
            console.shown.as_slice(),
            [Notice::BackendUnreachable(reason)] if reason.contains("connection refused")
        ));
    }

    #[tokio::test]
    async fn test_preflight_success_is_silent() {
        let mut console = ScriptedConsole::default();
        assert!(preflight(&mut console, async { Ok(()) }).await.unwrap());
        assert!(console.shown.is_empty());
    }

    #[tokio::test]
    async fn test_interrupted_preflight_says_goodbye() {
        let mut console = ScriptedConsole::default();
        console.interrupt_at = Some(0);
        let proceed = preflight(&mut console, std::future::pending::<Result<()>>())
            .await
            .unwrap();

        assert!(!proceed);
        assert!(matches!(console.shown.as_slice(), [Notice::Goodbye]));
    }

    #[tokio::test]
    async fn test_thinking_names_backend_and_model() {
        let model = ScriptedModel::new().reply("Sure.");
        let console = ScriptedConsole::lines(&["hello"]);
        let mut session = session(model, console, Mode::Chat);

        session.run().await.unwrap();

        assert!(session.console.shown.iter().any(|n| matches!(
            n,
            Notice::Thinking { backend, model } if backend == "scripted" && model == "test-model"
        )));
    }
}
