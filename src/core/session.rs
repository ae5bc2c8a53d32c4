//! The console session: registry, execution buffer and dispatcher.
//!
//! [`ConsoleSession`] owns every piece of console state. Statements are split
//! into the execution buffer and drained by [`ConsoleSession::pump`]; each
//! drained statement is resolved and dispatched to a command handler, a
//! variable read/write or an alias expansion. Handlers get `&mut
//! ConsoleSession` and may re-enter `execute`, so the pump never holds a
//! slot or an entry reference across a handler call.

use std::fmt;
use std::time::Duration;

use bevy::log::{debug, info, warn};
use bevy::prelude::{Resource, World};

use super::alias::{ConAlias, expand_alias};
use super::builtins::register_builtins;
use super::completion::{
    Completion, CompletionCandidate, CompletionMode, CompletionState, complete,
};
use super::concommand::{CommandArgs, CommandHandler, ConCommand};
use super::convar::{ConValue, ConVar, ConVarFlags, ConVarValue};
use super::error::{ConsoleError, VarError};
use super::events::{ConVarChangedEvent, ConsoleOutputEvent, LineStyle};
use super::permissions::{CommandFlags, CommandSource, HostCapabilities, check_command_access};
use super::registry::{ConsoleRegistry, EntryKind, Resolution};
use super::scheduler::{Clock, ExecBuffer, ScheduledStatement};
use super::tokenizer::{ArgumentVector, split_statements, tokenize};
use crate::config::ConsoleConfig;

/// Work a handler wants done with exclusive access to the ECS world.
pub type WorldAction = Box<dyn FnOnce(&mut World) + Send + Sync>;

/// Name of the variable selecting the completion mode.
pub const COMPLETION_VAR: &str = "con-completion";

/// Name of the variable that silences variable-set echoes.
pub const VAR_SILENT_VAR: &str = "con-var-silent";

/// Summary of one [`ConsoleSession::pump`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
    /// Drain passes that found due work.
    pub passes: usize,
    pub dispatched: usize,
    pub failed: usize,
    /// The pass cap was reached and the buffer discarded.
    pub overflowed: bool,
}

/// What a statement resolved to, detached from the registry.
enum Target {
    Command {
        name: String,
        flags: CommandFlags,
        handler: CommandHandler,
    },
    Variable(String),
    Alias {
        name: String,
        template: String,
    },
    Unknown,
}

impl Target {
    fn of(resolution: Option<Resolution<'_>>) -> Self {
        match resolution {
            Some(Resolution::Command(cmd)) => Target::Command {
                name: cmd.name().to_owned(),
                flags: cmd.get_flags(),
                handler: cmd.handler(),
            },
            Some(Resolution::Variable(var)) => Target::Variable(var.name().to_owned()),
            Some(Resolution::Alias(alias)) => Target::Alias {
                name: alias.name().to_owned(),
                template: alias.template().to_owned(),
            },
            None => Target::Unknown,
        }
    }
}

/// A console session.
///
/// # Examples
///
/// ```
/// use bevy_console_runtime::prelude::*;
///
/// let mut session = ConsoleSession::init(ConsoleConfig::default(), ManualClock::new());
/// session.register_var(ConVar::new("x", 0i32).range(0.0, 1.0)).unwrap();
///
/// assert!(!session.execute(CommandSource::Console, "x 5", false, false));
/// assert_eq!(session.get::<i32>("x"), Some(0));
///
/// assert!(session.execute(CommandSource::Console, "x force 5", false, false));
/// assert_eq!(session.get::<i32>("x"), Some(5));
/// ```
#[derive(Resource)]
pub struct ConsoleSession {
    config: ConsoleConfig,
    registry: ConsoleRegistry,
    buffer: ExecBuffer,
    clock: Box<dyn Clock>,
    host: HostCapabilities,
    output: Vec<ConsoleOutputEvent>,
    changes: Vec<ConVarChangedEvent>,
    world_actions: Vec<WorldAction>,
    completion: CompletionState,
    silent: bool,
    execute_depth: usize,
    /// Failed statements since init; `execute` compares before and after.
    failures: u64,
    clear_requested: bool,
    active: bool,
}

impl ConsoleSession {
    /// Start a session with the built-in commands and variables registered.
    pub fn init(config: ConsoleConfig, clock: impl Clock + 'static) -> Self {
        let mut session = Self {
            config,
            registry: ConsoleRegistry::new(),
            buffer: ExecBuffer::new(),
            clock: Box::new(clock),
            host: HostCapabilities::default(),
            output: Vec::new(),
            changes: Vec::new(),
            world_actions: Vec::new(),
            completion: CompletionState::default(),
            silent: false,
            execute_depth: 0,
            failures: 0,
            clear_requested: false,
            active: true,
        };
        register_builtins(&mut session);
        debug!(
            "Console: session started with {} entries",
            session.registry.len()
        );
        session
    }

    /// Drop all queued work and registered entries. Later `execute` calls
    /// return `false`.
    pub fn shutdown(&mut self) {
        self.buffer.clear();
        self.registry.clear();
        self.world_actions.clear();
        self.completion.reset();
        self.active = false;
        info!("Console: session shut down");
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    #[inline]
    pub fn registry(&self) -> &ConsoleRegistry {
        &self.registry
    }

    /// Direct registry access. Entries changed here skip change
    /// notifications.
    #[inline]
    pub fn registry_mut(&mut self) -> &mut ConsoleRegistry {
        &mut self.registry
    }

    #[inline]
    pub fn buffer(&self) -> &ExecBuffer {
        &self.buffer
    }

    #[inline]
    pub fn host(&self) -> &HostCapabilities {
        &self.host
    }

    #[inline]
    pub fn host_mut(&mut self) -> &mut HostCapabilities {
        &mut self.host
    }

    /// Current time of the session clock.
    #[inline]
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn set_clock(&mut self, clock: impl Clock + 'static) {
        self.clock = Box::new(clock);
    }

    /// Duration of `tics` at the configured tic rate.
    pub fn tics(&self, tics: f64) -> Duration {
        let rate = f64::from(self.config.tic_rate.max(1));
        if tics.is_nan() || tics <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(tics / rate).unwrap_or(Duration::MAX)
    }

    // ---------------------------------------------------------------
    // Execution
    // ---------------------------------------------------------------

    /// Split `text` into statements, queue them for now and pump the buffer.
    ///
    /// Returns `false` if any statement dispatched during the call failed to
    /// resolve, was denied or reported failure, or if the buffer overflowed.
    pub fn execute(
        &mut self,
        source: CommandSource,
        text: &str,
        silent: bool,
        network_originated: bool,
    ) -> bool {
        if !self.active {
            warn!("Console: execute after shutdown ignored: {:?}", text);
            return false;
        }
        if self.execute_depth >= self.config.max_execute_depth {
            self.buffer.clear();
            self.failures += 1;
            self.post_error("Console execution too deeply nested! Everything canceled.");
            warn!(
                "Console: nested execute depth {} reached, buffer discarded",
                self.execute_depth
            );
            return false;
        }

        let failures_before = self.failures;
        let was_silent = self.silent;
        self.silent |= silent;
        self.execute_depth += 1;

        self.enqueue_line(text, Duration::ZERO, source, network_originated, 0);
        self.pump();

        self.execute_depth -= 1;
        self.silent = was_silent;
        self.failures == failures_before
    }

    /// Execute formatted text.
    pub fn executef(&mut self, source: CommandSource, silent: bool, args: fmt::Arguments<'_>) -> bool {
        let text = args.to_string();
        self.execute(source, &text, silent, false)
    }

    /// Queue every statement of `text` to run after `delay`.
    pub fn schedule_after(
        &mut self,
        text: &str,
        delay: Duration,
        source: CommandSource,
        network_originated: bool,
    ) {
        self.enqueue_line(text, delay, source, network_originated, 0);
    }

    /// Queue `text` `count` times, at `interval`, `2 * interval` and so on.
    ///
    /// `count` is capped at [`ConsoleConfig::max_repeat_count`].
    pub fn schedule_repeat(
        &mut self,
        text: &str,
        count: u32,
        interval: Duration,
        source: CommandSource,
        network_originated: bool,
    ) {
        let limit = self.config.max_repeat_count;
        if count > limit {
            warn!(
                "Console: repeat count {} for {:?} capped at {}",
                count, text, limit
            );
        }
        for i in 1..=count.min(limit) {
            let delay = interval.saturating_mul(i);
            self.enqueue_line(text, delay, source, network_originated, 0);
        }
    }

    fn enqueue_line(
        &mut self,
        text: &str,
        delay: Duration,
        source: CommandSource,
        network: bool,
        alias_depth: usize,
    ) {
        let due = self.clock.now().saturating_add(delay);
        for statement in split_statements(text) {
            self.buffer.enqueue(ScheduledStatement {
                text: statement.to_owned(),
                due,
                source,
                network,
                alias_depth,
            });
        }
    }

    /// Drain due statements until a pass finds nothing due.
    ///
    /// After `max_drain_passes` passes with due work still left, the whole
    /// buffer is discarded.
    pub fn pump(&mut self) -> PumpReport {
        let mut report = PumpReport::default();

        while report.passes < self.config.max_drain_passes {
            let now = self.clock.now();
            if !self.buffer.has_due(now) {
                return report;
            }
            report.passes += 1;

            // The buffer may grow or reuse slots while a handler runs.
            let mut index = 0;
            while index < self.buffer.len() {
                if let Some(statement) = self.buffer.take_due(index, now) {
                    report.dispatched += 1;
                    if !self.dispatch(statement) {
                        report.failed += 1;
                        self.failures += 1;
                    }
                }
                index += 1;
            }
        }

        if self.buffer.has_due(self.clock.now()) {
            self.buffer.clear();
            self.failures += 1;
            report.overflowed = true;
            self.post_error("Console execution buffer overflow! Everything canceled.");
            warn!(
                "Console: execution buffer overflow after {} passes, buffer discarded",
                report.passes
            );
        }
        report
    }

    fn dispatch(&mut self, statement: ScheduledStatement) -> bool {
        let argv = tokenize(&statement.text);
        if argv.is_empty() {
            return true;
        }
        if let Some(group) = argv.unterminated() {
            let what = if group.delimiter == '"' { "quote" } else { "brace" };
            self.post_styled(
                LineStyle::YELLOW,
                format!(
                    "Warning: unterminated {what} in '{}'; the rest of the line was taken as one argument.",
                    statement.text.trim()
                ),
            );
        }

        match Target::of(self.registry.resolve(&argv)) {
            Target::Command {
                name,
                flags,
                handler,
            } => self.dispatch_command(&statement, &argv, &name, flags, handler),
            Target::Variable(name) => self.dispatch_variable(&name, &argv),
            Target::Alias { name, template } => {
                if let Some(limit) = self.config.max_alias_depth
                    && statement.alias_depth >= limit
                {
                    self.post_error(format!(
                        "Alias '{name}' exceeded the expansion depth limit ({limit})."
                    ));
                    return false;
                }
                let expanded = expand_alias(&template, &argv);
                self.enqueue_line(
                    &expanded,
                    Duration::ZERO,
                    statement.source,
                    statement.network,
                    statement.alias_depth + 1,
                );
                true
            }
            Target::Unknown => {
                self.post_error(format!(
                    "{}: unknown identifier, or command arguments invalid.",
                    argv.name()
                ));
                false
            }
        }
    }

    fn dispatch_command(
        &mut self,
        statement: &ScheduledStatement,
        argv: &ArgumentVector,
        name: &str,
        flags: CommandFlags,
        handler: CommandHandler,
    ) -> bool {
        if let Err(denied) =
            check_command_access(name, flags, statement.source, statement.network, &self.host)
        {
            if statement.network {
                warn!("Console: blocked remote command '{}': {}", name, denied);
            }
            self.post_error(denied.to_string());
            return false;
        }

        let args = CommandArgs::new(argv, statement.source, statement.network);
        match handler(self, &args) {
            Ok(()) => true,
            Err(err) => {
                self.post_error(err.to_string());
                self.post_error(format!("Error: '{name}' failed."));
                false
            }
        }
    }

    fn dispatch_variable(&mut self, name: &str, argv: &ArgumentVector) -> bool {
        let write = match (argv.argc(), argv.get(1)) {
            (2, Some(value)) => Some((value, false)),
            (3, Some(word)) if word.eq_ignore_ascii_case("force") => {
                argv.get(2).map(|value| (value, true))
            }
            _ => None,
        };

        if let Some((value, forced)) = write {
            if let Err(err) = self.set_var(name, value, forced) {
                self.post_error(err.to_string());
                return false;
            }
            if self.get::<bool>(VAR_SILENT_VAR).unwrap_or(false) {
                return true;
            }
        }

        // The change callback may have replaced or removed the variable.
        if let Some(line) = self.registry.var(name).map(ToString::to_string) {
            self.post(line);
        }
        true
    }

    // ---------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------

    pub fn register_cmd(&mut self, cmd: ConCommand) -> Result<(), ConsoleError> {
        self.registry.register_cmd(cmd)
    }

    /// Returns `Ok(false)` if an existing variable was replaced.
    pub fn register_var(&mut self, cvar: ConVar) -> Result<bool, ConsoleError> {
        self.registry.register_var(cvar)
    }

    pub fn register_alias(
        &mut self,
        name: &str,
        template: impl Into<String>,
    ) -> Result<(), ConsoleError> {
        self.registry.register_alias(ConAlias::new(name, template))
    }

    pub fn remove_alias(&mut self, name: &str) -> bool {
        self.registry.remove_alias(name).is_some()
    }

    /// Add a word offered by completion only.
    pub fn register_known_word(&mut self, word: &str) -> bool {
        self.registry.register_known_word(word)
    }

    /// Remove any entry named `name`.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.registry.remove(name).is_some()
    }

    // ---------------------------------------------------------------
    // Variables
    // ---------------------------------------------------------------

    pub fn get_var(&self, name: &str) -> Option<&ConVar> {
        self.registry.var(name)
    }

    /// Typed value of a variable.
    pub fn get<T: ConVarValue>(&self, name: &str) -> Option<T> {
        self.registry.var(name).and_then(|var| T::from_value(var.value()))
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.registry.var(name).map(|var| var.value().to_string())
    }

    fn var_or_unknown(&self, name: &str) -> Result<&ConVar, VarError> {
        self.registry.var(name).ok_or_else(|| VarError::Unknown {
            name: name.to_owned(),
        })
    }

    /// Set a variable from console text.
    pub fn set_var(&mut self, name: &str, raw: &str, forced: bool) -> Result<(), VarError> {
        let value = self.var_or_unknown(name)?.prepare_write(raw, forced)?;
        self.commit(name, value);
        Ok(())
    }

    /// Set a variable from a typed value, with the same checks as
    /// [`ConsoleSession::set_var`].
    pub fn set<T: ConVarValue>(&mut self, name: &str, value: T, forced: bool) -> Result<(), VarError> {
        let raw = value.into_value().to_string();
        self.set_var(name, &raw, forced)
    }

    /// Offset a numeric variable by `delta`.
    pub fn add_var(&mut self, name: &str, delta: f64, forced: bool) -> Result<(), VarError> {
        let value = self.var_or_unknown(name)?.prepare_offset(delta, forced)?;
        self.commit(name, value);
        Ok(())
    }

    pub fn inc_var(&mut self, name: &str, forced: bool) -> Result<(), VarError> {
        self.add_var(name, 1.0, forced)
    }

    pub fn dec_var(&mut self, name: &str, forced: bool) -> Result<(), VarError> {
        self.add_var(name, -1.0, forced)
    }

    /// Flip a numeric variable between zero and one.
    pub fn toggle_var(&mut self, name: &str, forced: bool) -> Result<(), VarError> {
        let value = self.var_or_unknown(name)?.prepare_toggle(forced)?;
        self.commit(name, value);
        Ok(())
    }

    /// Restore the registered default. Bounds and protection do not apply;
    /// read-only variables are still refused.
    pub fn reset_var(&mut self, name: &str) -> Result<(), VarError> {
        let var = self.var_or_unknown(name)?;
        if var.get_flags().contains(ConVarFlags::READ_ONLY) {
            return Err(VarError::ReadOnly {
                name: var.name().to_owned(),
            });
        }
        let value = var.default_value().clone();
        self.commit(name, value);
        Ok(())
    }

    /// Store a checked value, record the change and run the callback.
    fn commit(&mut self, name: &str, value: ConValue) {
        let Some(var) = self.registry.var_mut(name) else {
            return;
        };
        let old = var.replace_value(value);
        let canonical = var.name().to_owned();
        let callback = var.change_callback();

        if &old != var.value() {
            let new = var.value().to_string();
            self.changes
                .push(ConVarChangedEvent::new(canonical.as_str(), old.to_string(), new));
        }
        if let Some(callback) = callback {
            callback(self, &canonical);
        }
    }

    // ---------------------------------------------------------------
    // Completion
    // ---------------------------------------------------------------

    /// Mode selected by `con-completion`, or the configured default.
    pub fn completion_mode(&self) -> CompletionMode {
        self.get::<i32>(COMPLETION_VAR)
            .map(CompletionMode::from_int)
            .unwrap_or(self.config.completion_mode)
    }

    /// Complete a word with the current mode.
    pub fn complete_word(&mut self, partial: &str) -> Option<Completion> {
        let mode = self.completion_mode();
        self.complete_word_with(partial, mode)
    }

    /// Complete a word. In list mode with several matches, the matches are
    /// posted grouped by kind.
    pub fn complete_word_with(&mut self, partial: &str, mode: CompletionMode) -> Option<Completion> {
        let candidates: Vec<CompletionCandidate> = self
            .registry
            .completions(partial)
            .into_iter()
            .map(|(name, kind)| CompletionCandidate {
                name: name.to_owned(),
                kind,
            })
            .collect();

        let result = complete(&candidates, partial, mode, &mut self.completion)?;
        if mode == CompletionMode::List && result.match_count > 1 {
            self.post_matches(&candidates);
        }
        Some(result)
    }

    fn post_matches(&mut self, candidates: &[CompletionCandidate]) {
        const GROUPS: [(EntryKind, LineStyle); 4] = [
            (EntryKind::Command, LineStyle::CYAN),
            (EntryKind::Variable, LineStyle::GREEN),
            (EntryKind::Alias, LineStyle::YELLOW),
            (EntryKind::KnownWord, LineStyle::NONE),
        ];

        for (kind, style) in GROUPS {
            for candidate in candidates.iter().filter(|c| c.kind == kind) {
                let line = match self.registry.var(&candidate.name) {
                    Some(var) if kind == EntryKind::Variable => format!("  {var}"),
                    _ => format!("  {}", candidate.name),
                };
                self.post_styled(style, line);
            }
        }
    }

    /// Complete the last word of an edit line and return the new line.
    ///
    /// Words are delimited by space, `;` and `"`. In cycle mode, calling
    /// again with the returned line steps to the next match.
    pub fn complete_line(&mut self, line: &str) -> String {
        let mode = self.completion_mode();

        if mode == CompletionMode::Cycle
            && self.completion.last_line.as_deref() == Some(line)
            && let Some(word) = self.completion.last_word.clone()
        {
            let prefix = std::mem::take(&mut self.completion.line_prefix);
            return self.finish_line(prefix, &word, mode);
        }

        let start = line.rfind([' ', ';', '"']).map_or(0, |i| i + 1);
        let (prefix, word) = line.split_at(start);
        if word.is_empty() {
            return line.to_owned();
        }
        self.finish_line(prefix.to_owned(), word, mode)
    }

    fn finish_line(&mut self, prefix: String, word: &str, mode: CompletionMode) -> String {
        match self.complete_word_with(word, mode) {
            Some(done) => {
                let line = format!("{prefix}{}", done.replacement);
                self.completion.last_line = Some(line.clone());
                self.completion.line_prefix = prefix;
                line
            }
            None => {
                self.completion.last_line = None;
                format!("{prefix}{word}")
            }
        }
    }

    // ---------------------------------------------------------------
    // Output and host bridge
    // ---------------------------------------------------------------

    /// Post a line to the output sink. Dropped while silent.
    pub fn post(&mut self, text: impl Into<String>) {
        self.post_styled(LineStyle::NONE, text);
    }

    pub fn post_styled(&mut self, style: LineStyle, text: impl Into<String>) {
        if self.silent {
            return;
        }
        self.output.push(ConsoleOutputEvent::styled(style, text));
    }

    pub fn post_error(&mut self, text: impl Into<String>) {
        self.post_styled(LineStyle::RED | LineStyle::LIGHT, text);
    }

    #[inline]
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn drain_output(&mut self) -> Vec<ConsoleOutputEvent> {
        std::mem::take(&mut self.output)
    }

    pub fn drain_changes(&mut self) -> Vec<ConVarChangedEvent> {
        std::mem::take(&mut self.changes)
    }

    /// Ask the host to clear the visual console.
    pub fn request_clear(&mut self) {
        self.clear_requested = true;
    }

    pub fn take_clear_request(&mut self) -> bool {
        std::mem::take(&mut self.clear_requested)
    }

    /// Queue work that needs the ECS world. The host applies it after the
    /// buffer has been pumped.
    pub fn queue_world_action<F>(&mut self, action: F)
    where
        F: FnOnce(&mut World) + Send + Sync + 'static,
    {
        self.world_actions.push(Box::new(action));
    }

    pub fn take_world_actions(&mut self) -> Vec<WorldAction> {
        std::mem::take(&mut self.world_actions)
    }
}

impl fmt::Debug for ConsoleSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSession")
            .field("entries", &self.registry.len())
            .field("queued", &self.buffer.queued())
            .field("host", &self.host)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// Execute formatted text on a session.
///
/// ```
/// use bevy_console_runtime::console_exec;
/// use bevy_console_runtime::prelude::*;
///
/// let mut session = ConsoleSession::init(ConsoleConfig::default(), ManualClock::new());
/// session.register_var(ConVar::new("fov", 90i32)).unwrap();
/// let fov = 100;
/// assert!(console_exec!(session, CommandSource::Direct, "fov {}", fov));
/// assert_eq!(session.get::<i32>("fov"), Some(100));
/// ```
#[macro_export]
macro_rules! console_exec {
    ($session:expr, $source:expr, $($arg:tt)*) => {
        $session.executef($source, false, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scheduler::ManualClock;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn session() -> (ConsoleSession, ManualClock) {
        let clock = ManualClock::new();
        let session = ConsoleSession::init(ConsoleConfig::default(), clock.clone());
        (session, clock)
    }

    fn texts(session: &mut ConsoleSession) -> Vec<String> {
        session.drain_output().into_iter().map(|e| e.text).collect()
    }

    fn counter(session: &mut ConsoleSession, name: &'static str) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        session
            .register_cmd(ConCommand::new(name, move |_session, _args| {
                seen.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }))
            .unwrap();
        count
    }

    #[test]
    fn test_execute_runs_every_statement() {
        let (mut session, _) = session();
        assert!(session.execute(CommandSource::Console, "echo a; echo \"b;c\"", false, false));
        assert_eq!(texts(&mut session), vec!["a", "b;c"]);
    }

    #[test]
    fn test_unknown_identifier_fails_but_siblings_run() {
        let (mut session, _) = session();
        assert!(!session.execute(CommandSource::Console, "nope; echo after", false, false));
        assert_eq!(
            texts(&mut session),
            vec![
                "nope: unknown identifier, or command arguments invalid.",
                "after"
            ]
        );
    }

    #[test]
    fn test_clamp_or_reject() {
        let (mut session, _) = session();
        session
            .register_var(ConVar::new("x", 0i32).range(0.0, 1.0))
            .unwrap();

        assert!(!session.execute(CommandSource::Console, "x 5", false, false));
        assert_eq!(session.get::<i32>("x"), Some(0));
        assert_eq!(texts(&mut session), vec!["Error: 0 <= x <= 1"]);

        assert!(session.execute(CommandSource::Console, "x force 5", false, false));
        assert_eq!(session.get::<i32>("x"), Some(5));
        assert_eq!(texts(&mut session), vec!["\"x\" = \"5\""]);
    }

    #[test]
    fn test_read_only_is_immutable() {
        let (mut session, _) = session();
        session
            .register_var(ConVar::new("ro", 0i32).flags(ConVarFlags::READ_ONLY))
            .unwrap();

        assert!(session.set_var("ro", "1", false).is_err());
        assert!(session.set_var("ro", "1", true).is_err());
        assert!(!session.execute(CommandSource::Console, "ro force 1", false, false));
        assert!(session.reset_var("ro").is_err());
        assert_eq!(session.get::<i32>("ro"), Some(0));
    }

    #[test]
    fn test_protected_needs_force_word() {
        let (mut session, _) = session();
        session
            .register_var(ConVar::new("sv-secret", 3i32).flags(ConVarFlags::PROTECTED))
            .unwrap();

        assert!(!session.execute(CommandSource::Console, "sv-secret 7", false, false));
        assert_eq!(session.get::<i32>("sv-secret"), Some(3));
        let out = texts(&mut session);
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("sv-secret is protected."));
        assert!(out[0].contains("'sv-secret force 7'"));

        assert!(session.execute(CommandSource::Console, "sv-secret FORCE 7", false, false));
        assert_eq!(session.get::<i32>("sv-secret"), Some(7));
        assert_eq!(texts(&mut session), vec!["\"sv-secret\" = \"7\""]);
    }

    #[test]
    fn test_variable_print_forms() {
        let (mut session, _) = session();
        session.register_var(ConVar::new("name", String::from("player"))).unwrap();

        assert!(session.execute(CommandSource::Console, "name", false, false));
        assert!(session.execute(CommandSource::Console, "name a b c", false, false));
        assert_eq!(
            texts(&mut session),
            vec!["\"name\" = \"player\"", "\"name\" = \"player\""]
        );
    }

    #[test]
    fn test_var_silent_suppresses_set_echo() {
        let (mut session, _) = session();
        session.register_var(ConVar::new("fov", 90i32)).unwrap();
        session.set_var(VAR_SILENT_VAR, "1", false).unwrap();

        assert!(session.execute(CommandSource::Console, "fov 100", false, false));
        assert!(texts(&mut session).is_empty());
        assert_eq!(session.get::<i32>("fov"), Some(100));
    }

    #[test]
    fn test_change_callback_and_reresolve() {
        let (mut session, _) = session();
        session
            .register_var(ConVar::new("fov", 90i32).on_change(|session, name| {
                let value = session.get::<i32>(name).unwrap_or_default();
                // rebuild the entry with a new default
                session
                    .register_var(ConVar::new("fov", value).description("rebuilt"))
                    .unwrap();
            }))
            .unwrap();

        assert!(session.execute(CommandSource::Console, "fov 110", false, false));
        assert_eq!(texts(&mut session), vec!["\"fov\" = \"110\""]);
        assert_eq!(session.get_var("fov").map(ConVar::get_description), Some("rebuilt"));

        let changes = session.drain_changes();
        assert_eq!(changes, vec![ConVarChangedEvent::new("fov", "90", "110")]);
    }

    #[test]
    fn test_alias_expansion_keeps_source() {
        let (mut session, _) = session();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        session
            .register_cmd(ConCommand::new("capture", move |_session, args| {
                if let Ok(mut log) = log.lock() {
                    log.push((args.join_from(0, " "), args.source(), args.is_network()));
                }
                Ok(())
            }))
            .unwrap();
        session.register_alias("foo", "capture %1 and %2").unwrap();

        assert!(session.execute(CommandSource::Bind, "foo a b", false, false));
        let seen = seen.lock().map(|v| v.clone()).unwrap_or_default();
        assert_eq!(seen, vec![("a and b".to_string(), CommandSource::Bind, false)]);
    }

    #[test]
    fn test_self_referential_alias_overflows() {
        let (mut session, _) = session();
        session.register_alias("loop", "loop").unwrap();

        session.enqueue_line("loop", Duration::ZERO, CommandSource::Console, false, 0);
        let report = session.pump();
        assert_eq!(report.passes, 100);
        assert!(report.overflowed);
        assert_eq!(session.buffer().queued(), 0);

        assert!(!session.execute(CommandSource::Console, "loop", false, false));
        assert!(
            texts(&mut session)
                .iter()
                .any(|l| l == "Console execution buffer overflow! Everything canceled.")
        );
    }

    #[test]
    fn test_alias_depth_limit() {
        let config = ConsoleConfig {
            max_alias_depth: Some(3),
            ..Default::default()
        };
        let mut session = ConsoleSession::init(config, ManualClock::new());
        session.register_alias("loop", "loop").unwrap();

        assert!(!session.execute(CommandSource::Console, "loop", false, false));
        let out = texts(&mut session);
        assert_eq!(out, vec!["Alias 'loop' exceeded the expansion depth limit (3)."]);
    }

    #[test]
    fn test_repeat_scheduling() {
        let (mut session, clock) = session();
        clock.set(Duration::from_secs(10));
        let bumps = counter(&mut session, "bump");

        session.schedule_repeat("bump", 3, Duration::from_secs(1), CommandSource::Console, false);
        let dues: Vec<_> = session.buffer().iter().map(|s| s.due).collect();
        assert_eq!(
            dues,
            vec![
                Duration::from_secs(11),
                Duration::from_secs(12),
                Duration::from_secs(13)
            ]
        );

        clock.advance(Duration::from_secs(2));
        session.pump();
        assert_eq!(bumps.load(Ordering::Relaxed), 2);

        clock.advance(Duration::from_secs(5));
        session.pump();
        assert_eq!(bumps.load(Ordering::Relaxed), 3);
        assert_eq!(session.buffer().queued(), 0);
    }

    #[test]
    fn test_reentrant_execute_from_handler() {
        let (mut session, _) = session();
        session
            .register_cmd(ConCommand::new("outer", |session, _args| {
                session.execute(CommandSource::Direct, "echo inner", false, false);
                session.post("outer done");
                Ok(())
            }))
            .unwrap();

        // The nested call drains the shared buffer, including "echo last".
        assert!(session.execute(CommandSource::Console, "outer; echo last", false, false));
        assert_eq!(texts(&mut session), vec!["inner", "last", "outer done"]);
        assert_eq!(session.buffer().queued(), 0);
    }

    #[test]
    fn test_nested_execute_depth_is_bounded() {
        let (mut session, _) = session();
        session
            .register_cmd(ConCommand::new("dive", |session, _args| {
                session.execute(CommandSource::Direct, "dive", false, false);
                Ok(())
            }))
            .unwrap();

        assert!(!session.execute(CommandSource::Console, "dive", true, false));
    }

    #[test]
    fn test_handler_failure_reports() {
        let (mut session, _) = session();
        session
            .register_cmd(ConCommand::new("fail", |_session, _args| {
                Err(ConsoleError::Failed("disk on fire".into()))
            }))
            .unwrap();

        assert!(!session.execute(CommandSource::Console, "fail", false, false));
        assert_eq!(texts(&mut session), vec!["disk on fire", "Error: 'fail' failed."]);
    }

    #[test]
    fn test_permission_denied() {
        let (mut session, _) = session();
        let runs = counter(&mut session, "kick");
        session.host_mut().server = true;

        assert!(!session.execute(CommandSource::Console, "kick", false, true));
        assert_eq!(runs.load(Ordering::Relaxed), 0);
        assert_eq!(texts(&mut session), vec!["kick can't be used by remote clients."]);

        assert!(!session.execute(CommandSource::Unknown, "kick", false, false));
        assert!(session.execute(CommandSource::Console, "kick", false, false));
        assert_eq!(runs.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_silent_execution() {
        let (mut session, _) = session();
        assert!(session.execute(CommandSource::Console, "echo hidden", true, false));
        assert!(texts(&mut session).is_empty());
        assert!(!session.is_silent());
    }

    #[test]
    fn test_unterminated_quote_warns_and_keeps_rest() {
        let (mut session, _) = session();
        assert!(session.execute(CommandSource::Console, "echo \"hello world", false, false));
        let out = texts(&mut session);
        assert_eq!(out.len(), 2);
        assert!(out[0].starts_with("Warning: unterminated quote"));
        assert_eq!(out[1], "hello world");
    }

    #[test]
    fn test_typed_accessors() {
        let (mut session, _) = session();
        session.register_var(ConVar::new("rate", 10i32).min(1.0)).unwrap();
        session.set("rate", 20i32, false).unwrap();
        assert_eq!(session.get::<i32>("rate"), Some(20));
        assert_eq!(session.get_string("rate"), Some("20".into()));
        session.inc_var("rate", false).unwrap();
        session.dec_var("rate", false).unwrap();
        session.dec_var("rate", false).unwrap();
        assert_eq!(session.get::<i32>("rate"), Some(19));
        assert!(matches!(session.set_var("nope", "1", false), Err(VarError::Unknown { .. })));
    }

    #[test]
    fn test_completion_narrowing() {
        let (mut session, _) = session();
        for word in ["foo", "food", "foot"] {
            session.register_known_word(word);
        }

        let done = session.complete_word_with("fo", CompletionMode::List);
        assert_eq!(done.map(|c| (c.replacement, c.match_count)), Some(("foo".into(), 3)));
        assert_eq!(texts(&mut session), vec!["  foo", "  food", "  foot"]);

        let done = session.complete_word_with("food", CompletionMode::List);
        assert_eq!(done.map(|c| (c.replacement, c.match_count)), Some(("food".into(), 1)));
    }

    #[test]
    fn test_complete_line_cycle() {
        let (mut session, _) = session();
        for word in ["foo", "food", "foot"] {
            session.register_known_word(word);
        }
        session.set_var(COMPLETION_VAR, "1", false).unwrap();

        let line = session.complete_line("echo fo");
        assert_eq!(line, "echo foo");
        let line = session.complete_line(&line);
        assert_eq!(line, "echo food");
        let line = session.complete_line(&line);
        assert_eq!(line, "echo foot");
        assert_eq!(session.complete_line("echo zz"), "echo zz");
    }

    #[test]
    fn test_complete_line_list() {
        let (mut session, _) = session();
        session.register_known_word("listmaps");
        assert_eq!(session.complete_line("wait 1; listm"), "wait 1; listmaps");
        assert_eq!(session.complete_line(""), "");
    }

    #[test]
    fn test_world_actions_are_queued() {
        let (mut session, _) = session();
        session.queue_world_action(|_world| {});
        assert_eq!(session.take_world_actions().len(), 1);
        assert!(session.take_world_actions().is_empty());
    }

    #[test]
    fn test_shutdown() {
        let (mut session, _) = session();
        session.schedule_after("echo later", Duration::from_secs(1), CommandSource::Console, false);
        session.shutdown();
        assert_eq!(session.buffer().queued(), 0);
        assert!(session.registry().is_empty());
        assert!(!session.execute(CommandSource::Console, "echo x", false, false));
    }

    #[test]
    fn test_executef_macro() {
        let (mut session, _) = session();
        let who = "world";
        assert!(crate::console_exec!(session, CommandSource::Direct, "echo hello {}", who));
        assert_eq!(texts(&mut session), vec!["hello", "world"]);
    }
}
