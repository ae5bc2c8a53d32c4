//! Console command (ConCommand) implementation.
//!
//! ConCommands are named handlers. Several commands may share a name with
//! different argument signatures; the registry keeps them as an overload set.

use std::fmt;
use std::sync::Arc;

use super::error::{CommandResult, ConsoleError};
use super::permissions::{CommandFlags, CommandSource};
use super::session::ConsoleSession;
use super::tokenizer::ArgumentVector;

/// Kind of one positional argument in a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Int,
    Float,
    Str,
}

impl ArgKind {
    fn accepts(self, arg: &str) -> bool {
        match self {
            ArgKind::Int => super::convar::parse_integer(arg).is_some(),
            ArgKind::Float => super::convar::parse_float(arg).is_some(),
            ArgKind::Str => true,
        }
    }
}

/// Parsed argument signature.
///
/// Written as a template over `i` (int), `f` (float) and `s` (string). A
/// trailing `*` accepts any number of further arguments of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSignature {
    kinds: Vec<ArgKind>,
    variadic: bool,
}

impl ArgSignature {
    /// Parse a template. `None` for an invalid template.
    pub fn parse(template: &str) -> Option<Self> {
        let mut kinds = Vec::with_capacity(template.len());
        let mut variadic = false;

        for c in template.chars() {
            if variadic {
                // `*` must be last
                return None;
            }
            match c {
                'i' => kinds.push(ArgKind::Int),
                'f' => kinds.push(ArgKind::Float),
                's' => kinds.push(ArgKind::Str),
                '*' => variadic = true,
                _ => return None,
            }
        }
        Some(Self { kinds, variadic })
    }

    /// Whether `args` (excluding the name) fit this signature.
    pub fn accepts(&self, args: &[&str]) -> bool {
        let count = args.len();
        let arity_ok = if self.variadic {
            count >= self.kinds.len()
        } else {
            count == self.kinds.len()
        };

        arity_ok
            && self
                .kinds
                .iter()
                .zip(args)
                .all(|(kind, arg)| kind.accepts(arg))
    }
}

/// Arguments passed to a command handler.
///
/// Index 0 is the first argument after the command name.
#[derive(Debug, Clone, Copy)]
pub struct CommandArgs<'a> {
    argv: &'a ArgumentVector,
    source: CommandSource,
    network: bool,
}

impl<'a> CommandArgs<'a> {
    pub fn new(argv: &'a ArgumentVector, source: CommandSource, network: bool) -> Self {
        Self {
            argv,
            source,
            network,
        }
    }

    /// The command name as typed.
    #[inline]
    pub fn name(&self) -> &'a str {
        self.argv.name()
    }

    /// Token count including the name.
    #[inline]
    pub fn argc(&self) -> usize {
        self.argv.argc()
    }

    /// Number of arguments after the name.
    #[inline]
    pub fn len(&self) -> usize {
        self.argv.argc().saturating_sub(1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.argv.get(index + 1)
    }

    pub fn get_or(&self, index: usize, default: &'a str) -> &'a str {
        self.get(index).unwrap_or(default)
    }

    /// Try to parse an argument as a specific type.
    pub fn parse<T: std::str::FromStr>(&self, index: usize) -> Option<T> {
        self.get(index).and_then(|s| s.parse().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a str> + use<'a> {
        self.argv.args()
    }

    /// Join arguments starting from an index.
    pub fn join_from(&self, start: usize, separator: &str) -> String {
        self.iter().skip(start).collect::<Vec<_>>().join(separator)
    }

    /// The full token vector, name included.
    #[inline]
    pub fn argv(&self) -> &'a ArgumentVector {
        self.argv
    }

    /// Source of the statement being dispatched.
    #[inline]
    pub fn source(&self) -> CommandSource {
        self.source
    }

    /// Whether the statement arrived over the network.
    #[inline]
    pub fn is_network(&self) -> bool {
        self.network
    }
}

impl std::ops::Index<usize> for CommandArgs<'_> {
    type Output = str;

    fn index(&self, index: usize) -> &Self::Output {
        self.get(index).unwrap_or("")
    }
}

/// Type alias for command handler functions.
///
/// Handlers receive the owning session, so they may execute further
/// statements, schedule work or rebuild the registry.
pub type CommandHandler =
    Arc<dyn Fn(&mut ConsoleSession, &CommandArgs) -> CommandResult + Send + Sync>;

/// A console command with a handler function.
///
/// # Examples
///
/// ```
/// use bevy_console_runtime::core::{ConCommand, CommandFlags};
///
/// let say = ConCommand::new("say", |session, args| {
///     session.post(args.join_from(0, " "));
///     Ok(())
/// })
/// .signature("s*")
/// .flags(CommandFlags::CLIENT)
/// .description("Broadcast a message");
///
/// assert_eq!(say.name(), "say");
/// ```
#[derive(Clone)]
pub struct ConCommand {
    name: Box<str>,
    description: &'static str,
    template: Option<&'static str>,
    flags: CommandFlags,
    handler: CommandHandler,
}

impl ConCommand {
    /// Create a new command with the given name and handler. Accepts any
    /// arguments until [`ConCommand::signature`] is set.
    pub fn new<F>(name: impl Into<Box<str>>, handler: F) -> Self
    where
        F: Fn(&mut ConsoleSession, &CommandArgs) -> CommandResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: "",
            template: None,
            flags: CommandFlags::NONE,
            handler: Arc::new(handler),
        }
    }

    pub fn description(mut self, desc: &'static str) -> Self {
        self.description = desc;
        self
    }

    /// Set the argument signature template. Checked at registration.
    pub fn signature(mut self, template: &'static str) -> Self {
        self.template = Some(template);
        self
    }

    pub fn flags(mut self, flags: CommandFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn get_description(&self) -> &'static str {
        self.description
    }

    #[inline]
    pub fn get_flags(&self) -> CommandFlags {
        self.flags
    }

    #[inline]
    pub fn template(&self) -> Option<&'static str> {
        self.template
    }

    #[inline]
    pub fn handler(&self) -> CommandHandler {
        Arc::clone(&self.handler)
    }

    /// Parse the signature template.
    pub(crate) fn compile(&self) -> Result<Option<ArgSignature>, ConsoleError> {
        match self.template {
            None => Ok(None),
            Some(template) => ArgSignature::parse(template).map(Some).ok_or_else(|| {
                ConsoleError::InvalidSignature {
                    name: self.name.to_string(),
                    template: template.to_owned(),
                }
            }),
        }
    }
}

impl fmt::Debug for ConCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConCommand")
            .field("name", &self.name)
            .field("template", &self.template)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tokenizer::tokenize;

    fn fits(template: &str, line: &str) -> bool {
        let argv = tokenize(line);
        ArgSignature::parse(template)
            .map(|sig| sig.accepts(&argv.args().collect::<Vec<_>>()))
            .unwrap_or(false)
    }

    #[test]
    fn test_signature_parse() {
        assert!(ArgSignature::parse("").is_some());
        assert!(ArgSignature::parse("ifs").is_some());
        assert!(ArgSignature::parse("s*").is_some());
        assert!(ArgSignature::parse("*").is_some());
        assert!(ArgSignature::parse("*s").is_none());
        assert!(ArgSignature::parse("x").is_none());
    }

    #[test]
    fn test_signature_arity() {
        assert!(fits("", "clear"));
        assert!(!fits("", "clear now"));
        assert!(fits("s", "toggle x"));
        assert!(!fits("s", "toggle"));
        assert!(fits("s*", "echo a b c"));
        assert!(!fits("s*", "echo"));
        assert!(fits("*", "listcmds"));
    }

    #[test]
    fn test_signature_kinds() {
        assert!(fits("is", "after 35 \"echo hi\""));
        assert!(!fits("is", "after soon \"echo hi\""));
        assert!(fits("ifs", "repeat 3 0.5 bump"));
        assert!(fits("f", "scale 0x10"));
    }

    #[test]
    fn test_command_args_exclude_name() {
        let argv = tokenize("echo hello world");
        let args = CommandArgs::new(&argv, CommandSource::Console, false);
        assert_eq!(args.name(), "echo");
        assert_eq!(args.len(), 2);
        assert_eq!(args.argc(), 3);
        assert_eq!(args.get(0), Some("hello"));
        assert_eq!(args.get(2), None);
        assert_eq!(&args[1], "world");
        assert_eq!(args.join_from(0, " "), "hello world");
    }

    #[test]
    fn test_command_args_parse() {
        let argv = tokenize("add 42");
        let args = CommandArgs::new(&argv, CommandSource::Config, true);
        assert_eq!(args.parse::<i32>(0), Some(42));
        assert_eq!(args.parse::<i32>(1), None);
        assert_eq!(args.source(), CommandSource::Config);
        assert!(args.is_network());
    }

    #[test]
    fn test_concommand_builder() {
        let cmd = ConCommand::new("test", |_session, _args| Ok(()))
            .description("A test command")
            .signature("i")
            .flags(CommandFlags::NO_CONFIG);

        assert_eq!(cmd.name(), "test");
        assert_eq!(cmd.get_description(), "A test command");
        assert!(cmd.get_flags().contains(CommandFlags::NO_CONFIG));
        assert!(cmd.compile().is_ok());

        let bad = ConCommand::new("bad", |_session, _args| Ok(())).signature("q");
        assert!(matches!(bad.compile(), Err(ConsoleError::InvalidSignature { .. })));
    }
}
