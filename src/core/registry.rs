//! Console registry for commands, variables, aliases and known words.
//!
//! Names are matched case-insensitively. Entries are keyed by their
//! lowercased name in an ordered map, so completion and listings come out in
//! a stable, sorted order.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::ops::Bound;

use super::alias::ConAlias;
use super::concommand::{ArgSignature, ConCommand};
use super::convar::{ConVar, ConVarFlags};
use super::error::ConsoleError;
use super::tokenizer::ArgumentVector;

/// What kind of entry a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Command,
    Variable,
    Alias,
    /// A word known only for completion, supplied by the host.
    KnownWord,
}

impl EntryKind {
    pub fn name(self) -> &'static str {
        match self {
            EntryKind::Command => "command",
            EntryKind::Variable => "variable",
            EntryKind::Alias => "alias",
            EntryKind::KnownWord => "known word",
        }
    }
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One command of an overload set with its compiled signature.
#[derive(Debug, Clone)]
pub struct CommandOverload {
    pub command: ConCommand,
    signature: Option<ArgSignature>,
}

impl CommandOverload {
    /// Whether the statement's arguments fit this overload.
    pub fn accepts(&self, args: &[&str]) -> bool {
        self.signature.as_ref().is_none_or(|sig| sig.accepts(args))
    }
}

/// Entry stored under one name.
#[derive(Debug, Clone)]
pub enum RegistryEntry {
    /// Overload set, in registration order.
    Command(Vec<CommandOverload>),
    Variable(ConVar),
    Alias(ConAlias),
    KnownWord(Box<str>),
}

impl RegistryEntry {
    pub fn kind(&self) -> EntryKind {
        match self {
            RegistryEntry::Command(_) => EntryKind::Command,
            RegistryEntry::Variable(_) => EntryKind::Variable,
            RegistryEntry::Alias(_) => EntryKind::Alias,
            RegistryEntry::KnownWord(_) => EntryKind::KnownWord,
        }
    }

    /// The name with its registered casing.
    pub fn name(&self) -> &str {
        match self {
            RegistryEntry::Command(set) => set.first().map_or("", |o| o.command.name()),
            RegistryEntry::Variable(var) => var.name(),
            RegistryEntry::Alias(alias) => alias.name(),
            RegistryEntry::KnownWord(word) => word,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            RegistryEntry::Command(set) => set
                .iter()
                .map(|o| o.command.get_description())
                .find(|d| !d.is_empty())
                .unwrap_or(""),
            RegistryEntry::Variable(var) => var.get_description(),
            RegistryEntry::Alias(alias) => alias.template(),
            RegistryEntry::KnownWord(_) => "",
        }
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, RegistryEntry::Variable(var) if var.get_flags().contains(ConVarFlags::HIDDEN))
    }
}

/// Result of resolving a statement's name.
#[derive(Debug, Clone, Copy)]
pub enum Resolution<'a> {
    Command(&'a ConCommand),
    Variable(&'a ConVar),
    Alias(&'a ConAlias),
}

/// Central registry of console entries.
///
/// # Examples
///
/// ```
/// use bevy_console_runtime::core::{ConAlias, ConVar, ConsoleRegistry, Resolution, tokenize};
///
/// let mut registry = ConsoleRegistry::new();
/// registry.register_var(ConVar::new("sv-gravity", 800.0f32)).unwrap();
/// registry.register_alias(ConAlias::new("jump", "echo hop")).unwrap();
///
/// assert!(matches!(registry.resolve(&tokenize("SV-Gravity 10")), Some(Resolution::Variable(_))));
/// assert!(matches!(registry.resolve(&tokenize("jump")), Some(Resolution::Alias(_))));
/// ```
#[derive(Debug, Default)]
pub struct ConsoleRegistry {
    /// Keyed by lowercased name.
    entries: BTreeMap<Box<str>, RegistryEntry>,
}

fn key(name: &str) -> Box<str> {
    name.to_lowercase().into_boxed_str()
}

impl ConsoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, key: Box<str>, entry: RegistryEntry) {
        self.entries.insert(key, entry);
    }

    /// Fail if `key` is held by an entry of a kind other than `allowed`.
    /// Known words give way to any real entry.
    fn ensure_free(&self, key: &str, name: &str, allowed: EntryKind) -> Result<(), ConsoleError> {
        match self.entries.get(key).map(RegistryEntry::kind) {
            Some(existing) if existing != allowed && existing != EntryKind::KnownWord => {
                Err(ConsoleError::NameTaken {
                    name: name.to_owned(),
                    existing,
                })
            }
            _ => Ok(()),
        }
    }

    /// Register a command, adding it to the overload set for its name.
    ///
    /// A command with the same signature template as an existing overload
    /// replaces it.
    pub fn register_cmd(&mut self, cmd: ConCommand) -> Result<(), ConsoleError> {
        let key = key(cmd.name());
        self.ensure_free(&key, cmd.name(), EntryKind::Command)?;
        let signature = cmd.compile()?;
        let overload = CommandOverload {
            command: cmd,
            signature,
        };

        if let Some(RegistryEntry::Command(set)) = self.entries.get_mut(&key) {
            let template = overload.command.template();
            match set.iter_mut().find(|o| o.command.template() == template) {
                Some(existing) => {
                    bevy::log::warn!(
                        "Console: Overwriting existing command '{}' ({:?})",
                        overload.command.name(),
                        template.unwrap_or("any")
                    );
                    *existing = overload;
                }
                None => set.push(overload),
            }
            return Ok(());
        }

        self.insert(key, RegistryEntry::Command(vec![overload]));
        Ok(())
    }

    /// Register a variable.
    ///
    /// Returns `Ok(true)` if newly registered, `Ok(false)` if it replaced an
    /// existing variable.
    pub fn register_var(&mut self, cvar: ConVar) -> Result<bool, ConsoleError> {
        let key = key(cvar.name());
        self.ensure_free(&key, cvar.name(), EntryKind::Variable)?;

        let is_duplicate = matches!(self.entries.get(&key), Some(RegistryEntry::Variable(_)));
        if is_duplicate {
            bevy::log::warn!(
                "Console: Overwriting existing entry '{}' with new variable",
                cvar.name()
            );
        }

        self.insert(key, RegistryEntry::Variable(cvar));
        Ok(!is_duplicate)
    }

    /// Define an alias, replacing the template of an existing one.
    pub fn register_alias(&mut self, alias: ConAlias) -> Result<(), ConsoleError> {
        let key = key(alias.name());
        self.ensure_free(&key, alias.name(), EntryKind::Alias)?;

        if let Some(RegistryEntry::Alias(existing)) = self.entries.get_mut(&key) {
            existing.set_template(alias.template());
            return Ok(());
        }
        self.insert(key, RegistryEntry::Alias(alias));
        Ok(())
    }

    /// Add a completion-only word. Ignored if the name is already taken.
    pub fn register_known_word(&mut self, word: &str) -> bool {
        let key = key(word);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.insert(key, RegistryEntry::KnownWord(word.into()));
        true
    }

    /// Remove whatever entry holds `name`.
    pub fn remove(&mut self, name: &str) -> Option<RegistryEntry> {
        self.entries.remove(&*key(name))
    }

    /// Remove an alias. Other entry kinds are left alone.
    pub fn remove_alias(&mut self, name: &str) -> Option<ConAlias> {
        match self.get_entry(name)? {
            RegistryEntry::Alias(_) => match self.remove(name)? {
                RegistryEntry::Alias(alias) => Some(alias),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn get_entry(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(&*key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&*key(name))
    }

    pub fn var(&self, name: &str) -> Option<&ConVar> {
        match self.get_entry(name)? {
            RegistryEntry::Variable(var) => Some(var),
            _ => None,
        }
    }

    pub fn var_mut(&mut self, name: &str) -> Option<&mut ConVar> {
        match self.entries.get_mut(&*key(name))? {
            RegistryEntry::Variable(var) => Some(var),
            _ => None,
        }
    }

    pub fn alias(&self, name: &str) -> Option<&ConAlias> {
        match self.get_entry(name)? {
            RegistryEntry::Alias(alias) => Some(alias),
            _ => None,
        }
    }

    /// Resolve a statement: a command overload accepting the arguments, then
    /// a variable, then an alias.
    pub fn resolve(&self, argv: &ArgumentVector) -> Option<Resolution<'_>> {
        match self.get_entry(argv.name())? {
            RegistryEntry::Command(set) => {
                let args: Vec<&str> = argv.args().collect();
                set.iter()
                    .find(|o| o.accepts(&args))
                    .map(|o| Resolution::Command(&o.command))
            }
            RegistryEntry::Variable(var) => Some(Resolution::Variable(var)),
            RegistryEntry::Alias(alias) => Some(Resolution::Alias(alias)),
            RegistryEntry::KnownWord(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose name starts with `prefix` (case-insensitive), sorted.
    pub fn prefix_iter<'a>(&'a self, prefix: &str) -> impl Iterator<Item = &'a RegistryEntry> + use<'a> {
        let prefix = prefix.to_lowercase();
        let range = self
            .entries
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded));
        range
            .take_while(move |(key, _)| key.starts_with(prefix.as_str()))
            .map(|(_, entry)| entry)
    }

    /// Iterate over all entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.prefix_iter("")
    }

    /// All commands (first overload of each set), sorted.
    pub fn cmds(&self) -> impl Iterator<Item = &ConCommand> {
        self.iter().filter_map(|entry| match entry {
            RegistryEntry::Command(set) => set.first().map(|o| &o.command),
            _ => None,
        })
    }

    /// All variables, sorted.
    pub fn vars(&self) -> impl Iterator<Item = &ConVar> {
        self.iter().filter_map(|entry| match entry {
            RegistryEntry::Variable(var) => Some(var),
            _ => None,
        })
    }

    /// All aliases, sorted.
    pub fn aliases(&self) -> impl Iterator<Item = &ConAlias> {
        self.iter().filter_map(|entry| match entry {
            RegistryEntry::Alias(alias) => Some(alias),
            _ => None,
        })
    }

    /// Iterate over all variables with the ARCHIVE flag.
    pub fn archive_vars(&self) -> impl Iterator<Item = &ConVar> {
        self.vars()
            .filter(|var| var.get_flags().contains(ConVarFlags::ARCHIVE))
    }

    /// Completion candidates for `partial`, sorted, hidden entries excluded.
    pub fn completions(&self, partial: &str) -> Vec<(&str, EntryKind)> {
        self.prefix_iter(partial)
            .filter(|entry| !entry.is_hidden())
            .map(|entry| (entry.name(), entry.kind()))
            .collect()
    }

    /// Find entries by searching both name and description.
    pub fn search(&self, query: &str) -> Vec<&RegistryEntry> {
        let query_lower = query.to_lowercase();

        self.iter()
            .filter(|entry| !entry.is_hidden())
            .filter(|entry| {
                entry.name().to_lowercase().contains(&query_lower)
                    || entry.description().to_lowercase().contains(&query_lower)
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::convar::ConValue;
    use crate::core::tokenizer::tokenize;

    fn noop(name: &'static str) -> ConCommand {
        ConCommand::new(name, |_session, _args| Ok(()))
    }

    #[test]
    fn test_registry_var() {
        let mut registry = ConsoleRegistry::new();
        registry
            .register_var(ConVar::new("sv-gravity", 800.0f32).description("World gravity"))
            .unwrap();

        assert!(registry.contains("sv-gravity"));
        assert!(registry.contains("SV-GRAVITY"));
        assert_eq!(
            registry.var("sv-gravity").map(|v| v.value().clone()),
            Some(ConValue::Float(800.0))
        );
    }

    #[test]
    fn test_resolution_order() {
        let mut registry = ConsoleRegistry::new();
        registry.register_cmd(noop("quit")).unwrap();
        registry.register_var(ConVar::new("rate", 1i32)).unwrap();
        registry.register_alias(ConAlias::new("go", "quit")).unwrap();

        assert!(matches!(registry.resolve(&tokenize("quit")), Some(Resolution::Command(_))));
        assert!(matches!(registry.resolve(&tokenize("Rate 5")), Some(Resolution::Variable(_))));
        assert!(matches!(registry.resolve(&tokenize("GO")), Some(Resolution::Alias(_))));
        assert!(registry.resolve(&tokenize("missing")).is_none());
    }

    #[test]
    fn test_overloads_pick_first_compatible() {
        let mut registry = ConsoleRegistry::new();
        registry.register_cmd(noop("help").signature("").description("banner")).unwrap();
        registry.register_cmd(noop("help").signature("s").description("topic")).unwrap();

        match registry.resolve(&tokenize("help")) {
            Some(Resolution::Command(cmd)) => assert_eq!(cmd.get_description(), "banner"),
            other => panic!("unexpected {other:?}"),
        }
        match registry.resolve(&tokenize("help alias")) {
            Some(Resolution::Command(cmd)) => assert_eq!(cmd.get_description(), "topic"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(registry.resolve(&tokenize("help a b")).is_none());
    }

    #[test]
    fn test_same_signature_replaces_overload() {
        let mut registry = ConsoleRegistry::new();
        registry.register_cmd(noop("echo").signature("s*").description("old")).unwrap();
        registry.register_cmd(noop("echo").signature("s*").description("new")).unwrap();

        match registry.get_entry("echo") {
            Some(RegistryEntry::Command(set)) => {
                assert_eq!(set.len(), 1);
                assert_eq!(set[0].command.get_description(), "new");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cross_kind_conflicts_are_rejected() {
        let mut registry = ConsoleRegistry::new();
        registry.register_cmd(noop("quit")).unwrap();

        assert_eq!(
            registry.register_var(ConVar::new("quit", 0i32)),
            Err(ConsoleError::NameTaken {
                name: "quit".into(),
                existing: EntryKind::Command,
            })
        );
        assert!(registry.register_alias(ConAlias::new("QUIT", "echo")).is_err());
    }

    #[test]
    fn test_duplicate_var_replaces() {
        let mut registry = ConsoleRegistry::new();
        assert_eq!(registry.register_var(ConVar::new("test-var", 42i32)), Ok(true));
        assert_eq!(registry.register_var(ConVar::new("test-var", 100i32)), Ok(false));
        assert_eq!(
            registry.var("test-var").map(|v| v.value().clone()),
            Some(ConValue::Int(100))
        );
    }

    #[test]
    fn test_known_words_yield_to_real_entries() {
        let mut registry = ConsoleRegistry::new();
        assert!(registry.register_known_word("E1M1"));
        assert!(registry.resolve(&tokenize("e1m1")).is_none());

        registry.register_cmd(noop("e1m1")).unwrap();
        assert!(!registry.register_known_word("e1m1"));
        assert!(matches!(registry.resolve(&tokenize("e1m1")), Some(Resolution::Command(_))));
    }

    #[test]
    fn test_completions_sorted_and_hide_hidden() {
        let mut registry = ConsoleRegistry::new();
        registry.register_known_word("foot");
        registry.register_known_word("foo");
        registry.register_known_word("food");
        registry
            .register_var(ConVar::new("fog", 0i32).flags(ConVarFlags::HIDDEN))
            .unwrap();

        let names: Vec<_> = registry.completions("FO").into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["foo", "food", "foot"]);
    }

    #[test]
    fn test_prefix_iter_stops_at_prefix_end() {
        let mut registry = ConsoleRegistry::new();
        for word in ["sv-a", "sv-b", "sva", "sw", "s"] {
            registry.register_known_word(word);
        }

        let names: Vec<_> = registry.prefix_iter("SV-").map(RegistryEntry::name).collect();
        assert_eq!(names, vec!["sv-a", "sv-b"]);
        assert_eq!(registry.prefix_iter("s").count(), 5);
        assert_eq!(registry.prefix_iter("t").count(), 0);

        registry.remove("sv-a");
        registry.remove("sv-b");
        assert_eq!(registry.prefix_iter("sv-").count(), 0);
        assert_eq!(registry.iter().count(), 3);
    }

    #[test]
    fn test_remove_alias() {
        let mut registry = ConsoleRegistry::new();
        registry.register_alias(ConAlias::new("a", "echo 1")).unwrap();
        registry.register_alias(ConAlias::new("a", "echo 2")).unwrap();
        assert_eq!(registry.alias("a").map(ConAlias::template), Some("echo 2"));

        registry.register_cmd(noop("c")).unwrap();
        assert!(registry.remove_alias("c").is_none());
        assert!(registry.contains("c"));

        assert!(registry.remove_alias("A").is_some());
        assert!(!registry.contains("a"));
        assert_eq!(registry.completions("a").len(), 0);
    }

    #[test]
    fn test_registry_search() {
        let mut registry = ConsoleRegistry::new();
        registry
            .register_var(ConVar::new("sv-gravity", 800.0f32).description("World gravity force"))
            .unwrap();
        registry
            .register_var(ConVar::new("sv-cheats", 0i32).description("Enable cheats"))
            .unwrap();

        assert_eq!(registry.search("gravity").len(), 1);
        assert_eq!(registry.search("ENABLE").len(), 1);
        assert_eq!(registry.search("sv-").len(), 2);
    }

    #[test]
    fn test_archive_vars() {
        let mut registry = ConsoleRegistry::new();
        registry
            .register_var(ConVar::new("a", 1i32).flags(ConVarFlags::ARCHIVE))
            .unwrap();
        registry.register_var(ConVar::new("b", 1i32)).unwrap();
        let names: Vec<_> = registry.archive_vars().map(ConVar::name).collect();
        assert_eq!(names, vec!["a"]);
    }
}
