//! System parameters for reaching the console from Bevy systems.
//!
//! [`Console`] wraps the [`ConsoleSession`] resource mutably and exposes the
//! calls most systems need. [`ConsoleRef`] is the read-only counterpart.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use super::{
    CommandSource, ConCommand, ConVar, ConVarValue, ConsoleError, ConsoleRegistry,
    ConsoleSession, RegistryEntry, VarError,
};

/// Mutable console access for systems.
///
/// # Examples
///
/// ```ignore
/// fn setup_console(mut console: Console) {
///     console
///         .register_var(ConVar::new("sv-gravity", 800.0f32).description("World gravity"))
///         .ok();
///
///     console
///         .register_cmd(ConCommand::new("noclip", |session, _args| {
///             session.toggle_var("sv-noclip", false)?;
///             Ok(())
///         }))
///         .ok();
///
///     console.run("sv-gravity 1000");
/// }
/// ```
#[derive(SystemParam)]
pub struct Console<'w> {
    session: ResMut<'w, ConsoleSession>,
}

impl Console<'_> {
    /// Returns `Ok(false)` if an existing variable was replaced.
    pub fn register_var(&mut self, cvar: ConVar) -> Result<bool, ConsoleError> {
        self.session.register_var(cvar)
    }

    pub fn register_cmd(&mut self, cmd: ConCommand) -> Result<(), ConsoleError> {
        self.session.register_cmd(cmd)
    }

    pub fn register_alias(&mut self, name: &str, template: &str) -> Result<(), ConsoleError> {
        self.session.register_alias(name, template)
    }

    /// Add a word offered by completion only.
    pub fn register_known_word(&mut self, word: &str) -> bool {
        self.session.register_known_word(word)
    }

    pub fn get<T: ConVarValue>(&self, name: &str) -> Option<T> {
        self.session.get(name)
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.session.get_string(name)
    }

    /// Set a typed value; bounds and protection apply unless `forced`.
    pub fn set<T: ConVarValue>(&mut self, name: &str, value: T, forced: bool) -> Result<(), VarError> {
        self.session.set(name, value, forced)
    }

    pub fn set_string(&mut self, name: &str, value: &str, forced: bool) -> Result<(), VarError> {
        self.session.set_var(name, value, forced)
    }

    /// Execute a line typed at the console.
    pub fn run(&mut self, text: &str) -> bool {
        self.session.execute(CommandSource::Console, text, false, false)
    }

    pub fn execute(&mut self, source: CommandSource, text: &str, silent: bool) -> bool {
        self.session.execute(source, text, silent, false)
    }

    pub fn post(&mut self, text: impl Into<String>) {
        self.session.post(text);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.session.registry().contains(name)
    }

    pub fn get_entry(&self, name: &str) -> Option<&RegistryEntry> {
        self.session.registry().get_entry(name)
    }

    pub fn registry(&self) -> &ConsoleRegistry {
        self.session.registry()
    }

    /// Direct access for operations not covered here.
    pub fn session(&mut self) -> &mut ConsoleSession {
        &mut self.session
    }
}

/// Read-only console system parameter.
#[derive(SystemParam)]
pub struct ConsoleRef<'w> {
    session: Res<'w, ConsoleSession>,
}

impl ConsoleRef<'_> {
    pub fn get<T: ConVarValue>(&self, name: &str) -> Option<T> {
        self.session.get(name)
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.session.get_string(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.session.registry().contains(name)
    }

    pub fn get_entry(&self, name: &str) -> Option<&RegistryEntry> {
        self.session.registry().get_entry(name)
    }

    /// Variables by name order.
    pub fn vars(&self) -> impl Iterator<Item = &ConVar> {
        self.session.registry().vars()
    }

    /// Visible entries whose name or description contains `query`.
    pub fn search(&self, query: &str) -> Vec<&RegistryEntry> {
        self.session.registry().search(query)
    }

    pub fn registry(&self) -> &ConsoleRegistry {
        self.session.registry()
    }
}
