//! Source-based access control for console commands.
//!
//! Every statement carries the [`CommandSource`] it came from and whether it
//! arrived over the network. A command's [`CommandFlags`] decide which of
//! those origins may run it; [`check_command_access`] applies the rules.

use std::fmt::{self, Display};

use thiserror::Error;

/// Where a statement came from.
///
/// The discriminants are stable and fit one byte, so a source can be carried
/// on the wire next to the statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CommandSource {
    /// Origin not known. Always denied.
    #[default]
    Unknown = 0,
    /// Host code calling the runtime directly.
    Direct = 1,
    /// Game library code.
    Game = 2,
    /// Typed at the console prompt.
    Console = 3,
    /// A key binding.
    Bind = 4,
    /// A config file, including `exec`.
    Config = 5,
    /// A player profile.
    Profile = 6,
    /// The process command line.
    CommandLine = 7,
    /// A scripted action.
    Script = 8,
}

impl CommandSource {
    pub const ALL: [CommandSource; 9] = [
        CommandSource::Unknown,
        CommandSource::Direct,
        CommandSource::Game,
        CommandSource::Console,
        CommandSource::Bind,
        CommandSource::Config,
        CommandSource::Profile,
        CommandSource::CommandLine,
        CommandSource::Script,
    ];

    /// Decode a wire byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Phrase used in denial diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            CommandSource::Unknown => "an unknown source",
            CommandSource::Direct => "a direct call",
            CommandSource::Game => "a game library call",
            CommandSource::Console => "the console",
            CommandSource::Bind => "a binding",
            CommandSource::Config => "a cfg file",
            CommandSource::Profile => "a player profile",
            CommandSource::CommandLine => "the command line",
            CommandSource::Script => "an action command",
        }
    }

    /// The per-source block flag, if the source has one.
    fn block_flag(self) -> Option<CommandFlags> {
        match self {
            CommandSource::Unknown => None,
            CommandSource::Direct => Some(CommandFlags::NO_DIRECT),
            CommandSource::Game => Some(CommandFlags::NO_GAME),
            CommandSource::Console => Some(CommandFlags::NO_CONSOLE),
            CommandSource::Bind => Some(CommandFlags::NO_BIND),
            CommandSource::Config => Some(CommandFlags::NO_CONFIG),
            CommandSource::Profile => Some(CommandFlags::NO_PROFILE),
            CommandSource::CommandLine => Some(CommandFlags::NO_CMDLINE),
            CommandSource::Script => Some(CommandFlags::NO_SCRIPT),
        }
    }

    /// Sources a remote client could not plausibly have produced.
    fn untrusted_when_remote(self) -> bool {
        matches!(
            self,
            CommandSource::Unknown
                | CommandSource::Config
                | CommandSource::Profile
                | CommandSource::CommandLine
                | CommandSource::Script
        )
    }
}

impl Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Flags restricting who may run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandFlags(u32);

impl CommandFlags {
    pub const NONE: Self = Self(0);

    pub const NO_DIRECT: Self = Self(1 << 0);
    pub const NO_GAME: Self = Self(1 << 1);
    pub const NO_CONSOLE: Self = Self(1 << 2);
    pub const NO_BIND: Self = Self(1 << 3);
    pub const NO_CONFIG: Self = Self(1 << 4);
    pub const NO_PROFILE: Self = Self(1 << 5);
    pub const NO_CMDLINE: Self = Self(1 << 6);
    pub const NO_SCRIPT: Self = Self(1 << 7);

    /// Requires a loaded game.
    pub const NO_NULL_GAME: Self = Self(1 << 8);

    /// UI-only; unavailable on a dedicated server.
    pub const NO_DEDICATED: Self = Self(1 << 9);

    /// May be run by network clients.
    pub const CLIENT: Self = Self(1 << 10);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for CommandFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for CommandFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// Host state consulted by the access rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostCapabilities {
    pub game_loaded: bool,
    pub dedicated: bool,
    /// The process is acting as a network server.
    pub server: bool,
}

/// Why a command was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionDenied {
    #[error("{name} can't be used while no game is loaded.")]
    NoGameLoaded { name: String },

    #[error("{name} can't be used in dedicated mode.")]
    Dedicated { name: String },

    #[error("{name} can't be used by remote clients.")]
    NotClientUsable { name: String },

    #[error("{name} can't be executed remotely via {via}.")]
    RemoteSource { name: String, via: CommandSource },

    #[error("{name} can't be executed via {via}.")]
    Source { name: String, via: CommandSource },
}

/// Decide whether a command may run for a statement.
///
/// Rules are applied in order: game loaded, dedicated mode, the network
/// trust boundary, then the per-source mask.
pub fn check_command_access(
    name: &str,
    flags: CommandFlags,
    source: CommandSource,
    network_originated: bool,
    host: &HostCapabilities,
) -> Result<(), PermissionDenied> {
    let name = || name.to_owned();

    if flags.contains(CommandFlags::NO_NULL_GAME) && !host.game_loaded {
        return Err(PermissionDenied::NoGameLoaded { name: name() });
    }

    if flags.contains(CommandFlags::NO_DEDICATED) && host.dedicated {
        return Err(PermissionDenied::Dedicated { name: name() });
    }

    if host.server && network_originated {
        if !flags.contains(CommandFlags::CLIENT) {
            return Err(PermissionDenied::NotClientUsable { name: name() });
        }
        if source.untrusted_when_remote() {
            return Err(PermissionDenied::RemoteSource {
                name: name(),
                via: source,
            });
        }
    }

    let blocked = match source.block_flag() {
        Some(flag) => flags.contains(flag),
        None => true,
    };
    if blocked {
        return Err(PermissionDenied::Source {
            name: name(),
            via: source,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> HostCapabilities {
        HostCapabilities {
            game_loaded: true,
            ..Default::default()
        }
    }

    fn server() -> HostCapabilities {
        HostCapabilities {
            game_loaded: true,
            server: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_source_wire_encoding_is_stable() {
        assert_eq!(CommandSource::Unknown.as_u8(), 0);
        assert_eq!(CommandSource::Console.as_u8(), 3);
        assert_eq!(CommandSource::Script.as_u8(), 8);
        for source in CommandSource::ALL {
            assert_eq!(CommandSource::from_u8(source.as_u8()), Some(source));
        }
        assert_eq!(CommandSource::from_u8(9), None);
    }

    #[test]
    fn test_unflagged_command_allows_known_sources() {
        for source in &CommandSource::ALL[1..] {
            assert!(check_command_access("echo", CommandFlags::NONE, *source, false, &local()).is_ok());
        }
    }

    #[test]
    fn test_unknown_source_is_always_denied() {
        assert_eq!(
            check_command_access("echo", CommandFlags::NONE, CommandSource::Unknown, false, &local()),
            Err(PermissionDenied::Source {
                name: "echo".into(),
                via: CommandSource::Unknown,
            })
        );
    }

    #[test]
    fn test_requires_loaded_game() {
        let host = HostCapabilities::default();
        let result = check_command_access(
            "warp",
            CommandFlags::NO_NULL_GAME,
            CommandSource::Console,
            false,
            &host,
        );
        assert!(matches!(result, Err(PermissionDenied::NoGameLoaded { .. })));
    }

    #[test]
    fn test_dedicated_blocks_ui_only() {
        let host = HostCapabilities {
            dedicated: true,
            ..local()
        };
        let result = check_command_access(
            "screenshot",
            CommandFlags::NO_DEDICATED,
            CommandSource::Console,
            false,
            &host,
        );
        assert!(matches!(result, Err(PermissionDenied::Dedicated { .. })));
    }

    #[test]
    fn test_remote_requires_client_flag() {
        let result =
            check_command_access("kick", CommandFlags::NONE, CommandSource::Console, true, &server());
        assert!(matches!(result, Err(PermissionDenied::NotClientUsable { .. })));

        assert!(
            check_command_access("say", CommandFlags::CLIENT, CommandSource::Console, true, &server())
                .is_ok()
        );
    }

    #[test]
    fn test_remote_untrusted_sources_denied_despite_client_flag() {
        for source in [
            CommandSource::Config,
            CommandSource::Profile,
            CommandSource::CommandLine,
            CommandSource::Script,
        ] {
            let result = check_command_access("say", CommandFlags::CLIENT, source, true, &server());
            assert_eq!(
                result,
                Err(PermissionDenied::RemoteSource {
                    name: "say".into(),
                    via: source,
                })
            );
        }
    }

    #[test]
    fn test_network_flag_ignored_when_not_server() {
        assert!(
            check_command_access("kick", CommandFlags::NONE, CommandSource::Console, true, &local())
                .is_ok()
        );
    }

    #[test]
    fn test_per_source_mask() {
        let flags = CommandFlags::NO_CONFIG | CommandFlags::NO_BIND;
        assert!(check_command_access("quit", flags, CommandSource::Config, false, &local()).is_err());
        assert!(check_command_access("quit", flags, CommandSource::Bind, false, &local()).is_err());
        assert!(check_command_access("quit", flags, CommandSource::Console, false, &local()).is_ok());
    }

    #[test]
    fn test_denial_messages() {
        let err = PermissionDenied::Source {
            name: "quit".into(),
            via: CommandSource::Config,
        };
        assert_eq!(err.to_string(), "quit can't be executed via a cfg file.");
    }
}
