//! Console messages for communication with the host.
//!
//! - Host -> Core: statements to execute ([`ConsoleInputEvent`])
//! - Core -> Host: output lines, variable changes, clear requests

use bevy::prelude::*;

use super::permissions::CommandSource;

/// Style flags attached to an output line.
///
/// At most one colour is meaningful; [`LineStyle::LIGHT`] brightens it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct LineStyle(u32);

impl LineStyle {
    pub const NONE: Self = Self(0);

    pub const BLACK: Self = Self(1 << 0);
    pub const BLUE: Self = Self(1 << 1);
    pub const GREEN: Self = Self(1 << 2);
    pub const CYAN: Self = Self(1 << 3);
    pub const RED: Self = Self(1 << 4);
    pub const MAGENTA: Self = Self(1 << 5);
    pub const YELLOW: Self = Self(1 << 6);
    pub const WHITE: Self = Self(1 << 7);
    pub const LIGHT: Self = Self(1 << 8);

    /// Draw a horizontal rule.
    pub const RULER: Self = Self(1 << 9);
    /// Centre the text.
    pub const CENTER: Self = Self(1 << 10);

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

impl std::ops::BitOr for LineStyle {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for LineStyle {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// A line of text to execute.
///
/// # Examples
///
/// ```ignore
/// fn run_autoexec(mut input: MessageWriter<ConsoleInputEvent>) {
///     input.write(ConsoleInputEvent::new("exec autoexec.cfg").source(CommandSource::Config));
/// }
/// ```
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct ConsoleInputEvent {
    pub text: String,
    pub source: CommandSource,
    /// Suppress output produced while executing.
    pub silent: bool,
    /// The statement arrived from a network peer.
    pub network_originated: bool,
}

impl ConsoleInputEvent {
    /// Input typed at the console.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: CommandSource::Console,
            silent: false,
            network_originated: false,
        }
    }

    pub fn source(mut self, source: CommandSource) -> Self {
        self.source = source;
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Input received from a remote client.
    pub fn remote(text: impl Into<String>) -> Self {
        Self {
            network_originated: true,
            ..Self::new(text)
        }
    }
}

/// A line posted to the console output.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct ConsoleOutputEvent {
    pub text: String,
    pub style: LineStyle,
}

impl ConsoleOutputEvent {
    pub fn new(text: impl Into<String>) -> Self {
        Self::styled(LineStyle::NONE, text)
    }

    pub fn styled(style: LineStyle, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Event sent when a ConVar value changes.
///
/// # Examples
///
/// ```ignore
/// fn on_gravity_change(mut events: MessageReader<ConVarChangedEvent>) {
///     for event in events.read() {
///         if &*event.name == "sv-gravity" {
///             info!("Gravity changed to {}", event.new_value);
///         }
///     }
/// }
/// ```
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct ConVarChangedEvent {
    pub name: Box<str>,
    pub old_value: String,
    pub new_value: String,
}

impl ConVarChangedEvent {
    pub fn new(
        name: impl Into<Box<str>>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
        }
    }
}

/// Event requesting the console to clear its output buffer.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct ConsoleClearEvent;

/// Plugin that registers all console messages.
pub struct ConsoleEventsPlugin;

impl Plugin for ConsoleEventsPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ConsoleInputEvent>()
            .add_message::<ConsoleOutputEvent>()
            .add_message::<ConVarChangedEvent>()
            .add_message::<ConsoleClearEvent>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_input_event() {
        let event = ConsoleInputEvent::new("sv-cheats 1");
        assert_eq!(event.text, "sv-cheats 1");
        assert_eq!(event.source, CommandSource::Console);
        assert!(!event.silent && !event.network_originated);

        let event = ConsoleInputEvent::new("exec x.cfg")
            .source(CommandSource::Config)
            .silent();
        assert_eq!(event.source, CommandSource::Config);
        assert!(event.silent);

        assert!(ConsoleInputEvent::remote("say hi").network_originated);
    }

    #[test]
    fn test_line_style() {
        let style = LineStyle::RULER | LineStyle::YELLOW;
        assert!(style.contains(LineStyle::RULER));
        assert!(!style.contains(LineStyle::CENTER));
        assert_eq!(ConsoleOutputEvent::new("x").style, LineStyle::NONE);
    }

    #[test]
    fn test_convar_changed_event() {
        let event = ConVarChangedEvent::new("sv-gravity", "800", "1000");
        assert_eq!(&*event.name, "sv-gravity");
        assert_eq!(event.old_value, "800");
        assert_eq!(event.new_value, "1000");
    }
}
