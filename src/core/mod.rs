//! The console runtime proper.
//!
//! - [`ConsoleSession`] - registry, execution buffer and output queue
//! - [`ConVar`], [`ConCommand`], [`ConAlias`] - the three kinds of entries
//! - [`ConsoleRegistry`] - case-insensitive name lookup with ordered prefix walks
//! - [`tokenize`], [`split_statements`] - console line syntax
//! - [`Console`] - system parameter for Bevy systems
//! - Messages for communication with the host

mod alias;
mod builtins;
mod completion;
mod concommand;
mod console;
mod convar;
mod error;
mod events;
mod permissions;
mod registry;
mod scheduler;
mod session;
mod tokenizer;

pub use alias::{ConAlias, expand_alias};
pub use completion::{
    Completion, CompletionCandidate, CompletionMode, CompletionState, common_stem, complete,
};
pub use concommand::{ArgKind, ArgSignature, CommandArgs, CommandHandler, ConCommand};
pub use console::{Console, ConsoleRef};
pub use convar::{
    ChangeCallback, ConValue, ConVar, ConVarFlags, ConVarKind, ConVarValue, PendingValue,
    format_number, parse_float, parse_integer,
};
pub use error::{CommandResult, ConsoleError, VarError};
pub use events::{
    ConVarChangedEvent, ConsoleClearEvent, ConsoleEventsPlugin, ConsoleInputEvent,
    ConsoleOutputEvent, LineStyle,
};
pub use permissions::{
    CommandFlags, CommandSource, HostCapabilities, PermissionDenied, check_command_access,
};
pub use registry::{CommandOverload, ConsoleRegistry, EntryKind, RegistryEntry, Resolution};
pub use scheduler::{Clock, ExecBuffer, ManualClock, ScheduledStatement, SystemClock};
pub use session::{
    COMPLETION_VAR, ConsoleSession, PumpReport, VAR_SILENT_VAR, WorldAction,
};
pub use tokenizer::{ArgumentVector, UnterminatedGroup, is_escape_char, split_statements, tokenize};
