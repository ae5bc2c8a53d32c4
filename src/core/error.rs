//! Error types for the console runtime.
//!
//! The `Display` output of every variant is the diagnostic posted to the
//! console output, so messages are written for the person at the prompt.

use thiserror::Error;

use super::convar::{ConVarKind, format_number};
use super::permissions::PermissionDenied;
use super::registry::EntryKind;

/// Result type returned by command handlers.
pub type CommandResult = Result<(), ConsoleError>;

/// Errors from reading or writing a console variable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VarError {
    #[error("{name}: unknown variable")]
    Unknown { name: String },

    #[error("{name} is read-only. It can't be changed (not even with force)")]
    ReadOnly { name: String },

    #[error(
        "{name} is protected. You shouldn't change its value.\nUse the command: '{name} force {value}' to modify it anyway."
    )]
    Protected { name: String, value: String },

    /// An unforced write fell outside the variable's bounds.
    #[error("Error: {}", describe_range(.name, .min, .max))]
    OutOfRange {
        name: String,
        min: Option<f64>,
        max: Option<f64>,
    },

    #[error("{name}: '{value}' is not a valid {kind} value")]
    InvalidValue {
        name: String,
        value: String,
        kind: ConVarKind,
    },

    #[error("{name} is a string variable and has no numeric value")]
    NotNumeric { name: String },
}

/// Errors surfaced by registration calls and command handlers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Var(#[from] VarError),

    #[error(transparent)]
    Permission(#[from] PermissionDenied),

    #[error("'{name}' is already registered as a {existing}")]
    NameTaken { name: String, existing: EntryKind },

    #[error("'{template}' is not a valid argument signature for '{name}'")]
    InvalidSignature { name: String, template: String },

    /// A handler rejected its arguments.
    #[error("{0}")]
    Usage(String),

    /// A handler could not complete.
    #[error("{0}")]
    Failed(String),
}

fn describe_range(name: &str, min: &Option<f64>, max: &Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => {
            format!("{} <= {} <= {}", format_number(*min), name, format_number(*max))
        }
        (Some(min), None) => format!("{} >= {}", name, format_number(*min)),
        (None, Some(max)) => format!("{} <= {}", name, format_number(*max)),
        (None, None) => format!("{name} is unbounded"),
    }
}
