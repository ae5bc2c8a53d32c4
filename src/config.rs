//! Runtime limits and defaults for a console session.

use crate::core::CompletionMode;

/// Console session configuration.
///
/// With the `persist` feature this deserializes from RON; missing fields
/// take their default.
///
/// ```ignore
/// ConsolePlugin {
///     config: ConsoleConfig {
///         max_alias_depth: Some(16),
///         ..default()
///     },
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "persist", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "persist", serde(default))]
pub struct ConsoleConfig {
    /// Drain passes per pump before the execution buffer is discarded.
    pub max_drain_passes: usize,

    /// Longest alias expansion chain. `None` leaves only the drain pass
    /// limit in place.
    pub max_alias_depth: Option<usize>,

    /// Nested `execute` calls allowed from inside handlers.
    pub max_execute_depth: usize,

    /// Tics per second for `after` and `repeat`.
    pub tic_rate: u32,

    /// Most statements one `repeat` may queue. Larger counts are capped.
    pub max_repeat_count: u32,

    pub completion_mode: CompletionMode,

    /// Echo each non-silent input line as `> text` before running it.
    pub echo_input: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            max_drain_passes: 100,
            max_alias_depth: None,
            max_execute_depth: 32,
            tic_rate: 35,
            max_repeat_count: 1000,
            completion_mode: CompletionMode::List,
            echo_input: true,
        }
    }
}

#[cfg(all(test, feature = "persist"))]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config: ConsoleConfig =
            ron::from_str("(max_alias_depth: Some(8), completion_mode: Cycle)").unwrap();
        assert_eq!(config.max_alias_depth, Some(8));
        assert_eq!(config.completion_mode, CompletionMode::Cycle);
        assert_eq!(config.max_drain_passes, 100);
        assert_eq!(config.tic_rate, 35);
        assert_eq!(config.max_repeat_count, 1000);
        assert!(config.echo_input);
    }
}
