//! Word completion over registry names.
//!
//! List mode narrows the word to the longest prefix shared by every match.
//! Cycle mode steps through the matches one per call.

use super::registry::EntryKind;

/// How [`complete`] replaces the partial word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "persist", derive(serde::Serialize, serde::Deserialize))]
pub enum CompletionMode {
    /// Replace with the unambiguous stem and list the matches.
    #[default]
    List,
    /// Replace with the next match on each call.
    Cycle,
}

impl CompletionMode {
    /// Value of the `con-completion` variable for this mode.
    pub fn as_int(self) -> i32 {
        match self {
            CompletionMode::List => 0,
            CompletionMode::Cycle => 1,
        }
    }

    pub fn from_int(value: i32) -> Self {
        if value == 1 {
            CompletionMode::Cycle
        } else {
            CompletionMode::List
        }
    }
}

/// A name that may complete the partial word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCandidate {
    pub name: String,
    pub kind: EntryKind,
}

/// Cycle position kept between calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionState {
    /// The partial word the current cycle started from.
    pub(crate) last_word: Option<String>,
    pub(crate) index: usize,
    /// The edit line produced by the last line completion.
    pub(crate) last_line: Option<String>,
    /// The edit line text before the completed word.
    pub(crate) line_prefix: String,
}

impl CompletionState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Outcome of one completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Text to put in place of the partial word.
    pub replacement: String,
    pub match_count: usize,
}

/// Longest prefix shared by all names, compared case-insensitively.
/// Keeps the casing of the first name.
pub fn common_stem<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut names = names.into_iter();
    let Some(first) = names.next() else {
        return String::new();
    };

    let mut stem = first.len();
    for name in names {
        let mut shared = 0;
        for ((i, a), b) in first[..stem].char_indices().zip(name.chars()) {
            if !a.to_lowercase().eq(b.to_lowercase()) {
                break;
            }
            shared = i + a.len_utf8();
        }
        stem = shared;
    }
    first[..stem].to_owned()
}

/// Complete `partial` against `candidates`.
///
/// Candidates must be in a stable order; the caller filters them to those
/// starting with `partial`. Returns `None` when nothing matches.
///
/// # Examples
///
/// ```
/// use bevy_console_runtime::core::{
///     complete, CompletionCandidate, CompletionMode, CompletionState, EntryKind,
/// };
///
/// let words: Vec<_> = ["foo", "food", "foot"]
///     .into_iter()
///     .map(|name| CompletionCandidate { name: name.into(), kind: EntryKind::KnownWord })
///     .collect();
/// let mut state = CompletionState::default();
///
/// let done = complete(&words, "fo", CompletionMode::List, &mut state).unwrap();
/// assert_eq!((done.replacement.as_str(), done.match_count), ("foo", 3));
/// ```
pub fn complete(
    candidates: &[CompletionCandidate],
    partial: &str,
    mode: CompletionMode,
    state: &mut CompletionState,
) -> Option<Completion> {
    if candidates.is_empty() {
        state.last_word = None;
        return None;
    }

    let match_count = candidates.len();
    if match_count == 1 {
        state.last_word = None;
        return Some(Completion {
            replacement: candidates[0].name.clone(),
            match_count,
        });
    }

    let replacement = match mode {
        CompletionMode::List => {
            state.last_word = None;
            common_stem(candidates.iter().map(|c| c.name.as_str()))
        }
        CompletionMode::Cycle => {
            let same_word = state
                .last_word
                .as_deref()
                .is_some_and(|w| w.eq_ignore_ascii_case(partial));
            if same_word {
                state.index = (state.index + 1) % match_count;
            } else {
                state.last_word = Some(partial.to_owned());
                state.index = 0;
            }
            candidates[state.index].name.clone()
        }
    };

    Some(Completion {
        replacement,
        match_count,
    })
}
