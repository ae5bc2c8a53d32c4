//! Command aliases: named templates with positional placeholders.

use super::tokenizer::ArgumentVector;

/// A named statement template.
///
/// `%1`..`%9` stand for the call's arguments; `%0` stands for all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConAlias {
    name: Box<str>,
    template: String,
}

impl ConAlias {
    pub fn new(name: impl Into<Box<str>>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn template(&self) -> &str {
        &self.template
    }

    pub(crate) fn set_template(&mut self, template: impl Into<String>) {
        self.template = template.into();
    }
}

/// Substitute `call`'s tokens into `template`.
///
/// `%n` (1..=9) becomes token `n` of the call, or nothing if the call has
/// fewer tokens. `%0` becomes every argument after the name joined by single
/// spaces. Substituted text is not scanned again. A `%` not followed by a
/// digit is copied as is.
///
/// # Examples
///
/// ```
/// use bevy_console_runtime::core::{expand_alias, tokenize};
///
/// let call = tokenize("foo a b");
/// assert_eq!(expand_alias("echo %1 and %2", &call), "echo a and b");
/// assert_eq!(expand_alias("say %0", &call), "say a b");
/// ```
pub fn expand_alias(template: &str, call: &ArgumentVector) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        let index = match (c, chars.peek().and_then(|d| d.to_digit(10))) {
            ('%', Some(index)) => index as usize,
            _ => {
                out.push(c);
                continue;
            }
        };
        chars.next();

        if index == 0 {
            let all: Vec<&str> = call.args().collect();
            out.push_str(&all.join(" "));
        } else if let Some(arg) = call.get(index) {
            out.push_str(arg);
        }
    }
    out
}
