//! Console variable (ConVar) implementation.
//!
//! A ConVar holds one typed value (byte, int, float or string) with optional
//! numeric bounds. Writes go through [`ConVar::prepare_write`], which applies
//! the read-only, protected and range rules; the session commits the result.

use std::fmt::{self, Display};
use std::sync::Arc;

use super::error::VarError;
use super::session::ConsoleSession;

/// Flags controlling ConVar behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConVarFlags(u32);

impl ConVarFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);

    /// Rejects every write through the console, forced or not.
    pub const READ_ONLY: Self = Self(1 << 0);

    /// Writes require the `force` form.
    pub const PROTECTED: Self = Self(1 << 1);

    /// The lower bound is not enforced.
    pub const NO_MIN: Self = Self(1 << 2);

    /// The upper bound is not enforced.
    pub const NO_MAX: Self = Self(1 << 3);

    /// Value is saved by `writeconfig`.
    ///
    /// **Security note**: archived values are stored in plaintext.
    pub const ARCHIVE: Self = Self(1 << 4);

    /// Hidden from listings and completion.
    pub const HIDDEN: Self = Self(1 << 5);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for ConVarFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for ConVarFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// Storage type of a ConVar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConVarKind {
    Byte,
    Int,
    Float,
    Str,
}

impl ConVarKind {
    pub fn name(self) -> &'static str {
        match self {
            ConVarKind::Byte => "byte",
            ConVarKind::Int => "int",
            ConVarKind::Float => "float",
            ConVarKind::Str => "string",
        }
    }
}

impl Display for ConVarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A ConVar value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConValue {
    Byte(u8),
    Int(i32),
    Float(f32),
    Str(String),
}

impl ConValue {
    pub fn kind(&self) -> ConVarKind {
        match self {
            ConValue::Byte(_) => ConVarKind::Byte,
            ConValue::Int(_) => ConVarKind::Int,
            ConValue::Float(_) => ConVarKind::Float,
            ConValue::Str(_) => ConVarKind::Str,
        }
    }

    /// Numeric view of the value; `None` for strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConValue::Byte(v) => Some(f64::from(*v)),
            ConValue::Int(v) => Some(f64::from(*v)),
            ConValue::Float(v) => Some(f64::from(*v)),
            ConValue::Str(_) => None,
        }
    }
}

impl Display for ConValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConValue::Byte(v) => write!(f, "{v}"),
            ConValue::Int(v) => write!(f, "{v}"),
            ConValue::Float(v) => f.write_str(&format_number(f64::from(*v))),
            ConValue::Str(s) => f.write_str(s),
        }
    }
}

/// Format a number without a trailing `.0` for whole values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

/// Parse an integer with optional sign and `0x` hexadecimal prefix.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if digits.starts_with(['+', '-']) {
        return None;
    }

    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) if !hex.starts_with(['+', '-']) => i64::from_str_radix(hex, 16).ok()?,
        Some(_) => return None,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse a finite number. Anything [`parse_integer`] accepts, hex
/// included, is also a valid float.
pub fn parse_float(raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(value) => Some(value).filter(|v| v.is_finite()),
        Err(_) => parse_integer(raw).map(|v| v as f64),
    }
}

/// Rust types that map onto a [`ConValue`].
///
/// Implemented for `u8`, `bool` (byte storage), `i32`, `f32` and `String`.
pub trait ConVarValue: Sized {
    /// The storage kind a ConVar created from this type uses.
    const KIND: ConVarKind;

    fn into_value(self) -> ConValue;

    fn from_value(value: &ConValue) -> Option<Self>;
}

impl ConVarValue for u8 {
    const KIND: ConVarKind = ConVarKind::Byte;

    fn into_value(self) -> ConValue {
        ConValue::Byte(self)
    }

    fn from_value(value: &ConValue) -> Option<Self> {
        match value {
            ConValue::Byte(v) => Some(*v),
            _ => None,
        }
    }
}

impl ConVarValue for bool {
    const KIND: ConVarKind = ConVarKind::Byte;

    fn into_value(self) -> ConValue {
        ConValue::Byte(u8::from(self))
    }

    fn from_value(value: &ConValue) -> Option<Self> {
        match value {
            ConValue::Byte(v) => Some(*v != 0),
            ConValue::Int(v) => Some(*v != 0),
            _ => None,
        }
    }
}

impl ConVarValue for i32 {
    const KIND: ConVarKind = ConVarKind::Int;

    fn into_value(self) -> ConValue {
        ConValue::Int(self)
    }

    fn from_value(value: &ConValue) -> Option<Self> {
        match value {
            ConValue::Int(v) => Some(*v),
            ConValue::Byte(v) => Some(i32::from(*v)),
            _ => None,
        }
    }
}

impl ConVarValue for f32 {
    const KIND: ConVarKind = ConVarKind::Float;

    fn into_value(self) -> ConValue {
        ConValue::Float(self)
    }

    fn from_value(value: &ConValue) -> Option<Self> {
        match value {
            ConValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl ConVarValue for String {
    const KIND: ConVarKind = ConVarKind::Str;

    fn into_value(self) -> ConValue {
        ConValue::Str(self)
    }

    fn from_value(value: &ConValue) -> Option<Self> {
        match value {
            ConValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

/// Change-notification callback, run after every successful write.
///
/// Receives the session and the variable name. It may register or remove
/// entries; callers re-resolve the variable afterwards.
pub type ChangeCallback = Arc<dyn Fn(&mut ConsoleSession, &str) + Send + Sync>;

/// A requested new value before bounds and storage checks.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingValue {
    Number(f64),
    Text(String),
}

/// A console variable with typed value, bounds and flags.
///
/// New variables are unbounded; [`ConVar::min`] and [`ConVar::max`] switch
/// the corresponding bound on.
///
/// # Examples
///
/// ```
/// use bevy_console_runtime::core::{ConVar, ConVarFlags, ConValue};
///
/// let fov = ConVar::new("view-fov", 90i32)
///     .description("Horizontal field of view")
///     .min(60.0)
///     .max(120.0)
///     .flags(ConVarFlags::ARCHIVE);
///
/// assert_eq!(fov.value(), &ConValue::Int(90));
/// assert!(fov.prepare_write("150", false).is_err());
/// assert_eq!(fov.prepare_write("150", true), Ok(ConValue::Int(150)));
/// ```
#[derive(Clone)]
pub struct ConVar {
    name: Box<str>,
    value: ConValue,
    default: ConValue,
    flags: ConVarFlags,
    description: &'static str,
    min: f64,
    max: f64,
    on_change: Option<ChangeCallback>,
}

impl ConVar {
    /// Create a new ConVar with the given name and default value.
    pub fn new(name: impl Into<Box<str>>, default: impl ConVarValue) -> Self {
        let default = default.into_value();
        Self {
            name: name.into(),
            value: default.clone(),
            default,
            flags: ConVarFlags::NO_MIN | ConVarFlags::NO_MAX,
            description: "",
            min: 0.0,
            max: 0.0,
            on_change: None,
        }
    }

    pub fn description(mut self, desc: &'static str) -> Self {
        self.description = desc;
        self
    }

    /// Add flags. Bound flags set by [`ConVar::min`]/[`ConVar::max`] are kept.
    pub fn flags(mut self, flags: ConVarFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Enforce a lower bound.
    pub fn min(mut self, min: f64) -> Self {
        self.min = min;
        self.flags = self.flags.difference(ConVarFlags::NO_MIN);
        self
    }

    /// Enforce an upper bound.
    pub fn max(mut self, max: f64) -> Self {
        self.max = max;
        self.flags = self.flags.difference(ConVarFlags::NO_MAX);
        self
    }

    /// Enforce both bounds.
    pub fn range(self, min: f64, max: f64) -> Self {
        self.min(min).max(max)
    }

    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut ConsoleSession, &str) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(callback));
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> ConVarKind {
        self.default.kind()
    }

    #[inline]
    pub fn value(&self) -> &ConValue {
        &self.value
    }

    #[inline]
    pub fn default_value(&self) -> &ConValue {
        &self.default
    }

    #[inline]
    pub fn get_flags(&self) -> ConVarFlags {
        self.flags
    }

    #[inline]
    pub fn get_description(&self) -> &'static str {
        self.description
    }

    /// The enforced lower bound, if any.
    pub fn lower_bound(&self) -> Option<f64> {
        (!self.flags.contains(ConVarFlags::NO_MIN)).then_some(self.min)
    }

    /// The enforced upper bound, if any.
    pub fn upper_bound(&self) -> Option<f64> {
        (!self.flags.contains(ConVarFlags::NO_MAX)).then_some(self.max)
    }

    pub(crate) fn change_callback(&self) -> Option<ChangeCallback> {
        self.on_change.clone()
    }

    /// Replace the value without any checks. Returns the old value.
    pub(crate) fn replace_value(&mut self, value: ConValue) -> ConValue {
        std::mem::replace(&mut self.value, value)
    }

    /// Validate a raw console string as the new value.
    pub fn prepare_write(&self, raw: &str, forced: bool) -> Result<ConValue, VarError> {
        self.ensure_not_read_only()?;
        let pending = match self.kind() {
            ConVarKind::Byte | ConVarKind::Int => parse_integer(raw)
                .map(|v| PendingValue::Number(v as f64))
                .ok_or_else(|| self.invalid(raw))?,
            ConVarKind::Float => parse_float(raw)
                .map(PendingValue::Number)
                .ok_or_else(|| self.invalid(raw))?,
            ConVarKind::Str => PendingValue::Text(raw.to_owned()),
        };
        self.finish_write(pending, forced)
    }

    /// Validate `current + delta` as the new value.
    pub fn prepare_offset(&self, delta: f64, forced: bool) -> Result<ConValue, VarError> {
        self.ensure_not_read_only()?;
        let current = self.numeric_value()?;
        self.finish_write(PendingValue::Number(current + delta), forced)
    }

    /// Validate the zero/one flip of the current value.
    pub fn prepare_toggle(&self, forced: bool) -> Result<ConValue, VarError> {
        self.ensure_not_read_only()?;
        let current = self.numeric_value()?;
        let flipped = if current == 0.0 { 1.0 } else { 0.0 };
        self.finish_write(PendingValue::Number(flipped), forced)
    }

    fn numeric_value(&self) -> Result<f64, VarError> {
        self.value.as_f64().ok_or_else(|| VarError::NotNumeric {
            name: self.name.to_string(),
        })
    }

    fn ensure_not_read_only(&self) -> Result<(), VarError> {
        if self.flags.contains(ConVarFlags::READ_ONLY) {
            return Err(VarError::ReadOnly {
                name: self.name.to_string(),
            });
        }
        Ok(())
    }

    fn finish_write(&self, pending: PendingValue, forced: bool) -> Result<ConValue, VarError> {
        if self.flags.contains(ConVarFlags::PROTECTED) && !forced {
            let value = match &pending {
                PendingValue::Number(v) => format_number(*v),
                PendingValue::Text(s) => s.clone(),
            };
            return Err(VarError::Protected {
                name: self.name.to_string(),
                value,
            });
        }

        match pending {
            PendingValue::Text(text) => Ok(ConValue::Str(text)),
            PendingValue::Number(number) => {
                if !forced {
                    let below = self.lower_bound().is_some_and(|min| number < min);
                    let above = self.upper_bound().is_some_and(|max| number > max);
                    if below || above {
                        return Err(VarError::OutOfRange {
                            name: self.name.to_string(),
                            min: self.lower_bound(),
                            max: self.upper_bound(),
                        });
                    }
                }
                self.store(number)
            }
        }
    }

    /// Convert a number to this variable's storage type.
    fn store(&self, number: f64) -> Result<ConValue, VarError> {
        let truncated = number.trunc();
        match self.kind() {
            ConVarKind::Byte if (0.0..=255.0).contains(&truncated) => {
                Ok(ConValue::Byte(truncated as u8))
            }
            ConVarKind::Int if (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&truncated) => {
                Ok(ConValue::Int(truncated as i32))
            }
            ConVarKind::Float if (number as f32).is_finite() => {
                Ok(ConValue::Float(number as f32))
            }
            _ => Err(self.invalid(&format_number(number))),
        }
    }

    fn invalid(&self, raw: &str) -> VarError {
        VarError::InvalidValue {
            name: self.name.to_string(),
            value: raw.to_owned(),
            kind: self.kind(),
        }
    }
}

impl Display for ConVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" = \"{}\"", self.name, self.value)
    }
}

impl fmt::Debug for ConVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConVar")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("flags", &self.flags)
            .field("min", &self.lower_bound())
            .field("max", &self.upper_bound())
            .finish_non_exhaustive()
    }
}
