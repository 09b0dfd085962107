//! Slot descriptors for observable metrics.
//!
//! A slot describes one observable: what it is called, what it measures,
//! and the range its values are expected to fall in. Built-in slots come
//! from the compiled-in table; extension slots are owned values installed by
//! the schema loader.

use serde::Serialize;

use crate::observable::BuiltinObservable;

/// Units assumed for extension slots defined in the legacy two-field form.
pub const DEFAULT_UNITS: &str = "unknown";

/// Expected minimum used when none is given.
pub const DEFAULT_EXPECTED_MINIMUM: f64 = 0.0;

/// Expected maximum used when none is given.
pub const DEFAULT_EXPECTED_MAXIMUM: f64 = 100.0;

/// Attributes of one observable slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotAttrs {
    /// Short metric name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Unit of measurement.
    pub units: String,
    /// Lower bound of the expected value range.
    pub expected_minimum: f64,
    /// Upper bound of the expected value range.
    pub expected_maximum: f64,
    /// Whether samples are aggregated per bucket.
    pub consolidable: bool,
}

impl SlotAttrs {
    /// Creates slot attributes from all six fields.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        units: impl Into<String>,
        expected_minimum: f64,
        expected_maximum: f64,
        consolidable: bool,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            units: units.into(),
            expected_minimum,
            expected_maximum,
            consolidable,
        }
    }

    /// Creates slot attributes from a name and description, filling the
    /// remaining fields with their defaults.
    pub fn with_defaults(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(
            name,
            description,
            DEFAULT_UNITS,
            DEFAULT_EXPECTED_MINIMUM,
            DEFAULT_EXPECTED_MAXIMUM,
            true,
        )
    }

    /// Whether `value` falls inside the expected range (inclusive).
    pub fn in_expected_range(&self, value: f64) -> bool {
        value >= self.expected_minimum && value <= self.expected_maximum
    }
}

impl From<&BuiltinObservable> for SlotAttrs {
    // Built-ins carry no measured range; [0, 100] and consolidable are
    // placeholders.
    fn from(builtin: &BuiltinObservable) -> Self {
        Self::new(
            builtin.name,
            builtin.description,
            builtin.units,
            DEFAULT_EXPECTED_MINIMUM,
            DEFAULT_EXPECTED_MAXIMUM,
            true,
        )
    }
}

/// One entry of the slot table.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Compiled-in slot; never replaced.
    BuiltIn(SlotAttrs),
    /// Runtime slot; `None` until the descriptor file defines it.
    Extension(Option<SlotAttrs>),
}

impl Slot {
    /// Returns the attributes if the slot is populated.
    pub fn attrs(&self) -> Option<&SlotAttrs> {
        match self {
            Self::BuiltIn(attrs) => Some(attrs),
            Self::Extension(attrs) => attrs.as_ref(),
        }
    }

    /// Whether the slot currently has attributes.
    pub fn is_populated(&self) -> bool {
        self.attrs().is_some()
    }

    /// Whether this is a compiled-in slot.
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::BuiltIn(_))
    }

    /// Installs `attrs` into an extension slot, dropping whatever it held.
    ///
    /// Built-in slots are never replaced; for them this returns `false` and
    /// `attrs` is discarded.
    pub(crate) fn install(&mut self, attrs: SlotAttrs) -> bool {
        match self {
            Self::BuiltIn(_) => false,
            Self::Extension(entry) => {
                *entry = Some(attrs);
                true
            }
        }
    }
}
