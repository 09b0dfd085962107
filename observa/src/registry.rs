//! The observable slot registry.
//!
//! [`SlotRegistry`] owns the full slot table: the compiled-in slots and the
//! extension slots defined by the descriptor file. Every read goes through
//! the [`SchemaLoader`] first, so a changed descriptor file is picked up by
//! the next accessor call without any explicit reload.
//!
//! # Example
//!
//! ```rust,no_run
//! use observa::{ObservableId, RegistryConfig, SlotRegistry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = SlotRegistry::new(&RegistryConfig::new("/var/lib/monitor/state"));
//!
//! let load = ObservableId::new(4)?;
//! let slot = registry.slot(load)?;
//! println!("{} ({})", slot.name, slot.units);
//!
//! let custom = ObservableId::new(70)?;
//! if registry.has_slot(custom) {
//!     println!("extension: {}", registry.description(custom)?);
//! }
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::SystemTime;

use crate::config::RegistryConfig;
use crate::error::{Result, SlotError};
use crate::loader::{RefreshOutcome, SchemaLoader};
use crate::observable::{BUILTIN_OBSERVABLES, OB_SPARE, OBSERVABLE_COUNT, ObservableId};
use crate::slot::{Slot, SlotAttrs};

/// Table of observable slots, refreshed lazily from a descriptor file.
///
/// Built-in slots occupy `[0, OB_SPARE)` and never change. Extension slots
/// occupy `[OB_SPARE, OBSERVABLE_COUNT)`, start out empty, and are replaced
/// whenever the descriptor file is parsed.
///
/// Each accessor borrows the registry mutably and returns data tied to that
/// borrow, so two accessor results cannot be held at once. Use
/// [`SlotRegistry::slot`] to read several attributes of one slot together.
///
/// # Thread Safety
///
/// Accessors take `&mut self` because they may reload the descriptor file.
/// The registry is designed for single-threaded access; callers sharing it
/// across threads must provide their own synchronization.
#[derive(Debug)]
pub struct SlotRegistry {
    /// One entry per observable, indexed by [`ObservableId`].
    slots: Vec<Slot>,
    /// Descriptor file cache.
    loader: SchemaLoader,
}

impl SlotRegistry {
    /// Creates a registry reading the descriptor file named by `config`.
    ///
    /// The file is not read until the first accessor call.
    pub fn new(config: &RegistryConfig) -> Self {
        Self::with_descriptor(config.descriptor_path())
    }

    /// Creates a registry reading the descriptor file at `path`.
    pub fn with_descriptor<P: AsRef<Path>>(path: P) -> Self {
        let mut slots = Vec::with_capacity(OBSERVABLE_COUNT);
        slots.extend(BUILTIN_OBSERVABLES.iter().map(|b| Slot::BuiltIn(b.into())));
        slots.resize(OBSERVABLE_COUNT, Slot::Extension(None));

        Self {
            slots,
            loader: SchemaLoader::new(path),
        }
    }

    /// Reloads extension slots if the descriptor file changed.
    ///
    /// Every accessor calls this first; calling it directly is only needed
    /// to inspect the outcome.
    pub fn refresh(&mut self) -> RefreshOutcome {
        self.loader.refresh(&mut self.slots[OB_SPARE..])
    }

    /// Parses the descriptor file even if it has not changed.
    pub fn reload(&mut self) -> RefreshOutcome {
        self.loader.invalidate();
        self.refresh()
    }

    /// The descriptor file path.
    pub fn descriptor_path(&self) -> &Path {
        self.loader.path()
    }

    /// Modification time of the last descriptor file parsed.
    pub fn load_time(&self) -> Option<SystemTime> {
        self.loader.load_time()
    }

    /// Number of times the descriptor file has been parsed.
    pub fn parse_count(&self) -> u64 {
        self.loader.parse_count()
    }

    /// Whether `id` has a slot: always for built-ins, and for extension
    /// indices only once the descriptor file has defined one.
    pub fn has_slot(&mut self, id: ObservableId) -> bool {
        self.refresh();
        self.slots[id.index()].is_populated()
    }

    /// All attributes of the slot at `id`.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Unpopulated`] if `id` is an extension index with
    /// no slot defined.
    pub fn slot(&mut self, id: ObservableId) -> Result<&SlotAttrs> {
        self.refresh();
        self.slots[id.index()]
            .attrs()
            .ok_or_else(|| SlotError::Unpopulated { index: id.index() }.into())
    }

    /// The slot name.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Unpopulated`] for an undefined extension slot.
    pub fn name(&mut self, id: ObservableId) -> Result<&str> {
        Ok(&self.slot(id)?.name)
    }

    /// The slot description.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Unpopulated`] for an undefined extension slot.
    pub fn description(&mut self, id: ObservableId) -> Result<&str> {
        Ok(&self.slot(id)?.description)
    }

    /// The slot units.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Unpopulated`] for an undefined extension slot.
    pub fn units(&mut self, id: ObservableId) -> Result<&str> {
        Ok(&self.slot(id)?.units)
    }

    /// Lower bound of the slot's expected range.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Unpopulated`] for an undefined extension slot.
    pub fn expected_minimum(&mut self, id: ObservableId) -> Result<f64> {
        Ok(self.slot(id)?.expected_minimum)
    }

    /// Upper bound of the slot's expected range.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Unpopulated`] for an undefined extension slot.
    pub fn expected_maximum(&mut self, id: ObservableId) -> Result<f64> {
        Ok(self.slot(id)?.expected_maximum)
    }

    /// Whether the slot's samples are consolidated per bucket.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Unpopulated`] for an undefined extension slot.
    pub fn is_consolidable(&mut self, id: ObservableId) -> Result<bool> {
        Ok(self.slot(id)?.consolidable)
    }

    /// Finds the lowest-indexed populated slot named `name`.
    pub fn find(&mut self, name: &str) -> Option<ObservableId> {
        self.refresh();
        ObservableId::all().find(|id| {
            self.slots[id.index()]
                .attrs()
                .is_some_and(|attrs| attrs.name == name)
        })
    }

    /// Snapshot of every populated slot, in index order.
    pub fn populated(&mut self) -> Vec<(ObservableId, SlotAttrs)> {
        self.refresh();
        ObservableId::all()
            .zip(&self.slots)
            .filter_map(|(id, slot)| slot.attrs().map(|attrs| (id, attrs.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObservaError;

    #[test]
    fn test_builtins_without_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = SlotRegistry::new(&RegistryConfig::new(dir.path()));

        let users = ObservableId::new(0).unwrap();
        assert!(registry.has_slot(users));
        assert_eq!(registry.name(users).unwrap(), "users");
        assert_eq!(registry.units(users).unwrap(), "average users per 2.5 mins");
        assert_eq!(registry.expected_minimum(users).unwrap(), 0.0);
        assert_eq!(registry.expected_maximum(users).unwrap(), 100.0);
        assert!(registry.is_consolidable(users).unwrap());

        let last = ObservableId::new(OB_SPARE - 1).unwrap();
        assert_eq!(registry.name(last).unwrap(), "ldaps_out");

        assert_eq!(registry.populated().len(), OB_SPARE);
        assert_eq!(registry.parse_count(), 0);
    }

    #[test]
    fn test_unpopulated_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = SlotRegistry::new(&RegistryConfig::new(dir.path()));
        let id = ObservableId::new(OB_SPARE + 3).unwrap();

        assert!(!registry.has_slot(id));
        match registry.name(id) {
            Err(ObservaError::Slot(SlotError::Unpopulated { index })) => {
                assert_eq!(index, OB_SPARE + 3);
            }
            other => panic!("expected unpopulated slot error, got {other:?}"),
        }
        assert!(registry.is_consolidable(id).is_err());
    }

    #[test]
    fn test_slot_reads_several_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = SlotRegistry::new(&RegistryConfig::new(dir.path()));
        let load = ObservableId::new(4).unwrap();

        let slot = registry.slot(load).unwrap();
        let label = format!("{} ({})", slot.name, slot.units);
        assert_eq!(label, "loadavg (jobs)");

        let name = registry.name(load).unwrap().to_string();
        let units = registry.units(load).unwrap();
        assert_eq!(format!("{name} ({units})"), label);
    }

    #[test]
    fn test_find() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = SlotRegistry::new(&RegistryConfig::new(dir.path()));

        assert_eq!(registry.find("loadavg"), ObservableId::new(4).ok());
        assert_eq!(registry.find("no_such_metric"), None);
    }
}
