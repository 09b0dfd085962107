//! # observa
//!
//! Observable slot registry and shift-bucket addressing for host monitoring.
//!
//! observa defines which metrics a monitoring subsystem observes, lets a
//! descriptor file extend that set at runtime, and computes the
//! calendar-aligned keys under which consolidated samples are stored.
//!
//! ## Key Properties
//!
//! - A fixed table of [`OBSERVABLE_COUNT`] slots: [`OB_SPARE`] compiled-in,
//!   the rest defined by the descriptor file
//! - Lazy reload: every accessor re-reads the descriptor file only when its
//!   modification time moves forward
//! - Descriptor problems degrade gracefully and never fail a read of a slot
//!   that is defined
//! - Six-hour shift buckets keyed on a rolling three-year cycle
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use observa::{ObservableId, RegistryConfig, SlotRegistry};
//! use observa::reader::fetch_bucket;
//! use observa::store::JsonStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = SlotRegistry::new(&RegistryConfig::new("/var/lib/monitor/state"));
//! let store = JsonStore::open("buckets.json")?;
//!
//! if let Some(averages) = fetch_bucket(&store, 1_710_489_600)? {
//!     for id in ObservableId::all() {
//!         if registry.has_slot(id) {
//!             let slot = registry.slot(id)?;
//!             println!("{}: {} {}", slot.name, averages[id], slot.units);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`observable`] — Observable ids and the compiled-in table
//! - [`slot`] — Slot attributes and the built-in/extension slot variants
//! - [`descriptor`] — Descriptor record parsing
//! - [`loader`] — Modification-time cached descriptor reloads
//! - [`registry`] — The slot table and its accessors
//! - [`bucket`] — Shift arithmetic and bucket keys
//! - [`store`] — Read contract of the bucket store
//! - [`reader`] — Fetching [`Averages`] records by time
//! - [`config`] — Registry configuration
//! - [`error`] — Error types

pub mod bucket;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod loader;
pub mod observable;
pub mod reader;
pub mod registry;
pub mod slot;
pub mod store;

// Re-export primary API types at crate root for convenience.
pub use bucket::{BucketKey, Shift, bucket_key, next_shift, step_back_weeks, week_start};
pub use config::RegistryConfig;
pub use error::{ObservaError, Result};
pub use loader::{RefreshOutcome, ReloadReport, SkipReason};
pub use observable::{OB_SPARE, OBSERVABLE_COUNT, ObservableId};
pub use reader::{Averages, fetch_bucket};
pub use registry::SlotRegistry;
pub use slot::SlotAttrs;
pub use store::BucketStore;
