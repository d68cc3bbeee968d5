//! Data-driven machine definitions.
//!
//! A data directory holds `recipes` and `machines` files, plus an optional
//! `items` file, each in RON, TOML or JSON. [`load_machine_data`] reads
//! them, resolves names, validates machine configs and returns a
//! [`MachineCatalog`] that builds ready-to-run machines.

pub mod loader;
pub mod schema;

pub use loader::{load_machine_data, DataLoadError, MachineCatalog, MachineDefinition};
