//! Serde data file structs for machine content definitions.
//!
//! These structs define the on-disk format for items, recipes and machines.
//! They are deserialized from RON, JSON, or TOML data files and then
//! resolved into core types by the loader.

use ampere_core::config::MachineConfig;
use ampere_core::cooking::InputMode;
use ampere_core::energy::Energy;
use ampere_core::item::DEFAULT_MAX_STACK;
use ampere_core::recipe::DEFAULT_COOK_TIME;
use serde::Deserialize;

fn one() -> u32 {
    1
}

fn default_max_count() -> u32 {
    DEFAULT_MAX_STACK
}

fn default_cook_time() -> u32 {
    DEFAULT_COOK_TIME
}

// ===========================================================================
// Items
// ===========================================================================

/// An item type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub name: String,
    #[serde(default = "default_max_count")]
    pub max_count: u32,
    /// Items with a capacity carry their own energy store and are routed
    /// to a machine's CHARGE slot.
    #[serde(default)]
    pub energy_capacity: Option<Energy>,
}

// ===========================================================================
// Recipes
// ===========================================================================

/// A cooking recipe definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub name: String,
    pub input: String,
    #[serde(default = "one")]
    pub input_count: u32,
    pub output: String,
    #[serde(default = "one")]
    pub output_count: u32,
    #[serde(default = "default_cook_time")]
    pub cook_time: u32,
    /// Experience per completed cycle. Plain decimal in data files.
    #[serde(default)]
    pub experience: f64,
}

// ===========================================================================
// Machines
// ===========================================================================

/// A machine definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineData {
    pub name: String,
    #[serde(default)]
    pub config: MachineConfig,
    #[serde(default)]
    pub mode: InputMode,
    #[serde(default = "one")]
    pub cook_speed: u32,
    /// Recipe names this machine may run. Empty means every loaded recipe.
    #[serde(default)]
    pub recipes: Vec<String>,
}

// ===========================================================================
// TOML wrappers
// ===========================================================================

/// TOML files hold lists under a top-level key, e.g. `[[recipes]]`.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlRecipes {
    pub recipes: Vec<RecipeData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlMachines {
    pub machines: Vec<MachineData>,
}
