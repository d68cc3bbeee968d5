//! Resolution pipeline: reads data files, resolves cross-references, builds
//! a machine catalog.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers used by [`load_machine_data`].

use crate::schema::{ItemData, MachineData, RecipeData};
use ampere_core::config::{ConfigError, MachineConfig};
use ampere_core::cooking::{CookingBehavior, InputMode};
use ampere_core::fixed::f64_to_fixed64;
use ampere_core::item::{ItemStack, StoredCharge};
use ampere_core::machine::{Machine, MachineBehavior};
use ampere_core::recipe::{Recipe, RecipeBook, RecipeLookup};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// A definition parsed but holds a value the core cannot use.
    #[error("invalid value for '{name}' in {file}: {detail}")]
    InvalidValue {
        file: PathBuf,
        name: String,
        detail: String,
    },

    /// A machine definition failed configuration validation.
    #[error("machine '{name}' in {file}: {source}")]
    Config {
        file: PathBuf,
        name: String,
        #[source]
        source: ConfigError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without
/// extension).
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = &found {
            return Err(DataLoadError::ConflictingFormats {
                a: existing.clone(),
                b: candidate,
            });
        }
        found = Some(candidate);
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, e: impl std::fmt::Display) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: e.to_string(),
    }
}

/// Read a file and deserialize it according to its format.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at
/// `toml_key` from the top-level table. RON and JSON hold a bare list.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }
    let content = std::fs::read_to_string(path)?;
    let table: toml::Value = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .get(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
        .clone();
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Check whether a name already exists in a map, returning a
/// `DuplicateName` error if so.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Catalog
// ===========================================================================

/// A resolved machine definition, ready to instantiate.
pub struct MachineDefinition {
    pub config: MachineConfig,
    pub mode: InputMode,
    pub cook_speed: u32,
    recipes: Arc<dyn RecipeLookup + Send + Sync>,
}

impl std::fmt::Debug for MachineDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineDefinition")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .field("cook_speed", &self.cook_speed)
            .finish_non_exhaustive()
    }
}

impl MachineDefinition {
    fn behavior(&self) -> CookingBehavior {
        CookingBehavior::new(Arc::clone(&self.recipes), self.mode).with_cook_speed(self.cook_speed)
    }

    /// The recipes this machine may run.
    pub fn recipes(&self) -> &(dyn RecipeLookup + Send + Sync) {
        self.recipes.as_ref()
    }

    /// Create a fresh machine with empty storage.
    pub fn build(&self) -> Result<Machine<CookingBehavior>, ConfigError> {
        Machine::new(self.config.clone(), self.behavior())
    }
}

/// Everything loaded from one data directory.
#[derive(Debug)]
pub struct MachineCatalog {
    pub items: HashMap<String, ItemData>,
    pub recipes: Arc<RecipeBook>,
    pub machines: HashMap<String, MachineDefinition>,
}

impl MachineCatalog {
    /// Instantiate the named machine.
    pub fn build_machine(&self, name: &str) -> Option<Result<Machine<CookingBehavior>, ConfigError>> {
        self.machines.get(name).map(MachineDefinition::build)
    }

    /// A stack of a declared item, carrying an empty energy store when the
    /// item declares a capacity. Unknown names yield `None`.
    pub fn item_stack(&self, name: &str, count: u32) -> Option<ItemStack> {
        let data = self.items.get(name)?;
        let stack = ItemStack::new(name, count.min(data.max_count)).with_max_count(data.max_count);
        Some(match data.energy_capacity {
            Some(capacity) => stack.with_energy(StoredCharge::empty(capacity)),
            None => stack,
        })
    }
}

// ===========================================================================
// Loading pipeline
// ===========================================================================

/// Load `items` (optional), `recipes` and `machines` from `dir`.
///
/// When an items file exists, every recipe input and output must name a
/// declared item. Machine recipe lists must name loaded recipes.
pub fn load_machine_data(dir: &Path) -> Result<MachineCatalog, DataLoadError> {
    let items = load_items(dir)?;
    let (recipes, by_name) = load_recipes(dir, &items)?;
    let recipes = Arc::new(recipes);
    let machines = load_machines(dir, &recipes, &by_name)?;
    debug!(
        items = items.len(),
        recipes = recipes.len(),
        machines = machines.len(),
        dir = %dir.display(),
        "machine data loaded"
    );
    Ok(MachineCatalog {
        items,
        recipes,
        machines,
    })
}

fn load_items(dir: &Path) -> Result<HashMap<String, ItemData>, DataLoadError> {
    let mut items = HashMap::new();
    let Some(path) = find_data_file(dir, "items")? else {
        return Ok(items);
    };
    for item in deserialize_list::<ItemData>(&path, "items")? {
        check_duplicate(&items, &item.name, &path)?;
        if item.max_count == 0 {
            return Err(DataLoadError::InvalidValue {
                file: path,
                name: item.name,
                detail: "max_count must be at least 1".into(),
            });
        }
        items.insert(item.name.clone(), item);
    }
    Ok(items)
}

fn load_recipes(
    dir: &Path,
    items: &HashMap<String, ItemData>,
) -> Result<(RecipeBook, HashMap<String, Recipe>), DataLoadError> {
    let path = require_data_file(dir, "recipes")?;
    let mut book = RecipeBook::new();
    let mut by_name = HashMap::new();

    for data in deserialize_list::<RecipeData>(&path, "recipes")? {
        check_duplicate(&by_name, &data.name, &path)?;
        let recipe = resolve_recipe(&data, items, &path)?;
        book.insert(recipe.clone());
        by_name.insert(data.name, recipe);
    }
    Ok((book, by_name))
}

fn resolve_recipe(
    data: &RecipeData,
    items: &HashMap<String, ItemData>,
    path: &Path,
) -> Result<Recipe, DataLoadError> {
    let invalid = |detail: &str| DataLoadError::InvalidValue {
        file: path.to_path_buf(),
        name: data.name.clone(),
        detail: detail.to_string(),
    };
    if data.input_count == 0 || data.output_count == 0 {
        return Err(invalid("input and output counts must be at least 1"));
    }
    if !data.experience.is_finite() || data.experience < 0.0 {
        return Err(invalid("experience must be a non-negative number"));
    }

    let mut result = ItemStack::new(data.output.as_str(), data.output_count);
    if !items.is_empty() {
        resolve_name(items, &data.input, path, "item")?;
        let output = resolve_name(items, &data.output, path, "item")?;
        result = result.with_max_count(output.max_count);
        if let Some(capacity) = output.energy_capacity {
            result = result.with_energy(StoredCharge::empty(capacity));
        }
    }

    Ok(Recipe {
        id: data.name.as_str().into(),
        input: data.input.as_str().into(),
        input_count: data.input_count,
        result,
        cook_time: data.cook_time.max(1),
        experience: f64_to_fixed64(data.experience),
    })
}

fn load_machines(
    dir: &Path,
    all: &Arc<RecipeBook>,
    by_name: &HashMap<String, Recipe>,
) -> Result<HashMap<String, MachineDefinition>, DataLoadError> {
    let path = require_data_file(dir, "machines")?;
    let mut machines = HashMap::new();

    for data in deserialize_list::<MachineData>(&path, "machines")? {
        check_duplicate(&machines, &data.name, &path)?;

        let recipes: Arc<dyn RecipeLookup + Send + Sync> = if data.recipes.is_empty() {
            Arc::clone(all) as Arc<dyn RecipeLookup + Send + Sync>
        } else {
            let mut subset = RecipeBook::new();
            for name in &data.recipes {
                subset.insert(resolve_name(by_name, name, &path, "recipe")?.clone());
            }
            Arc::new(subset)
        };

        let definition = MachineDefinition {
            config: data.config,
            mode: data.mode,
            cook_speed: data.cook_speed.max(1),
            recipes,
        };
        let config_error = |source| DataLoadError::Config {
            file: path.clone(),
            name: data.name.clone(),
            source,
        };
        definition.config.validate().map_err(config_error)?;
        definition
            .behavior()
            .validate(&definition.config)
            .map_err(config_error)?;

        machines.insert(data.name, definition);
    }
    Ok(machines)
}

// ===========================================================================
// Tests
// ===========================================================================
