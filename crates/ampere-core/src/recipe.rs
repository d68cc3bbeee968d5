//! Recipes and recipe lookup.

use crate::fixed::Fixed64;
use crate::id::{ItemId, RecipeId};
use crate::item::ItemStack;
use serde::{Deserialize, Serialize};

/// Cycle length used when no recipe matches the current input.
pub const DEFAULT_COOK_TIME: u32 = 200;

fn one() -> u32 {
    1
}

fn default_cook_time() -> u32 {
    DEFAULT_COOK_TIME
}

/// A single-input transformation: `input_count` of `input` become `result`
/// after `cook_time` ticks of progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub input: ItemId,
    #[serde(default = "one")]
    pub input_count: u32,
    pub result: ItemStack,
    #[serde(default = "default_cook_time")]
    pub cook_time: u32,
    #[serde(default)]
    pub experience: Fixed64,
}

impl Recipe {
    /// Whether some stack in `input` can feed one cycle.
    pub fn matches(&self, input: &[ItemStack]) -> bool {
        input
            .iter()
            .any(|s| s.is_of(&self.input) && s.count >= self.input_count)
    }

    /// The stack produced from `input`.
    pub fn result_for(&self, _input: &[ItemStack]) -> ItemStack {
        self.result.clone()
    }
}

/// Source of recipes for processing behaviors.
pub trait RecipeLookup {
    /// First recipe matching `input`.
    fn find_recipe(&self, input: &[ItemStack]) -> Option<&Recipe>;

    fn recipe_by_id(&self, id: &RecipeId) -> Option<&Recipe>;
}

/// An ordered list of recipes. Earlier recipes win when several match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeBook {
    recipes: Vec<Recipe>,
}

impl RecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a recipe, replacing any recipe with the same id in place.
    pub fn insert(&mut self, recipe: Recipe) {
        match self.recipes.iter_mut().find(|r| r.id == recipe.id) {
            Some(existing) => *existing = recipe,
            None => self.recipes.push(recipe),
        }
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.iter()
    }
}

impl FromIterator<Recipe> for RecipeBook {
    fn from_iter<I: IntoIterator<Item = Recipe>>(iter: I) -> Self {
        let mut book = RecipeBook::new();
        for recipe in iter {
            book.insert(recipe);
        }
        book
    }
}

impl RecipeLookup for RecipeBook {
    fn find_recipe(&self, input: &[ItemStack]) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.matches(input))
    }

    fn recipe_by_id(&self, id: &RecipeId) -> Option<&Recipe> {
        self.recipes.iter().find(|r| &r.id == id)
    }
}
