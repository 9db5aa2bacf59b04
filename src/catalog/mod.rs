//! Species catalog
//!
//! Read-only source of species. The server only needs lookups by id,
//! random picks for team building, and the list of known types.
//! `StaticCatalog` ships a built-in Kanto roster and can also be loaded
//! from a JSON file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rand::seq::IndexedRandom;
use thiserror::Error;
use tracing::info;

use crate::combat::{BaseStats, Species, Type};

/// Catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("species {0} not found")]
    NotFound(u32),

    #[error("requested {requested} species but only {available} are available")]
    Insufficient { requested: usize, available: usize },

    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only species lookup
pub trait Catalog: Send + Sync {
    /// Look up one species
    fn find_by_id(&self, id: u32) -> Result<Arc<Species>, CatalogError>;

    /// Pick `count` distinct species at random
    fn find_random(&self, count: usize) -> Result<Vec<Arc<Species>>, CatalogError>;

    /// Names of every type carried by at least one species
    fn all_types(&self) -> Vec<String>;
}

/// In-memory catalog
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    species: Vec<Arc<Species>>,
    by_id: HashMap<u32, usize>,
}

impl StaticCatalog {
    /// Build from a list of species
    pub fn new(species: Vec<Species>) -> Self {
        let species: Vec<Arc<Species>> = species.into_iter().map(Arc::new).collect();
        let by_id = species
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id, i))
            .collect();
        Self { species, by_id }
    }

    /// Built-in roster
    pub fn builtin() -> Self {
        Self::new(builtin_species())
    }

    /// Load species from a JSON array
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let species: Vec<Species> =
            serde_json::from_str(json).map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        if species.is_empty() {
            return Err(CatalogError::Unavailable("catalog file is empty".into()));
        }
        Ok(Self::new(species))
    }

    /// Load species from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Unavailable(format!("{}: {}", path.display(), e)))?;
        let catalog = Self::from_json(&json)?;
        info!("Loaded {} species from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

impl Catalog for StaticCatalog {
    fn find_by_id(&self, id: u32) -> Result<Arc<Species>, CatalogError> {
        self.by_id
            .get(&id)
            .map(|&i| self.species[i].clone())
            .ok_or(CatalogError::NotFound(id))
    }

    fn find_random(&self, count: usize) -> Result<Vec<Arc<Species>>, CatalogError> {
        if count > self.species.len() {
            return Err(CatalogError::Insufficient {
                requested: count,
                available: self.species.len(),
            });
        }
        let mut rng = rand::rng();
        Ok(self
            .species
            .choose_multiple(&mut rng, count)
            .cloned()
            .collect())
    }

    fn all_types(&self) -> Vec<String> {
        Type::ALL
            .iter()
            .filter(|t| self.species.iter().any(|s| s.has_type(**t)))
            .map(|t| t.as_str().to_string())
            .collect()
    }
}

fn mon(
    id: u32,
    name: &str,
    type1: Type,
    type2: Option<Type>,
    [hp, attack, defense, sp_attack, sp_defense, speed]: [u32; 6],
) -> Species {
    Species::new(
        id,
        name,
        type1,
        type2,
        BaseStats {
            hp,
            attack,
            defense,
            sp_attack,
            sp_defense,
            speed,
        },
    )
}

fn builtin_species() -> Vec<Species> {
    use Type::*;
    vec![
        mon(3, "Venusaur", Grass, Some(Poison), [80, 82, 83, 100, 100, 80]),
        mon(6, "Charizard", Fire, Some(Flying), [78, 84, 78, 109, 85, 100]),
        mon(9, "Blastoise", Water, None, [79, 83, 100, 85, 105, 78]),
        mon(12, "Butterfree", Bug, Some(Flying), [60, 45, 50, 90, 80, 70]),
        mon(25, "Pikachu", Electric, None, [35, 55, 40, 50, 50, 90]),
        mon(31, "Nidoqueen", Poison, Some(Ground), [90, 92, 87, 75, 85, 76]),
        mon(38, "Ninetales", Fire, None, [73, 76, 75, 81, 100, 100]),
        mon(59, "Arcanine", Fire, None, [90, 110, 80, 100, 80, 95]),
        mon(65, "Alakazam", Psychic, None, [55, 50, 45, 135, 95, 120]),
        mon(68, "Machamp", Fighting, None, [90, 130, 80, 65, 85, 55]),
        mon(76, "Golem", Rock, Some(Ground), [80, 120, 130, 55, 65, 45]),
        mon(94, "Gengar", Ghost, Some(Poison), [60, 65, 60, 130, 75, 110]),
        mon(103, "Exeggutor", Grass, Some(Psychic), [95, 95, 85, 125, 75, 55]),
        mon(121, "Starmie", Water, Some(Psychic), [60, 75, 85, 100, 85, 115]),
        mon(130, "Gyarados", Water, Some(Flying), [95, 125, 79, 60, 100, 81]),
        mon(131, "Lapras", Water, Some(Ice), [130, 85, 80, 85, 95, 60]),
        mon(135, "Jolteon", Electric, None, [65, 65, 60, 110, 95, 130]),
        mon(143, "Snorlax", Normal, None, [160, 110, 65, 65, 110, 30]),
        mon(149, "Dragonite", Dragon, Some(Flying), [91, 134, 95, 100, 100, 80]),
        mon(208, "Steelix", Steel, Some(Ground), [75, 85, 200, 55, 65, 30]),
        mon(212, "Scizor", Bug, Some(Steel), [70, 130, 100, 55, 80, 65]),
        mon(229, "Houndoom", Dark, Some(Fire), [75, 90, 50, 110, 80, 95]),
        mon(282, "Gardevoir", Psychic, Some(Fairy), [68, 65, 65, 125, 115, 80]),
        mon(144, "Articuno", Ice, Some(Flying), [90, 85, 100, 95, 125, 85]),
    ]
}
