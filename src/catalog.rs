// src/catalog.rs
//
// Immutable snapshot of hazard points and average-speed corridors for a
// session. The data loader builds one from already-validated records;
// replacement is a whole-snapshot swap, never in-place mutation.

use crate::types::{CorridorId, HazardId, HazardPoint, ZoneCorridor};
use std::collections::HashMap;
use tracing::debug;

pub struct HazardCatalog {
    hazards: Vec<HazardPoint>,
    corridors: Vec<ZoneCorridor>,
    hazard_index: HashMap<HazardId, usize>,
    corridor_index: HashMap<CorridorId, usize>,
}

impl HazardCatalog {
    pub fn new(hazards: Vec<HazardPoint>, corridors: Vec<ZoneCorridor>) -> Self {
        let mut catalog = Self {
            hazards: Vec::with_capacity(hazards.len()),
            corridors: Vec::with_capacity(corridors.len()),
            hazard_index: HashMap::with_capacity(hazards.len()),
            corridor_index: HashMap::with_capacity(corridors.len()),
        };

        // Ids derive from rounded coordinates, so two feed records within
        // ~1 m collapse to one entry. Keep the first.
        for hazard in hazards {
            if catalog.hazard_index.contains_key(&hazard.id) {
                debug!("Duplicate hazard {} dropped from catalog", hazard.id);
                continue;
            }
            catalog
                .hazard_index
                .insert(hazard.id.clone(), catalog.hazards.len());
            catalog.hazards.push(hazard);
        }

        for corridor in corridors {
            if catalog.corridor_index.contains_key(&corridor.id) {
                debug!("Duplicate corridor {} dropped from catalog", corridor.id);
                continue;
            }
            catalog
                .corridor_index
                .insert(corridor.id.clone(), catalog.corridors.len());
            catalog.corridors.push(corridor);
        }

        catalog
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn hazards(&self) -> &[HazardPoint] {
        &self.hazards
    }

    pub fn corridors(&self) -> &[ZoneCorridor] {
        &self.corridors
    }

    pub fn hazard(&self, id: &HazardId) -> Option<&HazardPoint> {
        self.hazard_index.get(id).map(|&i| &self.hazards[i])
    }

    pub fn corridor(&self, id: &CorridorId) -> Option<&ZoneCorridor> {
        self.corridor_index.get(id).map(|&i| &self.corridors[i])
    }

    pub fn contains_corridor(&self, id: &CorridorId) -> bool {
        self.corridor_index.contains_key(id)
    }

    pub fn hazard_count(&self) -> usize {
        self.hazards.len()
    }

    pub fn corridor_count(&self) -> usize {
        self.corridors.len()
    }
}
