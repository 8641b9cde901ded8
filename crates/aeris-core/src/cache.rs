//! In-process cache of finished analyses.
//!
//! Keyed by the normalized polygon, date range, polarization, sampler version
//! and speckle policy. Results are immutable, so a hit is returned as a clone.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::geometry::ValidPolygon;
use crate::report::DroughtStatistics;
use crate::request::{DateRange, Polarization};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    polygon: Vec<(i64, i64)>,
    date_range: DateRange,
    polarization: Polarization,
    sampler_version: String,
    speckle_filtered: bool,
}

impl CacheKey {
    pub fn new(
        polygon: &ValidPolygon,
        date_range: DateRange,
        polarization: Polarization,
        sampler_version: String,
        speckle_filtered: bool,
    ) -> Self {
        Self {
            polygon: polygon.normalized_key(),
            date_range,
            polarization,
            sampler_version,
            speckle_filtered,
        }
    }
}

/// Bounded map; when full, new results are not inserted.
#[derive(Debug)]
pub struct ResultCache {
    entries: RwLock<HashMap<CacheKey, DroughtStatistics>>,
    capacity: usize,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}

impl ResultCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: RwLock::new(HashMap::new()), capacity }
    }

    pub fn get(&self, key: &CacheKey) -> Option<DroughtStatistics> {
        self.entries.read().get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, stats: DroughtStatistics) {
        let mut entries = self.entries.write();
        if entries.len() < self.capacity || entries.contains_key(&key) {
            entries.insert(key, stats);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
