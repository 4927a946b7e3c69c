//! Distance-based level of detail selection
//!
//! A chunk picks the finest LOD whose visible distance threshold still
//! covers the viewer's distance to the chunk bounds. The last threshold
//! doubles as the maximum view distance.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// One LOD tier: mesh detail `lod` (higher = coarser) up to a distance
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodDescriptor {
    pub lod: u32,
    pub visible_distance_threshold: f32,
}

impl LodDescriptor {
    pub const fn new(lod: u32, visible_distance_threshold: f32) -> Self {
        Self { lod, visible_distance_threshold }
    }
}

/// Default tiers
/// - LOD 0: full detail - 0-150
/// - LOD 1: every 2nd sample - 150-300
/// - LOD 2: every 4th sample - 300-450
pub const DEFAULT_LOD_DESCRIPTORS: [LodDescriptor; 3] = [
    LodDescriptor::new(0, 150.0),
    LodDescriptor::new(1, 300.0),
    LodDescriptor::new(2, 450.0),
];

/// Validated, ascending list of LOD descriptors
#[derive(Clone, Debug, PartialEq)]
pub struct LodTable {
    descriptors: Vec<LodDescriptor>,
}

impl LodTable {
    /// Build a table. Fails when empty, unordered or non-finite.
    pub fn new(descriptors: Vec<LodDescriptor>) -> Result<Self> {
        if descriptors.is_empty() {
            return Err(Error::Config("LOD list must not be empty".to_string()));
        }
        if let Some(bad) = descriptors
            .iter()
            .find(|d| !d.visible_distance_threshold.is_finite() || d.visible_distance_threshold < 0.0)
        {
            return Err(Error::Config(format!(
                "LOD {} has invalid threshold {}",
                bad.lod, bad.visible_distance_threshold
            )));
        }
        if descriptors
            .windows(2)
            .any(|w| w[1].visible_distance_threshold < w[0].visible_distance_threshold)
        {
            return Err(Error::Config(
                "LOD thresholds must be sorted ascending".to_string(),
            ));
        }
        Ok(Self { descriptors })
    }

    pub fn descriptors(&self) -> &[LodDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LodDescriptor> {
        self.descriptors.get(index)
    }

    /// Threshold of the coarsest tier
    pub fn max_view_distance(&self) -> f32 {
        self.descriptors
            .last()
            .map(|d| d.visible_distance_threshold)
            .unwrap_or(0.0)
    }

    /// Whether something `distance` away is within view at all
    pub fn is_visible(&self, distance: f32) -> bool {
        distance <= self.max_view_distance()
    }

    /// Index of the finest tier covering `distance`, or the coarsest
    /// tier when only the last threshold is exceeded.
    ///
    /// # Examples
    /// ```
    /// use landmass::streaming::lod::{LodTable, DEFAULT_LOD_DESCRIPTORS};
    ///
    /// let table = LodTable::new(DEFAULT_LOD_DESCRIPTORS.to_vec()).unwrap();
    /// assert_eq!(table.lod_index_for_distance(0.0), 0);
    /// assert_eq!(table.lod_index_for_distance(150.0), 0);
    /// assert_eq!(table.lod_index_for_distance(200.0), 1);
    /// assert_eq!(table.lod_index_for_distance(330.0), 2);
    /// ```
    pub fn lod_index_for_distance(&self, distance: f32) -> usize {
        let last = self.descriptors.len().saturating_sub(1);
        self.descriptors[..last]
            .iter()
            .position(|d| distance <= d.visible_distance_threshold)
            .unwrap_or(last)
    }

    /// LOD index if visible, `None` beyond the view distance
    pub fn select(&self, distance: f32) -> Option<usize> {
        self.is_visible(distance)
            .then(|| self.lod_index_for_distance(distance))
    }
}

impl Default for LodTable {
    fn default() -> Self {
        Self { descriptors: DEFAULT_LOD_DESCRIPTORS.to_vec() }
    }
}
