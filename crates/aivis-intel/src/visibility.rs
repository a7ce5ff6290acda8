//! Per-platform AI visibility prediction.

use std::collections::BTreeMap;

use aivis_core::scoring::{CategoryWeights, PlatformProfile};
use aivis_core::QueryCategory;

use crate::types::{BatchMetrics, ShareOfVoice};

/// Predicts how visible a brand is likely to be in each AI platform's
/// answers, as a weighted blend of authority, share of voice, and mention
/// density. The platform profiles encode how heavily each platform is
/// believed to lean on organic-search evidence.
///
/// These are heuristics, not measurements; their value is in being
/// comparable across runs, not in their absolute magnitude.
#[derive(Debug, Clone)]
pub struct AiVisibilityPredictor {
    platforms: Vec<PlatformProfile>,
    categories: CategoryWeights,
}

impl AiVisibilityPredictor {
    #[must_use]
    pub fn new(platforms: Vec<PlatformProfile>, categories: CategoryWeights) -> Self {
        Self {
            platforms,
            categories,
        }
    }

    /// Predicted visibility per platform name, each in `[0, 100]`.
    #[must_use]
    pub fn predict(
        &self,
        authority: f64,
        sov: &ShareOfVoice,
        batch: &BatchMetrics,
    ) -> BTreeMap<String, f64> {
        let density = self.mention_density(batch);
        self.platforms
            .iter()
            .map(|p| {
                let score = authority * p.authority_weight
                    + sov.pct * p.sov_weight
                    + density * p.density_weight;
                (p.platform.clone(), score.clamp(0.0, 100.0))
            })
            .collect()
    }

    /// Category-weighted mention rate on the 0..=100 scale.
    fn mention_density(&self, batch: &BatchMetrics) -> f64 {
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for category in QueryCategory::all() {
            let Some(metrics) = batch.by_category.get(&category) else {
                continue;
            };
            if metrics.queries == 0 {
                continue;
            }
            let weight = self.categories.weight(category);
            weighted_sum += weight * metrics.mention_rate();
            weight_total += weight;
        }
        if weight_total > 0.0 {
            100.0 * weighted_sum / weight_total
        } else {
            0.0
        }
    }
}
