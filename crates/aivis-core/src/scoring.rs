//! Scoring policy configuration.
//!
//! All scoring weights live here rather than in the scoring algorithms, so
//! policy can evolve without touching the algorithm shape. Loaded from a
//! YAML file when present; [`ScoringPolicy::default`] carries the shipped
//! weights otherwise.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::categories::QueryCategory;
use crate::ConfigError;

/// Relative importance of each query category, in `[0.0, 1.0]`.
///
/// Drives both probe-query priority (scaled to 0..=10) and the
/// category-weighted term of the authority score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWeights(BTreeMap<QueryCategory, f64>);

impl CategoryWeights {
    #[must_use]
    pub fn weight(&self, category: QueryCategory) -> f64 {
        self.0.get(&category).copied().unwrap_or(0.0)
    }

    /// Map a category weight onto the 0..=10 probe-query priority scale.
    #[must_use]
    pub fn priority(&self, category: QueryCategory) -> u8 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let p = (self.weight(category) * 10.0).round().clamp(0.0, 10.0) as u8;
        p
    }
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self(BTreeMap::from([
            (QueryCategory::BrandSpecific, 1.0),
            (QueryCategory::Comparison, 0.9),
            (QueryCategory::SolutionSeeking, 0.8),
            (QueryCategory::PurchaseIntent, 0.7),
            (QueryCategory::UseCase, 0.5),
            (QueryCategory::ProblemUnaware, 0.3),
        ]))
    }
}

/// Weights for the three terms of the brand-authority score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityWeights {
    /// Fraction of queries with any brand mention.
    pub mention_rate: f64,
    /// Inverse of the average best matching position.
    pub position: f64,
    /// Category-weighted mention rate.
    pub category: f64,
}

impl Default for AuthorityWeights {
    fn default() -> Self {
        Self {
            mention_rate: 0.4,
            position: 0.35,
            category: 0.25,
        }
    }
}

impl AuthorityWeights {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.mention_rate + self.position + self.category
    }
}

/// Share-of-voice policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareOfVoicePolicy {
    /// Minimum reported share, in percent. Avoids division artifacts when
    /// neither the brand nor any competitor appears.
    pub floor_pct: f64,
}

impl Default for ShareOfVoicePolicy {
    fn default() -> Self {
        Self { floor_pct: 1.0 }
    }
}

/// How one downstream AI platform is believed to source citations.
///
/// The three weights should sum to 1.0; validation enforces a small
/// tolerance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformProfile {
    pub platform: String,
    pub authority_weight: f64,
    pub sov_weight: f64,
    pub density_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub category_weights: CategoryWeights,
    pub authority: AuthorityWeights,
    pub share_of_voice: ShareOfVoicePolicy,
    pub platforms: Vec<PlatformProfile>,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            category_weights: CategoryWeights::default(),
            authority: AuthorityWeights::default(),
            share_of_voice: ShareOfVoicePolicy::default(),
            platforms: vec![
                // Conversational assistants lean on brand strength; source-citing
                // assistants lean on share of voice and mention density.
                profile("chatgpt", 0.45, 0.30, 0.25),
                profile("claude", 0.40, 0.30, 0.30),
                profile("perplexity", 0.30, 0.40, 0.30),
                profile("gemini", 0.35, 0.35, 0.30),
            ],
        }
    }
}

fn profile(platform: &str, authority: f64, sov: f64, density: f64) -> PlatformProfile {
    PlatformProfile {
        platform: platform.to_string(),
        authority_weight: authority,
        sov_weight: sov,
        density_weight: density,
    }
}

impl ScoringPolicy {
    /// Load a scoring policy from a YAML file and validate it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
            path: path.display().to_string(),
            source: e,
        })?;
        let policy: ScoringPolicy = serde_yaml::from_str(&content)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load from `path` when the file exists, otherwise fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be parsed or
    /// fails validation.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate weight ranges and platform profile sums.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.authority.total() <= 0.0 {
            return Err(ConfigError::Validation(
                "authority weights must sum to a positive value".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.share_of_voice.floor_pct) {
            return Err(ConfigError::Validation(format!(
                "share-of-voice floor must be in [0, 100], got {}",
                self.share_of_voice.floor_pct
            )));
        }
        if self.platforms.is_empty() {
            return Err(ConfigError::Validation(
                "at least one platform profile is required".to_string(),
            ));
        }
        for p in &self.platforms {
            let sum = p.authority_weight + p.sov_weight + p.density_weight;
            if (sum - 1.0).abs() > 0.01 {
                return Err(ConfigError::Validation(format!(
                    "platform '{}' weights sum to {sum:.3}; must sum to 1.0",
                    p.platform
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        ScoringPolicy::default().validate().unwrap();
    }

    #[test]
    fn default_priorities_follow_category_weights() {
        let weights = CategoryWeights::default();
        assert_eq!(weights.priority(QueryCategory::BrandSpecific), 10);
        assert_eq!(weights.priority(QueryCategory::ProblemUnaware), 3);
    }

    #[test]
    fn unknown_category_weight_is_zero() {
        let weights = CategoryWeights(BTreeMap::new());
        assert_eq!(weights.weight(QueryCategory::Comparison), 0.0);
        assert_eq!(weights.priority(QueryCategory::Comparison), 0);
    }

    #[test]
    fn validate_rejects_bad_platform_sum() {
        let mut policy = ScoringPolicy::default();
        policy.platforms[0].authority_weight = 0.9;
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("must sum to 1.0"));
    }

    #[test]
    fn validate_rejects_out_of_range_floor() {
        let mut policy = ScoringPolicy::default();
        policy.share_of_voice.floor_pct = 120.0;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn yaml_round_trip_preserves_platforms() {
        let policy = ScoringPolicy::default();
        let yaml = serde_yaml::to_string(&policy).unwrap();
        let back: ScoringPolicy = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.platforms.len(), policy.platforms.len());
        back.validate().unwrap();
    }
}
