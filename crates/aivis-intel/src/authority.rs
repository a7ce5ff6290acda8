//! Brand authority scoring.

use aivis_core::scoring::{AuthorityWeights, CategoryWeights};
use aivis_core::QueryCategory;

use crate::types::BatchMetrics;

/// Combines batch metrics into a single authority score in `[0, 100]`.
///
/// Three weighted terms, each already in `[0, 1]`:
/// - mention rate across the whole batch,
/// - `1 / avg_best_position` (zero when the brand never ranked),
/// - category-weighted mention rate, so presence on high-intent queries
///   counts more than presence on generic ones.
#[derive(Debug, Clone)]
pub struct BrandAuthorityScorer {
    weights: AuthorityWeights,
    categories: CategoryWeights,
}

impl BrandAuthorityScorer {
    #[must_use]
    pub fn new(weights: AuthorityWeights, categories: CategoryWeights) -> Self {
        Self { weights, categories }
    }

    #[must_use]
    pub fn score(&self, batch: &BatchMetrics) -> f64 {
        let mention_term = batch.mention_rate();
        let position_term = batch
            .avg_best_position
            .filter(|p| *p >= 1.0)
            .map_or(0.0, |p| 1.0 / p);
        let category_term = self.category_term(batch);

        let weighted = self.weights.mention_rate * mention_term
            + self.weights.position * position_term
            + self.weights.category * category_term;

        (100.0 * weighted / self.weights.total()).clamp(0.0, 100.0)
    }

    /// Mention rate weighted by category importance, normalized over the
    /// categories actually present in the batch.
    fn category_term(&self, batch: &BatchMetrics) -> f64 {
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
            weighted_sum / weight_total
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::types::CategoryMetrics;

    use super::*;

    fn scorer() -> BrandAuthorityScorer {
        BrandAuthorityScorer::new(AuthorityWeights::default(), CategoryWeights::default())
    }

    fn batch(
        query_count: usize,
        queries_with_mention: usize,
        avg_best_position: Option<f64>,
        by_category: BTreeMap<QueryCategory, CategoryMetrics>,
    ) -> BatchMetrics {
        BatchMetrics {
            query_count,
            queries_with_mention,
            total_mentions: queries_with_mention as u32,
            total_citations: 0,
            avg_best_position,
            by_category,
        }
    }

    #[test]
    fn perfect_batch_scores_one_hundred() {
        let by_category = BTreeMap::from([(
            QueryCategory::BrandSpecific,
            CategoryMetrics {
                queries: 10,
                queries_with_mention: 10,
            },
        )]);
        let score = scorer().score(&batch(10, 10, Some(1.0), by_category));
        assert!((score - 100.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn absent_brand_scores_zero() {
        let by_category = BTreeMap::from([(
            QueryCategory::BrandSpecific,
            CategoryMetrics {
                queries: 10,
                queries_with_mention: 0,
            },
        )]);
        let score = scorer().score(&batch(10, 0, None, by_category));
        assert!((score - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_batch_scores_zero() {
        let score = scorer().score(&BatchMetrics::default());
        assert!((score - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deeper_positions_lower_the_score() {
        let by_category = BTreeMap::from([(
            QueryCategory::BrandSpecific,
            CategoryMetrics {
                queries: 10,
                queries_with_mention: 10,
            },
        )]);
        let top = scorer().score(&batch(10, 10, Some(1.0), by_category.clone()));
        let deep = scorer().score(&batch(10, 10, Some(10.0), by_category));
        assert!(top > deep);
    }

    #[test]
    fn high_intent_mentions_outscore_low_intent_mentions() {
        let brand_only = BTreeMap::from([
            (
                QueryCategory::BrandSpecific,
                CategoryMetrics {
                    queries: 5,
                    queries_with_mention: 5,
                },
            ),
            (
                QueryCategory::ProblemUnaware,
                CategoryMetrics {
                    queries: 5,
                    queries_with_mention: 0,
                },
            ),
        ]);
        let generic_only = BTreeMap::from([
            (
                QueryCategory::BrandSpecific,
                CategoryMetrics {
                    queries: 5,
                    queries_with_mention: 0,
                },
            ),
            (
                QueryCategory::ProblemUnaware,
                CategoryMetrics {
                    queries: 5,
                    queries_with_mention: 5,
                },
            ),
        ]);
        let high = scorer().score(&batch(10, 5, Some(3.0), brand_only));
        let low = scorer().score(&batch(10, 5, Some(3.0), generic_only));
        assert!(high > low);
    }

    #[test]
    fn score_stays_within_bounds() {
        let by_category = BTreeMap::from([(
            QueryCategory::Comparison,
            CategoryMetrics {
                queries: 3,
                queries_with_mention: 2,
            },
        )]);
        let score = scorer().score(&batch(3, 2, Some(2.5), by_category));
        assert!((0.0..=100.0).contains(&score));
    }
}
