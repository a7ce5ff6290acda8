//! Brand-presence analysis over parsed result sets.

use std::collections::BTreeMap;

use aivis_core::company::CompetitorProfile;
use aivis_core::CompanyProfile;
use aivis_serp::{RankingEntry, SerpResult};

use crate::types::{BatchMetrics, CategoryMetrics, FetchedQuery, RankingMetrics};

/// Detects a brand in ranking entries.
///
/// A *citation* is an entry whose domain equals the brand's own domain. A
/// *mention* is a citation or a case-insensitive occurrence of the brand name
/// (or an alias) in the entry's title or snippet. The substring check is a
/// deliberate imprecision: short or generic brand names ("Monday", "Notion")
/// will over-match in text, which callers should keep in mind when reading
/// absolute numbers. Trends across runs stay comparable because the rule is
/// stable.
#[derive(Debug, Clone)]
pub struct RankingAnalyzer {
    domain: Option<String>,
    needles: Vec<String>,
}

impl RankingAnalyzer {
    #[must_use]
    pub fn for_company(company: &CompanyProfile) -> Self {
        let mut needles = vec![company.name.clone()];
        needles.extend(company.aliases.iter().cloned());
        Self::from_parts(Some(company.domain.clone()), needles)
    }

    #[must_use]
    pub fn for_competitor(competitor: &CompetitorProfile) -> Self {
        Self::from_parts(competitor.domain.clone(), vec![competitor.name.clone()])
    }

    #[must_use]
    pub fn from_parts(domain: Option<String>, names: Vec<String>) -> Self {
        let needles = names
            .into_iter()
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        Self {
            domain: domain.map(|d| normalize_domain(&d)),
            needles,
        }
    }

    #[must_use]
    pub fn matches_entry(&self, entry: &RankingEntry) -> bool {
        self.is_citation(entry) || self.mentions_name(entry)
    }

    #[must_use]
    pub fn is_citation(&self, entry: &RankingEntry) -> bool {
        match &self.domain {
            Some(domain) => normalize_domain(&entry.domain) == *domain,
            None => false,
        }
    }

    fn mentions_name(&self, entry: &RankingEntry) -> bool {
        let title = entry.title.to_lowercase();
        let snippet = entry.snippet.to_lowercase();
        self.needles
            .iter()
            .any(|n| title.contains(n) || snippet.contains(n))
    }

    /// Per-result-set metrics for one fetched query.
    #[must_use]
    pub fn analyze(&self, result: &SerpResult) -> RankingMetrics {
        let mut metrics = RankingMetrics::default();
        for entry in &result.rankings {
            let citation = self.is_citation(entry);
            if citation || self.mentions_name(entry) {
                metrics.mentions += 1;
                metrics.best_position = Some(match metrics.best_position {
                    Some(best) => best.min(entry.position),
                    None => entry.position,
                });
            }
            if citation {
                metrics.citations += 1;
            }
        }
        metrics
    }

    /// Aggregate a run's fetched queries into batch-level metrics.
    ///
    /// Queries with empty result sets count toward totals and dilute the
    /// mention rate; they were real probes that found nothing.
    #[must_use]
    pub fn aggregate(&self, fetched: &[FetchedQuery]) -> BatchMetrics {
        let mut batch = BatchMetrics {
            query_count: fetched.len(),
            ..BatchMetrics::default()
        };
        let mut by_category: BTreeMap<_, CategoryMetrics> = BTreeMap::new();
        let mut best_positions = Vec::new();

        for item in fetched {
            let metrics = self.analyze(&item.result);
            let slot = by_category.entry(item.query.category).or_default();
            slot.queries += 1;
            if metrics.mentions > 0 {
                batch.queries_with_mention += 1;
                slot.queries_with_mention += 1;
            }
            batch.total_mentions += metrics.mentions;
            batch.total_citations += metrics.citations;
            if let Some(best) = metrics.best_position {
                best_positions.push(f64::from(best));
            }
        }

        if !best_positions.is_empty() {
            #[allow(clippy::cast_precision_loss)]
            let avg = best_positions.iter().sum::<f64>() / best_positions.len() as f64;
            batch.avg_best_position = Some(avg);
        }
        batch.by_category = by_category;
        batch
    }
}

fn normalize_domain(domain: &str) -> String {
    let d = domain.trim().to_lowercase();
    d.strip_prefix("www.").map_or(d.clone(), str::to_string)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use aivis_core::QueryCategory;
    use aivis_serp::ProviderId;

    use crate::types::ProbeQuery;

    use super::*;

    fn entry(position: u32, domain: &str, title: &str, snippet: &str) -> RankingEntry {
        RankingEntry {
            position,
            url: format!("https://{domain}/page"),
            domain: domain.to_string(),
            title: title.to_string(),
            snippet: snippet.to_string(),
        }
    }

    fn result(rankings: Vec<RankingEntry>) -> SerpResult {
        SerpResult {
            request_key: "test".to_string(),
            provider: ProviderId::ValueSerp,
            rankings,
            fetched_at: Utc::now(),
            from_cache: false,
        }
    }

    fn analyzer() -> RankingAnalyzer {
        RankingAnalyzer::from_parts(
            Some("acme.com".to_string()),
            vec!["Acme".to_string(), "Acme Corp".to_string()],
        )
    }

    #[test]
    fn own_domain_counts_as_citation_and_mention() {
        let metrics = analyzer().analyze(&result(vec![entry(
            1,
            "acme.com",
            "Product page",
            "welcome",
        )]));
        assert_eq!(metrics.mentions, 1);
        assert_eq!(metrics.citations, 1);
        assert_eq!(metrics.best_position, Some(1));
    }

    #[test]
    fn www_prefix_is_ignored_for_citations() {
        let metrics = analyzer().analyze(&result(vec![entry(
            3,
            "www.acme.com",
            "Docs",
            "",
        )]));
        assert_eq!(metrics.citations, 1);
    }

    #[test]
    fn name_in_title_is_a_mention_but_not_a_citation() {
        let metrics = analyzer().analyze(&result(vec![entry(
            2,
            "reviews.example.com",
            "ACME review 2026",
            "an honest look",
        )]));
        assert_eq!(metrics.mentions, 1);
        assert_eq!(metrics.citations, 0);
        assert_eq!(metrics.best_position, Some(2));
    }

    #[test]
    fn alias_in_snippet_matches() {
        let metrics = analyzer().analyze(&result(vec![entry(
            5,
            "blog.example.com",
            "Tool roundup",
            "we compared acme corp against others",
        )]));
        assert_eq!(metrics.mentions, 1);
    }

    #[test]
    fn best_position_is_the_minimum_across_matches() {
        let metrics = analyzer().analyze(&result(vec![
            entry(7, "example.com", "Acme mentioned here", ""),
            entry(2, "acme.com", "Home", ""),
            entry(9, "other.example.com", "nothing relevant", ""),
        ]));
        assert_eq!(metrics.mentions, 2);
        assert_eq!(metrics.best_position, Some(2));
    }

    #[test]
    fn empty_result_set_yields_zero_metrics() {
        let metrics = analyzer().analyze(&result(vec![]));
        assert_eq!(metrics, RankingMetrics::default());
    }

    #[test]
    fn competitor_without_domain_matches_by_name_only() {
        let a = RankingAnalyzer::for_competitor(&CompetitorProfile {
            name: "Contoso".to_string(),
            domain: None,
        });
        let metrics = a.analyze(&result(vec![
            entry(1, "contoso.example.com", "unrelated title", ""),
            entry(2, "example.com", "Contoso pricing guide", ""),
        ]));
        assert_eq!(metrics.mentions, 1);
        assert_eq!(metrics.citations, 0);
    }

    fn fetched(category: QueryCategory, rankings: Vec<RankingEntry>) -> FetchedQuery {
        FetchedQuery {
            query: ProbeQuery {
                id: uuid::Uuid::new_v4(),
                company_slug: "acme".to_string(),
                text: "q".to_string(),
                category,
                priority: 5,
            },
            result: result(rankings),
        }
    }

    #[test]
    fn aggregate_tracks_rates_and_average_best_position() {
        let batch = analyzer().aggregate(&[
            fetched(
                QueryCategory::BrandSpecific,
                vec![entry(2, "acme.com", "Home", "")],
            ),
            fetched(
                QueryCategory::BrandSpecific,
                vec![entry(4, "example.com", "Acme review", "")],
            ),
            fetched(QueryCategory::Comparison, vec![]),
        ]);

        assert_eq!(batch.query_count, 3);
        assert_eq!(batch.queries_with_mention, 2);
        assert_eq!(batch.total_citations, 1);
        assert!((batch.mention_rate() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(batch.avg_best_position, Some(3.0));

        let brand = &batch.by_category[&QueryCategory::BrandSpecific];
        assert_eq!(brand.queries, 2);
        assert_eq!(brand.queries_with_mention, 2);
        let comparison = &batch.by_category[&QueryCategory::Comparison];
        assert_eq!(comparison.queries, 1);
        assert_eq!(comparison.queries_with_mention, 0);
    }

    #[test]
    fn aggregate_of_empty_batch_is_zeroed() {
        let batch = analyzer().aggregate(&[]);
        assert_eq!(batch.query_count, 0);
        assert_eq!(batch.avg_best_position, None);
        assert!((batch.mention_rate() - 0.0).abs() < f64::EPSILON);
    }
}
