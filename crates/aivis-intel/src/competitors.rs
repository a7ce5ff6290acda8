//! Competitor mention counting and share of voice.

use std::collections::BTreeMap;

use aivis_core::scoring::ShareOfVoicePolicy;
use aivis_core::CompanyProfile;

use crate::ranking::RankingAnalyzer;
use crate::types::{FetchedQuery, ShareOfVoice};

/// Counts competitor mentions across a run's result sets and computes the
/// focal brand's share of the combined mention volume.
///
/// An entry matching both the focal brand and a competitor credits only the
/// focal brand, so a comparison page never dilutes the share it helped earn.
#[derive(Debug, Clone)]
pub struct CompetitorAnalyzer {
    focal: RankingAnalyzer,
    competitors: Vec<(String, RankingAnalyzer)>,
    policy: ShareOfVoicePolicy,
}

impl CompetitorAnalyzer {
    #[must_use]
    pub fn for_company(company: &CompanyProfile, policy: ShareOfVoicePolicy) -> Self {
        let competitors = company
            .competitors
            .iter()
            .map(|c| (c.name.clone(), RankingAnalyzer::for_competitor(c)))
            .collect();
        Self {
            focal: RankingAnalyzer::for_company(company),
            competitors,
            policy,
        }
    }

    #[must_use]
    pub fn share_of_voice(&self, fetched: &[FetchedQuery]) -> ShareOfVoice {
        let mut brand_mentions: u32 = 0;
        let mut competitor_mentions: BTreeMap<String, u32> = self
            .competitors
            .iter()
            .map(|(name, _)| (name.clone(), 0))
            .collect();

        for item in fetched {
            for entry in &item.result.rankings {
                if self.focal.matches_entry(entry) {
                    brand_mentions += 1;
                    continue;
                }
                for (name, analyzer) in &self.competitors {
                    if analyzer.matches_entry(entry) {
                        if let Some(count) = competitor_mentions.get_mut(name) {
                            *count += 1;
                        }
                        // First matching competitor wins; a single entry is
                        // one unit of voice, not one per competitor.
                        break;
                    }
                }
            }
        }

        let competitor_total: u32 = competitor_mentions.values().sum();
        let denominator = brand_mentions + competitor_total;

        let (raw_pct, competitor_pct) = if denominator == 0 {
            (0.0, competitor_mentions.keys().map(|n| (n.clone(), 0.0)).collect())
        } else {
            let denom = f64::from(denominator);
            let raw = 100.0 * f64::from(brand_mentions) / denom;
            let per_competitor = competitor_mentions
                .iter()
                .map(|(name, &count)| (name.clone(), 100.0 * f64::from(count) / denom))
                .collect();
            (raw, per_competitor)
        };

        let pct = raw_pct.clamp(self.policy.floor_pct, 100.0);
        ShareOfVoice {
            pct,
            brand_mentions,
            competitor_mentions,
            competitor_pct,
            floored: pct > raw_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use aivis_core::company::CompetitorProfile;
    use aivis_core::QueryCategory;
    use aivis_serp::{ProviderId, RankingEntry, SerpResult};

    use crate::types::ProbeQuery;

    use super::*;

    fn company() -> CompanyProfile {
        CompanyProfile {
            name: "Acme".to_string(),
            domain: "acme.com".to_string(),
            industry: "project management".to_string(),
            aliases: vec![],
            competitors: vec![
                CompetitorProfile {
                    name: "Rival".to_string(),
                    domain: Some("rival.io".to_string()),
                },
                CompetitorProfile {
                    name: "Contoso".to_string(),
                    domain: None,
                },
            ],
        }
    }

    fn entry(position: u32, domain: &str, title: &str) -> RankingEntry {
        RankingEntry {
            position,
            url: format!("https://{domain}/"),
            domain: domain.to_string(),
            title: title.to_string(),
            snippet: String::new(),
        }
    }

    fn fetched(rankings: Vec<RankingEntry>) -> FetchedQuery {
        FetchedQuery {
            query: ProbeQuery {
                id: uuid::Uuid::new_v4(),
                company_slug: "acme".to_string(),
                text: "q".to_string(),
                category: QueryCategory::Comparison,
                priority: 9,
            },
            result: SerpResult {
                request_key: "test".to_string(),
                provider: ProviderId::ValueSerp,
                rankings,
                fetched_at: Utc::now(),
                from_cache: false,
            },
        }
    }

    fn analyzer() -> CompetitorAnalyzer {
        CompetitorAnalyzer::for_company(&company(), ShareOfVoicePolicy::default())
    }

    #[test]
    fn share_splits_between_brand_and_competitors() {
        let sov = analyzer().share_of_voice(&[fetched(vec![
            entry(1, "acme.com", "Acme"),
            entry(2, "rival.io", "Rival"),
            entry(3, "example.com", "Contoso guide"),
            entry(4, "acme.com", "Acme docs"),
        ])]);

        assert_eq!(sov.brand_mentions, 2);
        assert_eq!(sov.competitor_mentions["Rival"], 1);
        assert_eq!(sov.competitor_mentions["Contoso"], 1);
        assert!((sov.pct - 50.0).abs() < 1e-9);
        assert!((sov.competitor_pct["Rival"] - 25.0).abs() < 1e-9);
        assert!(!sov.floored);
    }

    #[test]
    fn entry_matching_brand_and_competitor_credits_the_brand() {
        let sov = analyzer().share_of_voice(&[fetched(vec![entry(
            1,
            "acme.com",
            "Acme vs Rival: which wins?",
        )])]);
        assert_eq!(sov.brand_mentions, 1);
        assert_eq!(sov.competitor_mentions["Rival"], 0);
        assert!((sov.pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn no_mentions_anywhere_reports_the_floor() {
        let sov = analyzer().share_of_voice(&[fetched(vec![entry(
            1,
            "example.com",
            "unrelated page",
        )])]);
        assert_eq!(sov.brand_mentions, 0);
        assert!((sov.pct - 1.0).abs() < 1e-9);
        assert!(sov.floored);
    }

    #[test]
    fn competitor_only_results_floor_the_brand_share() {
        let sov = analyzer().share_of_voice(&[fetched(vec![
            entry(1, "rival.io", "Rival"),
            entry(2, "rival.io", "Rival pricing"),
        ])]);
        assert_eq!(sov.brand_mentions, 0);
        assert_eq!(sov.competitor_mentions["Rival"], 2);
        assert!((sov.pct - 1.0).abs() < 1e-9);
        assert!(sov.floored);
        assert!((sov.competitor_pct["Rival"] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn every_competitor_appears_in_the_report_even_at_zero() {
        let sov = analyzer().share_of_voice(&[]);
        assert_eq!(sov.competitor_mentions.len(), 2);
        assert!(sov.competitor_mentions.values().all(|&c| c == 0));
    }
}
