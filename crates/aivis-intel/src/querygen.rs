//! Deterministic probe-query generation.
//!
//! Repeated runs for the same company must produce the same batch so score
//! movements reflect the search landscape, not query churn. No randomness
//! anywhere in here.

use std::cmp::Reverse;

use uuid::Uuid;

use aivis_core::scoring::CategoryWeights;
use aivis_core::{CompanyProfile, QueryCategory};

use crate::types::ProbeQuery;

pub struct QueryGenerator {
    weights: CategoryWeights,
    per_category_cap: usize,
}

impl QueryGenerator {
    #[must_use]
    pub fn new(weights: CategoryWeights, per_category_cap: usize) -> Self {
        Self {
            weights,
            per_category_cap,
        }
    }

    /// Generate the probe-query batch for a company.
    ///
    /// Output is capped per category and sorted by priority descending,
    /// ties broken by category declaration order then insertion order.
    #[must_use]
    pub fn generate(&self, company: &CompanyProfile) -> Vec<ProbeQuery> {
        let slug = company.slug();
        let mut queries = Vec::new();

        for category in QueryCategory::all() {
            let priority = self.weights.priority(category);
            for text in templates(category, company)
                .into_iter()
                .take(self.per_category_cap)
            {
                queries.push(ProbeQuery {
                    id: Uuid::new_v4(),
                    company_slug: slug.clone(),
                    text,
                    category,
                    priority,
                });
            }
        }

        // Stable sort keeps insertion order as the final tie-break.
        queries.sort_by_key(|q| (Reverse(q.priority), q.category));
        queries
    }
}

fn templates(category: QueryCategory, company: &CompanyProfile) -> Vec<String> {
    let name = company.name.as_str();
    let industry = company.industry.as_str();

    match category {
        QueryCategory::ProblemUnaware => vec![
            format!("common {industry} challenges"),
            format!("how to choose {industry} software"),
            format!("what is {industry}"),
            format!("{industry} best practices"),
        ],
        QueryCategory::SolutionSeeking => vec![
            format!("best {industry} tools"),
            format!("top {industry} platforms"),
            format!("{industry} software comparison"),
            format!("{industry} recommendations"),
        ],
        QueryCategory::BrandSpecific => vec![
            format!("{name} review"),
            format!("{name} pricing"),
            format!("what is {name}"),
            format!("is {name} legit"),
            format!("{name} features"),
        ],
        QueryCategory::Comparison => {
            let mut texts = vec![format!("{name} alternatives")];
            for competitor in &company.competitors {
                texts.push(format!("{name} vs {}", competitor.name));
            }
            texts
        }
        QueryCategory::PurchaseIntent => vec![
            format!("buy {industry} software"),
            format!("{industry} pricing"),
            format!("{name} free trial"),
            format!("{name} discount"),
        ],
        QueryCategory::UseCase => vec![
            format!("{industry} for small business"),
            format!("how to use {name}"),
            format!("{name} use cases"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use aivis_core::company::CompetitorProfile;

    use super::*;

    fn acme() -> CompanyProfile {
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

    fn generator() -> QueryGenerator {
        QueryGenerator::new(CategoryWeights::default(), 10)
    }

    #[test]
    fn output_is_sorted_by_priority_descending() {
        let queries = generator().generate(&acme());
        let priorities: Vec<u8> = queries.iter().map(|q| q.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_by_key(|p| Reverse(*p));
        assert_eq!(priorities, sorted);
    }

    #[test]
    fn equal_priorities_break_ties_by_category_order() {
        let queries = generator().generate(&acme());
        for pair in queries.windows(2) {
            if pair[0].priority == pair[1].priority {
                assert!(
                    pair[0].category <= pair[1].category,
                    "{:?} should not precede {:?}",
                    pair[0].category,
                    pair[1].category
                );
            }
        }
    }

    #[test]
    fn generation_is_deterministic_for_identical_input() {
        let a = generator().generate(&acme());
        let b = generator().generate(&acme());
        let texts_a: Vec<(&str, QueryCategory, u8)> =
            a.iter().map(|q| (q.text.as_str(), q.category, q.priority)).collect();
        let texts_b: Vec<(&str, QueryCategory, u8)> =
            b.iter().map(|q| (q.text.as_str(), q.category, q.priority)).collect();
        assert_eq!(texts_a, texts_b);
    }

    #[test]
    fn per_category_cap_is_enforced() {
        let queries = QueryGenerator::new(CategoryWeights::default(), 2).generate(&acme());
        for category in QueryCategory::all() {
            let count = queries.iter().filter(|q| q.category == category).count();
            assert!(count <= 2, "{category} produced {count} queries");
        }
    }

    #[test]
    fn comparison_queries_name_each_competitor() {
        let queries = generator().generate(&acme());
        let comparison: Vec<&str> = queries
            .iter()
            .filter(|q| q.category == QueryCategory::Comparison)
            .map(|q| q.text.as_str())
            .collect();
        assert!(comparison.contains(&"Acme vs Rival"));
        assert!(comparison.contains(&"Acme vs Contoso"));
    }

    #[test]
    fn queries_carry_company_slug() {
        let queries = generator().generate(&acme());
        assert!(queries.iter().all(|q| q.company_slug == "acme"));
    }
}
