use serde::{Deserialize, Serialize};

/// Intent category of a probe query.
///
/// The declaration order doubles as the tie-break order when two queries
/// carry the same priority: earlier variants win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    ProblemUnaware,
    SolutionSeeking,
    BrandSpecific,
    Comparison,
    PurchaseIntent,
    UseCase,
}

impl QueryCategory {
    /// All categories in declaration (tie-break) order.
    #[must_use]
    pub const fn all() -> [QueryCategory; 6] {
        [
            QueryCategory::ProblemUnaware,
            QueryCategory::SolutionSeeking,
            QueryCategory::BrandSpecific,
            QueryCategory::Comparison,
            QueryCategory::PurchaseIntent,
            QueryCategory::UseCase,
        ]
    }

    /// Stable string form used in DB columns and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            QueryCategory::ProblemUnaware => "problem_unaware",
            QueryCategory::SolutionSeeking => "solution_seeking",
            QueryCategory::BrandSpecific => "brand_specific",
            QueryCategory::Comparison => "comparison",
            QueryCategory::PurchaseIntent => "purchase_intent",
            QueryCategory::UseCase => "use_case",
        }
    }
}

impl std::fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_matches_declaration_order() {
        let all = QueryCategory::all();
        let mut sorted = all;
        sorted.sort();
        assert_eq!(all, sorted, "all() must be in tie-break (Ord) order");
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&QueryCategory::ProblemUnaware).unwrap();
        assert_eq!(json, "\"problem_unaware\"");
        let back: QueryCategory = serde_json::from_str("\"purchase_intent\"").unwrap();
        assert_eq!(back, QueryCategory::PurchaseIntent);
    }

    #[test]
    fn display_matches_as_str() {
        for cat in QueryCategory::all() {
            assert_eq!(cat.to_string(), cat.as_str());
        }
    }
}
