use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A competitor tracked alongside a company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorProfile {
    pub name: String,
    pub domain: Option<String>,
}

/// A company whose AI-search visibility is analyzed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    /// Primary domain, without scheme (e.g. `acme.com`).
    pub domain: String,
    pub industry: String,
    /// Alternate spellings and short forms matched alongside the name.
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub competitors: Vec<CompetitorProfile>,
}

impl CompanyProfile {
    /// Generate a URL-safe slug from the company name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[derive(Debug, Deserialize)]
pub struct CompaniesFile {
    pub companies: Vec<CompanyProfile>,
}

impl CompaniesFile {
    /// Look up a company by its derived slug.
    #[must_use]
    pub fn find(&self, slug: &str) -> Option<&CompanyProfile> {
        self.companies.iter().find(|c| c.slug() == slug)
    }
}

/// Load and validate the companies configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_companies(path: &Path) -> Result<CompaniesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let companies_file: CompaniesFile = serde_yaml::from_str(&content)?;
    validate_companies(&companies_file)?;

    Ok(companies_file)
}

fn validate_companies(file: &CompaniesFile) -> Result<(), ConfigError> {
    let mut seen_slugs = HashSet::new();

    for company in &file.companies {
        if company.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "company name must be non-empty".to_string(),
            ));
        }

        if company.domain.trim().is_empty() || company.domain.contains("://") {
            return Err(ConfigError::Validation(format!(
                "company '{}' must have a bare domain (no scheme), got '{}'",
                company.name, company.domain
            )));
        }

        let slug = company.slug();
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate company slug: '{}' (from company '{}')",
                slug, company.name
            )));
        }
    }

    Ok(())
}
