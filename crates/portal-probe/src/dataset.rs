//! Scenario data: search terms, navigation targets, edge-case inputs and the
//! site copy scenarios assert against.
//!
//! The built-in dataset is constructed once per process. A YAML file with the
//! same shape replaces it wholesale.

use crate::locator::{NamePattern, Selector};
use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Length of the built-in "very long" edge-case input
pub const VERY_LONG_INPUT_LEN: usize = 1000;

/// A search term and the keywords its results should mention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCase {
    pub query: String,
    #[serde(default)]
    pub expected_keywords: Vec<String>,
    pub description: String,
}

/// A navigation label and the path it leads to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationCase {
    pub label: String,
    pub path: String,
    pub description: String,
}

/// A service link that must stay reachable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalLink {
    pub name: String,
    pub path: String,
    pub description: String,
}

/// Unusual input fed to free-text fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeCase {
    pub name: String,
    pub input: String,
}

/// Open a filter panel, type a value, apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStep {
    /// Control that reveals the filter input
    pub trigger: Selector,
    /// Filter input
    pub input: Selector,
    pub value: String,
}

/// Job search keyword with the filters applied on top of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCase {
    pub keyword: String,
    /// Misspelled variant that should still find `keyword`
    #[serde(default)]
    pub misspelled: Option<String>,
    #[serde(default)]
    pub filters: Vec<FilterStep>,
    pub description: String,
}

/// Text the target site is expected to show.
///
/// Patterns are stored as sources and compiled on use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteCopy {
    /// Skip-link text pattern, case-insensitive
    pub skip_link: String,
    /// `alt` text of the logo image
    pub logo_alt: String,
    /// Home page title
    pub home_title: String,
    /// Accessible name of the search input and its submit control
    pub search_control_name: String,
}

impl SiteCopy {
    pub fn skip_link_pattern(&self) -> ProbeResult<NamePattern> {
        NamePattern::new(self.skip_link.as_str())
    }

    pub fn search_control_pattern(&self) -> ProbeResult<NamePattern> {
        NamePattern::new(self.search_control_name.as_str())
    }
}

impl Default for SiteCopy {
    fn default() -> Self {
        Self {
            skip_link: "skip.*main|main.*content".to_string(),
            logo_alt: "USA.gov logo".to_string(),
            home_title: "Making government services easier to find | USAGov".to_string(),
            search_control_name: "search".to_string(),
        }
    }
}

/// Everything scenarios iterate over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioDataset {
    pub search_cases: Vec<SearchCase>,
    pub navigation_cases: Vec<NavigationCase>,
    pub critical_links: Vec<CriticalLink>,
    #[serde(default)]
    pub edge_cases: Vec<EdgeCase>,
    #[serde(default)]
    pub site_copy: SiteCopy,
    #[serde(default)]
    pub job_cases: Vec<JobCase>,
}

static BUILTIN: OnceLock<ScenarioDataset> = OnceLock::new();

impl ScenarioDataset {
    /// Process-wide built-in dataset
    pub fn builtin() -> &'static Self {
        BUILTIN.get_or_init(Self::build)
    }

    fn build() -> Self {
        Self {
            search_cases: vec![
                SearchCase {
                    query: "passport".to_string(),
                    expected_keywords: vec!["passport".to_string()],
                    description: "Search for passport information".to_string(),
                },
                SearchCase {
                    query: "benefits".to_string(),
                    expected_keywords: vec!["benefit".to_string()],
                    description: "Search for benefits".to_string(),
                },
            ],
            navigation_cases: vec![NavigationCase {
                label: "Government benefits".to_string(),
                path: "/benefits".to_string(),
                description: "Navigate to government benefits".to_string(),
            }],
            critical_links: vec![CriticalLink {
                name: "Get or renew a passport".to_string(),
                path: "/passport".to_string(),
                description: "Passport services".to_string(),
            }],
            edge_cases: vec![
                edge("empty", ""),
                edge("whitespace", "   \t  "),
                edge("special_characters", "<script>&\"'%$#@!</script>"),
                edge("very_long", &"benefits ".repeat(VERY_LONG_INPUT_LEN / 9)),
                edge("non_ascii", "pasaporte señor 护照 パスポート"),
                edge("nonsense", "xqzvbnm qwrtplk"),
            ],
            site_copy: SiteCopy::default(),
            job_cases: vec![JobCase {
                keyword: "Software Engineer".to_string(),
                misspelled: Some("Sofware Enginner".to_string()),
                filters: vec![
                    FilterStep {
                        trigger: Selector::css("#filterLocation"),
                        input: Selector::css("#locationInput"),
                        value: "New York".to_string(),
                    },
                    FilterStep {
                        trigger: Selector::css("#filterAgency"),
                        input: Selector::css("#agencyInput"),
                        value: "Department of Defense".to_string(),
                    },
                ],
                description: "Keyword search narrowed by location and agency".to_string(),
            }],
        }
    }

    /// Parse and validate a YAML dataset
    pub fn from_yaml_str(yaml: &str) -> ProbeResult<Self> {
        let dataset: Self = serde_yaml_ng::from_str(yaml).map_err(|e| ProbeError::DatasetError {
            message: e.to_string(),
        })?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Load a YAML dataset from disk
    pub fn from_file(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Search queries must be non-blank, paths site-relative, patterns valid
    pub fn validate(&self) -> ProbeResult<()> {
        if let Some(case) = self.search_cases.iter().find(|c| c.query.trim().is_empty()) {
            return Err(dataset_error(format!(
                "search case '{}' has a blank query",
                case.description
            )));
        }
        let paths = self
            .navigation_cases
            .iter()
            .map(|c| &c.path)
            .chain(self.critical_links.iter().map(|l| &l.path));
        for path in paths {
            if !path.starts_with('/') {
                return Err(dataset_error(format!("path '{path}' must start with '/'")));
            }
        }
        if let Some(case) = self.job_cases.iter().find(|c| c.keyword.trim().is_empty()) {
            return Err(dataset_error(format!(
                "job case '{}' has a blank keyword",
                case.description
            )));
        }
        self.site_copy
            .skip_link_pattern()
            .and_then(|_| self.site_copy.search_control_pattern())
            .map_err(|e| dataset_error(e.to_string()))?;
        Ok(())
    }

    /// Edge case by name
    pub fn edge_case(&self, name: &str) -> Option<&EdgeCase> {
        self.edge_cases.iter().find(|c| c.name == name)
    }
}

fn edge(name: &str, input: &str) -> EdgeCase {
    EdgeCase {
        name: name.to_string(),
        input: input.to_string(),
    }
}

fn dataset_error(message: String) -> ProbeError {
    ProbeError::DatasetError { message }
}
