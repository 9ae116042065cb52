use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::domain::{AustralianState, Lga};

const DEFAULT_AGENTS: &[(&str, &str)] = &[
    ("Chris WH", "Chris"),
    ("Chris WG", "Chris"),
    ("Harley Peachey", "Harley"),
    ("Lee Dowdall", "Lee"),
    ("Nick GR", "Nick"),
    ("NIck GR", "Nick"),
];

const DEFAULT_REGIONS: &[(&str, Lga, AustralianState)] = &[
    ("Tweed Shire", Lga::TweedShire, AustralianState::Nsw),
    ("Tweed Coast", Lga::TweedShire, AustralianState::Nsw),
    ("Tweed Valley", Lga::TweedShire, AustralianState::Nsw),
    ("Byron Shire", Lga::ByronShire, AustralianState::Nsw),
    ("Byron Bay", Lga::ByronShire, AustralianState::Nsw),
    ("Ballina Shire", Lga::BallinaShire, AustralianState::Nsw),
    ("Southern Gold Coast", Lga::CityOfGoldCoast, AustralianState::Qld),
    ("Gold Coast", Lga::CityOfGoldCoast, AustralianState::Qld),
    ("Brisbane", Lga::Other, AustralianState::Qld),
];

const DEFAULT_QLD_SUBURBS: &[&str] = &["Bonogin", "Currumbin Waters", "Varsity Lakes", "Kippa Ring"];

// Sheet titles that differ too much from the CMS title for the matcher.
const DEFAULT_MANUAL_MATCHES: &[(&str, &str)] = &[
    (
        "1/3 Clara Lane, Casuarina",
        "acquisition-69780ddd01396de0528772d9",
    ),
    ("10 Mcphail, Kingcliff", "acquisition-69780ddd01396de0528772dd"),
    (
        "6 Flintwood Ave Pottsville",
        "acquisition-69780ddd01396de0528772ff",
    ),
];

const DEFAULT_LEGACY_IMAGE_HOST: &str = "base44.app";

/// Lookup key for the agent, region and suburb tables.
pub(crate) fn normalize_key(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RegionMapping {
    pub lga: Lga,
    pub state: AustralianState,
}

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to read mapping file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid mapping file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Overrides read from a `--mappings` TOML file. Every table is optional.
///
/// ```toml
/// qld_suburbs = ["Burleigh Heads"]
///
/// [agents]
/// "Chris W-H" = "Chris"
///
/// [regions]
/// "Northern Rivers" = { lga = "Other", state = "NSW" }
///
/// [manual_matches]
/// "2/7 Marine Pde" = "acquisition-abc123"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MappingOverrides {
    pub agents: HashMap<String, String>,
    pub regions: HashMap<String, RegionMapping>,
    pub qld_suburbs: Vec<String>,
    pub manual_matches: HashMap<String, String>,
    pub legacy_image_host: Option<String>,
}

impl MappingOverrides {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

/// Lookup tables for one reconciliation run. Keys are stored normalized;
/// manual match keys use the title match key.
#[derive(Debug, Clone)]
pub struct ReconciliationMappings {
    agents: HashMap<String, String>,
    regions: HashMap<String, RegionMapping>,
    qld_suburbs: Vec<String>,
    manual_matches: HashMap<String, String>,
    legacy_image_host: String,
}

impl Default for ReconciliationMappings {
    fn default() -> Self {
        let mut mappings = Self {
            agents: HashMap::with_capacity(DEFAULT_AGENTS.len()),
            regions: HashMap::with_capacity(DEFAULT_REGIONS.len()),
            qld_suburbs: Vec::with_capacity(DEFAULT_QLD_SUBURBS.len()),
            manual_matches: HashMap::with_capacity(DEFAULT_MANUAL_MATCHES.len()),
            legacy_image_host: DEFAULT_LEGACY_IMAGE_HOST.to_string(),
        };

        for (alias, name) in DEFAULT_AGENTS {
            mappings.insert_agent(alias, name);
        }
        for (region, lga, state) in DEFAULT_REGIONS {
            mappings.regions.insert(
                normalize_key(region),
                RegionMapping {
                    lga: *lga,
                    state: *state,
                },
            );
        }
        for suburb in DEFAULT_QLD_SUBURBS {
            mappings.qld_suburbs.push(normalize_key(suburb));
        }
        for (title, id) in DEFAULT_MANUAL_MATCHES {
            mappings.insert_manual_match(title, id);
        }

        mappings
    }
}

impl ReconciliationMappings {
    /// Defaults extended by the TOML file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MappingError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let overrides = MappingOverrides::from_toml_str(&raw).map_err(|source| {
            MappingError::Toml {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(Self::default().with_overrides(overrides))
    }

    pub fn with_overrides(mut self, overrides: MappingOverrides) -> Self {
        for (alias, name) in &overrides.agents {
            self.insert_agent(alias, name);
        }
        for (region, mapping) in overrides.regions {
            self.regions.insert(normalize_key(&region), mapping);
        }
        for suburb in &overrides.qld_suburbs {
            let key = normalize_key(suburb);
            if !self.qld_suburbs.contains(&key) {
                self.qld_suburbs.push(key);
            }
        }
        for (title, id) in &overrides.manual_matches {
            self.insert_manual_match(title, id);
        }
        if let Some(host) = overrides.legacy_image_host {
            self.legacy_image_host = host;
        }
        self
    }

    fn insert_agent(&mut self, alias: &str, name: &str) {
        self.agents
            .insert(normalize_key(alias), name.trim().to_string());
    }

    fn insert_manual_match(&mut self, title: &str, id: &str) {
        self.manual_matches
            .insert(super::normalizer::normalize_title(title), id.trim().to_string());
    }

    /// Display name for an agent. Unknown names pass through trimmed.
    pub fn canonical_agent(&self, name: &str) -> String {
        self.agents
            .get(&normalize_key(name))
            .cloned()
            .unwrap_or_else(|| name.trim().to_string())
    }

    /// The website column wins over the "actual" column.
    pub fn resolve_agent(&self, website: &str, actual: &str) -> Option<String> {
        [website, actual]
            .into_iter()
            .find(|name| !name.trim().is_empty())
            .map(|name| self.canonical_agent(name))
    }

    pub fn region(&self, region: &str) -> Option<RegionMapping> {
        self.regions.get(&normalize_key(region)).copied()
    }

    pub fn is_qld_suburb(&self, suburb: &str) -> bool {
        self.qld_suburbs.contains(&normalize_key(suburb))
    }

    /// Remote id pinned to a title match key.
    pub fn manual_match(&self, title_key: &str) -> Option<&str> {
        self.manual_matches.get(title_key).map(String::as_str)
    }

    pub fn legacy_image_host(&self) -> &str {
        &self.legacy_image_host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::acquisitions::normalizer::normalize_title;

    #[test]
    fn agent_aliases_resolve_case_and_space_insensitively() {
        let mappings = ReconciliationMappings::default();
        assert_eq!(mappings.canonical_agent("  nick   gr "), "Nick");
        assert_eq!(mappings.canonical_agent("Harley Peachey"), "Harley");
        assert_eq!(mappings.canonical_agent("Sam Agent"), "Sam Agent");
    }

    #[test]
    fn website_agent_column_takes_precedence() {
        let mappings = ReconciliationMappings::default();
        assert_eq!(
            mappings.resolve_agent("Lee Dowdall", "Chris WH").as_deref(),
            Some("Lee")
        );
        assert_eq!(mappings.resolve_agent(" ", "Chris WH").as_deref(), Some("Chris"));
        assert_eq!(mappings.resolve_agent("", ""), None);
    }

    #[test]
    fn regions_carry_lga_and_state() {
        let mappings = ReconciliationMappings::default();
        let region = mappings.region("southern gold coast").expect("known region");
        assert_eq!(region.lga, Lga::CityOfGoldCoast);
        assert_eq!(region.state, AustralianState::Qld);
        assert!(mappings.region("Northern Rivers").is_none());
        assert!(mappings.is_qld_suburb("currumbin  waters"));
        assert!(!mappings.is_qld_suburb("Kingscliff"));
    }

    #[test]
    fn manual_matches_are_keyed_by_title_key() {
        let mappings = ReconciliationMappings::default();
        let key = normalize_title("6 Flintwood Ave Pottsville NSW 2489");
        assert_eq!(
            mappings.manual_match(&key),
            Some("acquisition-69780ddd01396de0528772ff")
        );
    }

    #[test]
    fn toml_overrides_extend_defaults() {
        let overrides = MappingOverrides::from_toml_str(
            r#"
qld_suburbs = ["Burleigh Heads"]
legacy_image_host = "legacy.example.com"

[agents]
"Chris W-H" = "Chris"
"Lee Dowdall" = "Lee D"

[regions]
"Northern Rivers" = { lga = "Other", state = "NSW" }

[manual_matches]
"2/7 Marine Pde" = "acquisition-abc123"
"#,
        )
        .expect("overrides parse");

        let mappings = ReconciliationMappings::default().with_overrides(overrides);
        assert_eq!(mappings.canonical_agent("chris w-h"), "Chris");
        assert_eq!(mappings.canonical_agent("Lee Dowdall"), "Lee D");
        assert_eq!(mappings.canonical_agent("Nick GR"), "Nick");
        assert_eq!(
            mappings.region("Northern Rivers"),
            Some(RegionMapping {
                lga: Lga::Other,
                state: AustralianState::Nsw
            })
        );
        assert!(mappings.is_qld_suburb("Burleigh Heads"));
        assert!(mappings.is_qld_suburb("Bonogin"));
        assert_eq!(mappings.manual_match("2/7 marine pde"), Some("acquisition-abc123"));
        assert_eq!(mappings.legacy_image_host(), "legacy.example.com");
    }

    #[test]
    fn unknown_override_keys_are_rejected() {
        assert!(MappingOverrides::from_toml_str("[agent]\n\"x\" = \"y\"\n").is_err());
    }

    #[test]
    fn from_path_reports_missing_file() {
        let error = ReconciliationMappings::from_path("/nonexistent/mappings.toml")
            .expect_err("missing file");
        assert!(matches!(error, MappingError::Io { .. }));
    }
}
