//! Caldera artifact definitions.
//!
//! Mirrors the YAML layout Caldera expects for abilities, adversary profiles
//! and fact sources. Field names follow Caldera, not Rust conventions, where
//! the two disagree.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Tactic and technique name written for abilities left uncurated.
pub const PLACEHOLDER_TACTIC: &str = "Miscellaneous";

/// Technique id written for abilities left uncurated.
pub const PLACEHOLDER_TECHNIQUE_ID: &str = "x|x";

/// An atomic Caldera ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tactic: String,
    pub technique_id: String,
    pub technique_name: String,
    pub singleton: bool,
    pub repeatable: bool,
    pub delete_payload: bool,
    pub requirements: Vec<Requirement>,
    pub executors: Vec<Executor>,
}

impl Ability {
    /// Create an ability with blank classification and no executors.
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tactic: String::new(),
            technique_id: String::new(),
            technique_name: String::new(),
            singleton: false,
            repeatable: false,
            delete_payload: false,
            requirements: Vec::new(),
            executors: Vec::new(),
        }
    }

    /// Set the tactic.
    pub fn with_tactic(mut self, tactic: impl Into<String>) -> Self {
        self.tactic = tactic.into();
        self
    }

    /// Copy of this ability with blank tactic and technique fields replaced
    /// by the placeholders Caldera needs to file it.
    pub fn with_placeholders(&self) -> Self {
        let mut ability = self.clone();
        if ability.tactic.is_empty() {
            ability.tactic = PLACEHOLDER_TACTIC.to_string();
        }
        if ability.technique_id.is_empty() {
            ability.technique_id = PLACEHOLDER_TECHNIQUE_ID.to_string();
        }
        if ability.technique_name.is_empty() {
            ability.technique_name = PLACEHOLDER_TACTIC.to_string();
        }
        ability
    }
}

/// Platforms every translated command is packaged for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Darwin,
    Windows,
}

impl Platform {
    /// All supported platforms, in emission order.
    pub const ALL: [Self; 3] = [Self::Linux, Self::Darwin, Self::Windows];

    /// Lowercase platform tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One platform-specific invocation of an ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executor {
    pub platform: Platform,
    /// Program (executor) name, e.g. `sh`, `pwsh`, `bash`, `native`
    pub name: String,
    pub command: String,
    pub timeout: u64,
    pub payloads: Vec<String>,
    pub uploads: Vec<String>,
    pub cleanup: Vec<String>,
    pub parsers: Vec<Parser>,
}

/// A source/edge/target triple used to match or parse facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactMatch {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl FactMatch {
    /// A match on `source` alone.
    pub fn source(source: impl Into<String>) -> Self {
        Self { source: source.into(), edge: None, target: None }
    }
}

/// Input bindings an ability needs before it can run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub module: String,
    pub relationship_match: Vec<FactMatch>,
}

/// Output bindings an ability produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parser {
    pub module: String,
    pub parserconfigs: Vec<FactMatch>,
}

/// A named fact seeded into a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitFact {
    #[serde(rename = "trait")]
    pub trait_name: String,
    pub value: Option<String>,
    pub score: u32,
}

/// Entry of a playbook's accumulated fact list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fact {
    /// Seeded from a declared playbook variable
    Trait(TraitFact),
    /// Derived from a step's argument bindings
    Match(FactMatch),
}

/// A relationship between two facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: TraitFact,
    pub edge: Option<String>,
    pub target: TraitFact,
    pub score: u32,
}

/// An adversary profile: the ordered abilities of one playbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub adversary_id: String,
    pub name: String,
    pub description: String,
    pub atomic_ordering: Vec<String>,
    pub objective: String,
    pub tags: Vec<String>,
}

/// Facts and relationships seeded for a playbook's operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sources {
    pub id: String,
    pub name: String,
    pub facts: Vec<Fact>,
    pub relationships: Vec<Relationship>,
}

/// Record of what one playbook traversal produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionManifest {
    pub id: String,
    pub name: String,
    pub adversary_id: String,
    pub sources_id: String,
    pub objective_id: String,
    pub workflow_start: String,
    /// Ability ids produced per visited step, in workflow order
    pub steps: IndexMap<String, Vec<String>>,
    pub facts: Vec<Fact>,
    pub relationships: Vec<Relationship>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_fill_blank_classification() {
        let ability = Ability::new("id-1", "Scan: 1", "scan the host").with_placeholders();

        assert_eq!(ability.tactic, "Miscellaneous");
        assert_eq!(ability.technique_id, "x|x");
        assert_eq!(ability.technique_name, "Miscellaneous");
    }

    #[test]
    fn test_placeholders_keep_curated_values() {
        let mut ability = Ability::new("id-1", "Start Step", "").with_tactic("Start");
        ability.technique_id = "T1046".to_string();

        let filed = ability.with_placeholders();
        assert_eq!(filed.tactic, "Start");
        assert_eq!(filed.technique_id, "T1046");
        assert_eq!(filed.technique_name, "Miscellaneous");
    }

    #[test]
    fn test_fact_serializes_untagged() {
        let facts = vec![
            Fact::Trait(TraitFact { trait_name: "host".into(), value: Some(String::new()), score: 1 }),
            Fact::Match(FactMatch::source("Demo.host")),
        ];

        let json = serde_json::to_value(&facts).unwrap();
        assert_eq!(json[0]["trait"], "host");
        assert_eq!(json[0]["score"], 1);
        assert_eq!(json[1]["source"], "Demo.host");
        assert!(json[1].get("edge").is_none());
    }

    #[test]
    fn test_platform_serializes_lowercase() {
        let yaml = serde_yaml::to_string(&Platform::Darwin).unwrap();
        assert_eq!(yaml.trim(), "darwin");
    }
}
