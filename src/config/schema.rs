use serde::Deserialize;
use std::fmt;

use crate::xml::QName;

/// One `{key, value}` pair of a rule mapping.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Rule {
    #[serde(alias = "Key")]
    pub key: String,
    #[serde(default, alias = "Value")]
    pub value: String,
}

impl Rule {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered rule mapping. Keys may repeat; each entry is applied on its own,
/// in sequence.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct RuleSet(Vec<Rule>);

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self(rules)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value of the last entry with `key`; later entries override earlier ones.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|rule| rule.key == key)
            .map(|rule| rule.value.as_str())
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RuleSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| Rule::new(k, v)).collect())
    }
}

/// The six named rule mappings, loaded once and shared read-only.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RuleBook {
    #[serde(default, alias = "ReplaceProperties")]
    pub replace_properties: RuleSet,
    #[serde(default, alias = "ReplaceDependencies")]
    pub replace_dependencies: RuleSet,
    #[serde(default, alias = "DeleteDependencies")]
    pub delete_dependencies: RuleSet,
    #[serde(default, alias = "ReplaceRepositories")]
    pub replace_repositories: RuleSet,
    #[serde(default, alias = "ReplaceDataWeaveExpressions")]
    pub replace_data_weave_expressions: RuleSet,
    #[serde(default, alias = "ReplacePolicies")]
    pub replace_policies: RuleSet,
}

impl RuleBook {
    /// Rule sets paired with their configuration names, in declaration order.
    pub fn sets(&self) -> [(&'static str, &RuleSet); 6] {
        [
            ("replaceProperties", &self.replace_properties),
            ("replaceDependencies", &self.replace_dependencies),
            ("deleteDependencies", &self.delete_dependencies),
            ("replaceRepositories", &self.replace_repositories),
            (
                "replaceDataWeaveExpressions",
                &self.replace_data_weave_expressions,
            ),
            ("replacePolicies", &self.replace_policies),
        ]
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        for (set, rules) in self.sets() {
            for (index, rule) in rules.iter().enumerate() {
                if rule.key.trim().is_empty() {
                    issues.push(ValidationIssue::EmptyKey { set, index });
                }
            }
        }

        // Property keys become element names when the property is added
        for rule in &self.replace_properties {
            if !rule.key.trim().is_empty() && !QName::is_ncname(&rule.key) {
                issues.push(ValidationIssue::InvalidElementName {
                    set: "replaceProperties",
                    key: rule.key.clone(),
                });
            }
        }

        for (set, rules) in [
            ("replaceDependencies", &self.replace_dependencies),
            ("replaceRepositories", &self.replace_repositories),
        ] {
            for rule in rules {
                if rule.value.trim().is_empty() {
                    issues.push(ValidationIssue::EmptyMarkup {
                        set,
                        key: rule.key.clone(),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyKey { set: &'static str, index: usize },
    EmptyMarkup { set: &'static str, key: String },
    InvalidElementName { set: &'static str, key: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyKey { set, index } => {
                write!(f, "{set}[{index}]: key must not be empty")
            }
            ValidationIssue::EmptyMarkup { set, key } => {
                write!(f, "{set} '{key}': replacement markup must not be empty")
            }
            ValidationIssue::InvalidElementName { set, key } => {
                write!(f, "{set} '{key}': key is not a valid XML element name")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationError {}
