//! Point rules: definition, fluent construction, and JSON persistence.

use crate::config::ValueComparison;
use crate::schema::{Attribute, AttributeBag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Error from rule construction or rule document handling.
#[derive(Debug)]
pub enum RuleError {
    /// Rule references an attribute outside the schema.
    InvalidAttribute(String),
    /// Builder finalized without an attribute or without any value registration.
    Incomplete,
    /// Rule document failed structural or schema validation.
    MalformedDocument(String),
    /// IO error reading or writing a rule document.
    Io(std::io::Error),
}

impl std::fmt::Display for RuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleError::InvalidAttribute(name) => {
                write!(f, "'{}' is not a valid attribute", name)
            }
            RuleError::Incomplete => write!(f, "rule is missing an attribute or a value"),
            RuleError::MalformedDocument(msg) => write!(f, "malformed rule document: {}", msg),
            RuleError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for RuleError {}

impl From<std::io::Error> for RuleError {
    fn from(e: std::io::Error) -> Self {
        RuleError::Io(e)
    }
}

/// Match condition of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueMatch {
    /// Matches when the resolved value equals this string.
    Exact(String),
    /// Matches any resolved value for the rule's attribute.
    Any,
}

/// A single scoring rule: attribute, match condition, point value.
///
/// Rules are immutable once built. `Clone` yields an independent copy;
/// [`Rule::to_builder`] reopens a builder pre-populated with this rule's
/// fields for a modified rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    attribute: Attribute,
    matcher: ValueMatch,
    points: i64,
}

impl Rule {
    /// The attribute this rule applies to.
    pub fn attribute(&self) -> Attribute {
        self.attribute
    }

    /// The match condition.
    pub fn matcher(&self) -> &ValueMatch {
        &self.matcher
    }

    /// Points awarded when the rule matches. Negative points are penalties.
    pub fn points(&self) -> i64 {
        self.points
    }

    /// Whether this rule matches a resolved attribute bag.
    pub fn matches(&self, bag: &AttributeBag, comparison: ValueComparison) -> bool {
        let Some(actual) = bag.get(self.attribute) else {
            return false;
        };
        match &self.matcher {
            ValueMatch::Any => true,
            ValueMatch::Exact(expected) => match comparison {
                ValueComparison::CaseSensitive => actual == expected,
                ValueComparison::CaseInsensitive => actual.eq_ignore_ascii_case(expected),
            },
        }
    }

    /// Start a new builder pre-populated with this rule's fields.
    pub fn to_builder(&self) -> RuleBuilder {
        RuleBuilder {
            attribute: Some(self.attribute),
            pending: vec![(self.matcher.clone(), self.points)],
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.matcher {
            ValueMatch::Exact(value) => write!(
                f,
                "award {} points for {} with value '{}'",
                self.points, self.attribute, value
            ),
            ValueMatch::Any => write!(
                f,
                "award {} points for any value of {}",
                self.points, self.attribute
            ),
        }
    }
}

/// Fluent builder producing validated [`Rule`]s.
///
/// Several value registrations may be made under one attribute; each yields
/// one rule on [`build`](RuleBuilder::build).
#[derive(Debug, Default)]
pub struct RuleBuilder {
    attribute: Option<Attribute>,
    pending: Vec<(ValueMatch, i64)>,
}

impl RuleBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the attribute under construction.
    pub fn for_attribute(mut self, name: &str) -> Result<Self, RuleError> {
        let attribute = name
            .parse::<Attribute>()
            .map_err(|_| RuleError::InvalidAttribute(name.to_string()))?;
        self.attribute = Some(attribute);
        Ok(self)
    }

    /// Register an exact-value match worth `points`.
    pub fn with_value(mut self, value: impl Into<String>, points: i64) -> Self {
        self.pending.push((ValueMatch::Exact(value.into()), points));
        self
    }

    /// Register a wildcard match worth `points`.
    pub fn with_any_value(mut self, points: i64) -> Self {
        self.pending.push((ValueMatch::Any, points));
        self
    }

    /// Finalize, returning one rule per registered value.
    pub fn build(self) -> Result<Vec<Rule>, RuleError> {
        let attribute = self.attribute.ok_or(RuleError::Incomplete)?;
        if self.pending.is_empty() {
            return Err(RuleError::Incomplete);
        }
        Ok(self
            .pending
            .into_iter()
            .map(|(matcher, points)| Rule {
                attribute,
                matcher,
                points,
            })
            .collect())
    }
}

/// An ordered collection of rules, optionally organized into named groups.
///
/// Grouping only shapes the persisted document; scoring walks every rule
/// regardless of group, and the summed score is order-independent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleCollection {
    rules: Vec<Rule>,
    groups: BTreeMap<String, Vec<Rule>>,
}

impl RuleCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single ungrouped rule.
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Append ungrouped rules.
    pub fn extend(&mut self, rules: impl IntoIterator<Item = Rule>) {
        self.rules.extend(rules);
    }

    /// Append rules under a named group, creating the group if needed.
    pub fn group(&mut self, name: &str, rules: impl IntoIterator<Item = Rule>) {
        self.groups.entry(name.to_string()).or_default().extend(rules);
    }

    /// Iterate over every rule: ungrouped first, then groups in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules
            .iter()
            .chain(self.groups.values().flatten())
    }

    /// Total number of rules across all groups.
    pub fn len(&self) -> usize {
        self.rules.len() + self.groups.values().map(Vec::len).sum::<usize>()
    }

    /// Whether the collection holds no rules.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Group names in serialization order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Serialize to the JSON rule document format.
    pub fn to_json(&self) -> String {
        let document = RuleDocument {
            rules: self.rules.iter().map(RawRule::from).collect(),
            groups: self
                .groups
                .iter()
                .map(|(name, rules)| {
                    (name.clone(), rules.iter().map(RawRule::from).collect())
                })
                .collect(),
        };
        // Serialization of the document types cannot fail.
        serde_json::to_string_pretty(&document).expect("rule document serialization")
    }

    /// Deserialize from the JSON rule document format.
    ///
    /// Fails atomically: a single malformed rule rejects the whole
    /// document and no partial collection is produced.
    pub fn from_json(content: &str) -> Result<Self, RuleError> {
        let document: RuleDocument = serde_json::from_str(content)
            .map_err(|e| RuleError::MalformedDocument(format!("invalid JSON: {}", e)))?;

        let mut collection = RuleCollection::new();
        for raw in document.rules {
            collection.rules.push(raw.validate()?);
        }
        for (name, raws) in document.groups {
            let rules = raws
                .into_iter()
                .map(RawRule::validate)
                .collect::<Result<Vec<_>, _>>()?;
            collection.groups.insert(name, rules);
        }
        Ok(collection)
    }

    /// Write the collection to a JSON file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), RuleError> {
        std::fs::write(path, self.to_json())?;
        debug!(path = %path.display(), rules = self.len(), "Rules saved");
        Ok(())
    }

    /// Load a collection from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, RuleError> {
        let content = std::fs::read_to_string(path)?;
        let collection = Self::from_json(&content)?;
        info!(path = %path.display(), rules = collection.len(), "Rules loaded");
        Ok(collection)
    }
}

/// Persisted rule document.
#[derive(Debug, Deserialize, Serialize)]
struct RuleDocument {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    rules: Vec<RawRule>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    groups: BTreeMap<String, Vec<RawRule>>,
}

/// One rule as persisted: `value` and `any` are mutually exclusive.
#[derive(Debug, Deserialize, Serialize)]
struct RawRule {
    attribute: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    any: Option<bool>,

    points: i64,
}

impl RawRule {
    /// Validate against the schema and the value/any exclusivity invariant.
    fn validate(self) -> Result<Rule, RuleError> {
        let attribute = self.attribute.parse::<Attribute>().map_err(|_| {
            RuleError::MalformedDocument(format!("unknown attribute '{}'", self.attribute))
        })?;

        let matcher = match (self.value, self.any) {
            (Some(value), None) => ValueMatch::Exact(value),
            (None, Some(true)) => ValueMatch::Any,
            (Some(_), Some(_)) => {
                return Err(RuleError::MalformedDocument(format!(
                    "rule for '{}' sets both value and any",
                    attribute
                )))
            }
            _ => {
                return Err(RuleError::MalformedDocument(format!(
                    "rule for '{}' needs exactly one of value or any: true",
                    attribute
                )))
            }
        };

        Ok(Rule {
            attribute,
            matcher,
            points: self.points,
        })
    }
}

impl From<&Rule> for RawRule {
    fn from(rule: &Rule) -> Self {
        let (value, any) = match &rule.matcher {
            ValueMatch::Exact(value) => (Some(value.clone()), None),
            ValueMatch::Any => (None, Some(true)),
        };
        RawRule {
            attribute: rule.attribute.as_str().to_string(),
            value,
            any,
            points: rule.points,
        }
    }
}
