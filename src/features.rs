//! Maps loosely named student input onto the ordered feature vector a
//! trained regressor consumes.
//!
//! The [`AliasTable`] is the single source of truth for feature naming. Both
//! inference (human-facing form labels) and training (CSV column headers)
//! resolve names through it. Canonical names follow the trainer's
//! convention: lowercase snake_case, with the `GPA`/`CGPA` acronyms kept
//! uppercase.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::MappingError;

pub const GPA_LAST_SEMESTER: &str = "GPA_last_semester";
pub const CREDIT_LOAD: &str = "credit_load";
pub const CURRENT_CGPA: &str = "current_CGPA";
pub const STUDY_HOURS: &str = "study_hours";
pub const ATTENDANCE: &str = "attendance";
pub const ENGAGEMENT: &str = "engagement";
pub const MIDTERM_SCORE: &str = "midterm_score";

/// Feature order used by models that were saved without their feature list.
pub const DEFAULT_FEATURE_NAMES: [&str; 7] = [
    GPA_LAST_SEMESTER,
    CREDIT_LOAD,
    CURRENT_CGPA,
    STUDY_HOURS,
    ATTENDANCE,
    ENGAGEMENT,
    MIDTERM_SCORE,
];

pub fn default_feature_names() -> Vec<String> {
    DEFAULT_FEATURE_NAMES.iter().map(|name| name.to_string()).collect()
}

// Human-facing form labels
pub const ASSIGNMENTS_COMPLETED: &str = "Assignments Completed";
pub const ATTENDANCE_PERCENT: &str = "Attendance %";
pub const CURRENT_GPA: &str = "Current GPA";
pub const LECTURE_ENGAGEMENT: &str = "Lecture Engagement";
pub const MIDTERM: &str = "Midterm Score";
pub const STUDY_HOURS_PER_WEEK: &str = "Study Hours per Week";

/// A single user-entered value before numeric coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Missing,
    /// Booleans, arrays and objects. Never numeric.
    Other(serde_json::Value),
}

impl RawValue {
    /// Finite numbers pass through and text is trimmed then parsed.
    /// Everything else yields `None`.
    pub fn coerce(&self) -> Option<f64> {
        match self {
            RawValue::Number(value) if value.is_finite() => Some(*value),
            RawValue::Number(_) => None,
            RawValue::Text(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            RawValue::Missing | RawValue::Other(_) => None,
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<Option<f64>> for RawValue {
    fn from(value: Option<f64>) -> Self {
        value.map(RawValue::Number).unwrap_or(RawValue::Missing)
    }
}

/// Raw form fields keyed by whatever name the caller used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawStudentInput(BTreeMap<String, RawValue>);

impl RawStudentInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.0.get(name)
    }

    /// Numeric view of a field, `None` when absent or unreadable.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(RawValue::coerce)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawStudentInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut input = RawStudentInput::new();
        for (name, value) in iter {
            input.insert(name, value);
        }
        input
    }
}

/// Values kept outside the form that can stand in for absent features.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub last_semester_gpa: Option<f64>,
    pub current_cgpa: Option<f64>,
}

impl SessionContext {
    pub fn stored_value(&self, feature: &str) -> Option<f64> {
        match feature {
            GPA_LAST_SEMESTER => self.last_semester_gpa.or(self.current_cgpa),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTable {
    aliases: Vec<(String, String)>,
    fallbacks: Vec<(String, String)>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Form labels, legacy training headers, and the last-semester fallback.
    pub fn standard() -> Self {
        Self::new()
            .with_alias(ASSIGNMENTS_COMPLETED, CREDIT_LOAD)
            .with_alias(ATTENDANCE_PERCENT, ATTENDANCE)
            .with_alias(CURRENT_GPA, CURRENT_CGPA)
            .with_alias(LECTURE_ENGAGEMENT, ENGAGEMENT)
            .with_alias(MIDTERM, MIDTERM_SCORE)
            .with_alias(STUDY_HOURS_PER_WEEK, STUDY_HOURS)
            .with_alias("Attendance", ATTENDANCE)
            .with_alias("Lecture_Engagement", ENGAGEMENT)
            .with_alias("Midterm_Score", MIDTERM_SCORE)
            .with_fallback(GPA_LAST_SEMESTER, CURRENT_CGPA)
    }

    pub fn with_alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), canonical.into()));
        self
    }

    /// When `feature` has no value of its own, borrow the one resolved for `source`.
    pub fn with_fallback(mut self, feature: impl Into<String>, source: impl Into<String>) -> Self {
        self.fallbacks.push((feature.into(), source.into()));
        self
    }

    pub fn canonical_for(&self, alias: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(name, _)| name == alias)
            .map(|(_, canonical)| canonical.as_str())
    }

    pub fn aliases_of<'a>(&'a self, canonical: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.aliases
            .iter()
            .filter(move |(_, target)| target == canonical)
            .map(|(alias, _)| alias.as_str())
    }

    /// Names a value for `canonical` may arrive under: its aliases in table
    /// order, then the canonical name itself.
    pub fn candidates<'a>(&'a self, canonical: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.aliases_of(canonical).chain(std::iter::once(canonical))
    }

    /// First numeric value supplied for `canonical` under any of its names.
    pub fn number(&self, raw: &RawStudentInput, canonical: &str) -> Option<f64> {
        self.candidates(canonical).find_map(|name| raw.number(name))
    }

    pub fn fallback_for(&self, feature: &str) -> Option<&str> {
        self.fallbacks
            .iter()
            .find(|(name, _)| name == feature)
            .map(|(_, source)| source.as_str())
    }

    /// Canonical name for a column header: an alias target, or the header
    /// itself when it already is one of `canonical_names`.
    pub fn resolve<'a>(&'a self, name: &'a str, canonical_names: &[String]) -> Option<&'a str> {
        self.canonical_for(name)
            .or_else(|| canonical_names.iter().any(|c| c == name).then_some(name))
    }
}

/// Selector for [`MissingFeaturePolicy`] as it appears in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    ZeroFill,
    Reject,
    ImputeMean,
}

/// What to do with a canonical feature that has no usable value.
///
/// `ZeroFill` keeps prediction available at the cost of accuracy: a gap is
/// indistinguishable from a genuine zero to the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MissingFeaturePolicy {
    #[default]
    ZeroFill,
    Reject,
    ImputeMean(BTreeMap<String, f64>),
}

impl MissingFeaturePolicy {
    pub fn from_kind(kind: PolicyKind, means: Option<&BTreeMap<String, f64>>) -> Self {
        match kind {
            PolicyKind::ZeroFill => MissingFeaturePolicy::ZeroFill,
            PolicyKind::Reject => MissingFeaturePolicy::Reject,
            PolicyKind::ImputeMean => {
                if means.is_none() {
                    warn!("impute_mean policy selected but the model carries no feature means; gaps will be 0.0");
                }
                MissingFeaturePolicy::ImputeMean(means.cloned().unwrap_or_default())
            }
        }
    }

    fn fill(&self, feature: &str) -> f64 {
        match self {
            MissingFeaturePolicy::ImputeMean(means) => means.get(feature).copied().unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

/// Named numeric features in model order. Serializes as an object whose
/// keys keep that order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Option<Self> {
        (names.len() == values.len()).then_some(Self { names, values })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    /// Canonical-named raw input carrying the same values.
    pub fn to_raw_input(&self) -> RawStudentInput {
        self.iter().collect()
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(name, value)| format!("{}={:.2}", name, value)).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Mapper output: the vector plus what had to be filled in or was ignored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedFeatures {
    pub vector: FeatureVector,
    pub defaulted: Vec<String>,
    pub ignored: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureMapper {
    aliases: AliasTable,
    policy: MissingFeaturePolicy,
}

impl FeatureMapper {
    pub fn new(aliases: AliasTable, policy: MissingFeaturePolicy) -> Self {
        Self { aliases, policy }
    }

    pub fn standard() -> Self {
        Self::new(AliasTable::standard(), MissingFeaturePolicy::ZeroFill)
    }

    pub fn with_policy(mut self, policy: MissingFeaturePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &MissingFeaturePolicy {
        &self.policy
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Builds the vector for `feature_names`. Under `ZeroFill` and
    /// `ImputeMean` this never fails.
    pub fn map(
        &self,
        raw: &RawStudentInput,
        feature_names: &[String],
        context: &SessionContext,
    ) -> Result<MappedFeatures, MappingError> {
        let mut resolved: Vec<Option<f64>> = feature_names
            .iter()
            .map(|name| self.lookup_raw(raw, name).or_else(|| context.stored_value(name)))
            .collect();

        let first_pass = resolved.clone();
        for (idx, name) in feature_names.iter().enumerate() {
            if resolved[idx].is_some() {
                continue;
            }
            if let Some(source) = self.aliases.fallback_for(name) {
                resolved[idx] = match feature_names.iter().position(|n| n == source) {
                    Some(src_idx) => first_pass[src_idx],
                    None => self.lookup_raw(raw, source),
                };
            }
        }

        let defaulted: Vec<String> = feature_names
            .iter()
            .zip(&resolved)
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name.clone())
            .collect();

        if !defaulted.is_empty() {
            if self.policy == MissingFeaturePolicy::Reject {
                return Err(MappingError::MissingFeatures(defaulted));
            }
            debug!("Filling missing features with {:?}: {:?}", self.policy, defaulted);
        }

        let values = feature_names
            .iter()
            .zip(resolved)
            .map(|(name, value)| value.unwrap_or_else(|| self.policy.fill(name)))
            .collect();

        let ignored: Vec<String> = raw
            .keys()
            .filter(|key| match self.aliases.resolve(key, feature_names) {
                Some(canonical) => !feature_names.iter().any(|n| n == canonical),
                None => true,
            })
            .map(str::to_string)
            .collect();
        if !ignored.is_empty() {
            debug!("Ignoring fields the model does not use: {:?}", ignored);
        }

        Ok(MappedFeatures {
            vector: FeatureVector {
                names: feature_names.to_vec(),
                values,
            },
            defaulted,
            ignored,
        })
    }

    fn lookup_raw(&self, raw: &RawStudentInput, canonical: &str) -> Option<f64> {
        for candidate in self.aliases.candidates(canonical) {
            if let Some(value) = raw.get(candidate) {
                match value.coerce() {
                    Some(number) => return Some(number),
                    None if *value != RawValue::Missing => {
                        warn!("'{}' = {:?} is not a number, treating it as missing", candidate, value);
                    }
                    None => {}
                }
            }
        }
        None
    }
}
