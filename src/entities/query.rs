//! openFDA search-expression construction.
//!
//! Every user-supplied value goes through [`phrase`], which quotes it and
//! escapes embedded quotes and backslashes. Clauses are joined with ` AND `.

use crate::entities::param_enum_from_str;
use crate::error::FaersError;
use crate::utils::date::validate_yyyymmdd;
use crate::utils::query::phrase;

const OPEN_START: &str = "19000101";
const OPEN_END: &str = "29991231";
const RECALL_DEFAULT_START: &str = "20000101";
const AGE_UNIT_YEARS: &str = "801";

pub(crate) const SERIOUS_CLAUSE: &str = "serious:1";

/// `(brand OR generic OR medicinal product)` over the drugs in a FAERS report.
pub(crate) fn drug_event_clause(drug: &str) -> String {
    format!(
        "({} OR {} OR {})",
        phrase("patient.drug.openfda.brand_name", drug),
        phrase("patient.drug.openfda.generic_name", drug),
        phrase("patient.drug.medicinalproduct", drug),
    )
}

pub(crate) fn drug_label_clause(drug: &str) -> String {
    format!(
        "({} OR {})",
        phrase("openfda.brand_name", drug),
        phrase("openfda.generic_name", drug),
    )
}

pub(crate) fn drug_recall_clause(drug: &str) -> String {
    format!(
        "({} OR {} OR {})",
        phrase("openfda.brand_name", drug),
        phrase("openfda.generic_name", drug),
        phrase("product_description", drug),
    )
}

pub(crate) fn reaction_clause(reaction: &str) -> String {
    phrase("patient.reaction.reactionmeddrapt", reaction)
}

/// Builds `field:[FROM TO TO]`.
///
/// Returns `None` when neither bound is given; a missing bound becomes the
/// open-ended sentinel for that side.
pub(crate) fn date_range_clause(
    field: &str,
    date_from: Option<&str>,
    date_to: Option<&str>,
) -> Result<Option<String>, FaersError> {
    let from = date_from
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| validate_yyyymmdd("date_from", v))
        .transpose()?;
    let to = date_to
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| validate_yyyymmdd("date_to", v))
        .transpose()?;

    if from.is_none() && to.is_none() {
        return Ok(None);
    }
    let from = from.unwrap_or_else(|| OPEN_START.to_string());
    let to = to.unwrap_or_else(|| OPEN_END.to_string());
    if from > to {
        return Err(FaersError::InvalidArgument(
            "date_from must be on or before date_to".into(),
        ));
    }
    Ok(Some(format!("{field}:[{from} TO {to}]")))
}

/// FAERS seriousness category filter (`outcome_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum SeriousOutcome {
    Death,
    Hospitalization,
    LifeThreatening,
    Disability,
    CongenitalAnomaly,
    Other,
}

impl SeriousOutcome {
    pub const NAMES: &'static [&'static str] = &[
        "death",
        "hospitalization",
        "life_threatening",
        "disability",
        "congenital_anomaly",
        "other",
    ];

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "death" => Ok(Self::Death),
            "hospitalization" => Ok(Self::Hospitalization),
            "life_threatening" => Ok(Self::LifeThreatening),
            "disability" => Ok(Self::Disability),
            "congenital_anomaly" => Ok(Self::CongenitalAnomaly),
            "other" => Ok(Self::Other),
            other => Err(format!(
                "outcome_type '{other}' is not recognized. Expected one of: {}",
                Self::NAMES.join(", ")
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Death => "death",
            Self::Hospitalization => "hospitalization",
            Self::LifeThreatening => "life_threatening",
            Self::Disability => "disability",
            Self::CongenitalAnomaly => "congenital_anomaly",
            Self::Other => "other",
        }
    }

    pub fn clause(self) -> &'static str {
        match self {
            Self::Death => "seriousnessdeath:1",
            Self::Hospitalization => "seriousnesshospitalization:1",
            Self::LifeThreatening => "seriousnesslifethreatening:1",
            Self::Disability => "seriousnessdisabling:1",
            Self::CongenitalAnomaly => "seriousnesscongenitalanomali:1",
            Self::Other => "seriousnessother:1",
        }
    }
}

/// Named patient age brackets, inclusive, in years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBracket {
    Neonate,
    Infant,
    Child,
    Adolescent,
    AllPediatric,
    Adult,
    From65To74,
    From75To84,
    From85,
    AllGeriatric,
}

impl AgeBracket {
    pub fn range(self) -> (u32, u32) {
        match self {
            Self::Neonate => (0, 0),
            Self::Infant => (0, 1),
            Self::Child => (2, 11),
            Self::Adolescent => (12, 17),
            Self::AllPediatric => (0, 17),
            Self::Adult => (18, 64),
            Self::From65To74 => (65, 74),
            Self::From75To84 => (75, 84),
            Self::From85 => (85, 120),
            Self::AllGeriatric => (65, 120),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neonate => "neonate",
            Self::Infant => "infant",
            Self::Child => "child",
            Self::Adolescent => "adolescent",
            Self::AllPediatric => "all_pediatric",
            Self::Adult => "adult",
            Self::From65To74 => "65_to_74",
            Self::From75To84 => "75_to_84",
            Self::From85 => "85_plus",
            Self::AllGeriatric => "all_geriatric",
        }
    }

    /// Human form of the range, e.g. `12-17 years`.
    pub fn describe(self) -> String {
        let (lo, hi) = self.range();
        if lo == hi {
            format!("{lo} years")
        } else {
            format!("{lo}-{hi} years")
        }
    }

    pub fn clause(self) -> String {
        let (lo, hi) = self.range();
        format!(
            "patient.patientonsetage:[{lo} TO {hi}] AND patient.patientonsetageunit:{AGE_UNIT_YEARS}"
        )
    }
}

/// Which `openfda.pharm_class_*` index a class name is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum ClassType {
    #[default]
    Epc,
    Moa,
    Pe,
    Cs,
}

impl ClassType {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "epc" => Ok(Self::Epc),
            "moa" => Ok(Self::Moa),
            "pe" => Ok(Self::Pe),
            "cs" => Ok(Self::Cs),
            other => Err(format!(
                "class_type '{other}' is not recognized. Expected one of: epc, moa, pe, cs"
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Epc => "epc",
            Self::Moa => "moa",
            Self::Pe => "pe",
            Self::Cs => "cs",
        }
    }
}

pub(crate) fn pharm_class_event_clause(class: &str) -> String {
    phrase("patient.drug.openfda.pharm_class_epc", class)
}

pub(crate) fn pharm_class_label_clause(class_type: ClassType, class: &str) -> String {
    phrase(&format!("openfda.pharm_class_{}", class_type.as_str()), class)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum RecallClassification {
    ClassI,
    ClassII,
    ClassIII,
}

impl RecallClassification {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized = raw.trim().to_ascii_lowercase();
        let tier = normalized
            .strip_prefix("class")
            .map(str::trim)
            .unwrap_or(normalized.as_str());
        match tier {
            "i" | "1" => Ok(Self::ClassI),
            "ii" | "2" => Ok(Self::ClassII),
            "iii" | "3" => Ok(Self::ClassIII),
            _ => Err(format!(
                "classification '{}' is not recognized. Expected one of: Class I, Class II, Class III",
                raw.trim()
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClassI => "Class I",
            Self::ClassII => "Class II",
            Self::ClassIII => "Class III",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum RecallStatus {
    Ongoing,
    Completed,
    Terminated,
}

impl RecallStatus {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            "terminated" => Ok(Self::Terminated),
            other => Err(format!(
                "status '{other}' is not recognized. Expected one of: ongoing, completed, terminated"
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ongoing => "Ongoing",
            Self::Completed => "Completed",
            Self::Terminated => "Terminated",
        }
    }
}

param_enum_from_str!(SeriousOutcome, ClassType, RecallClassification, RecallStatus);

/// Filters for a search over `drug/event.json`.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventQuery<'a> {
    pub drug: Option<&'a str>,
    pub reaction: Option<&'a str>,
    pub pharm_class: Option<&'a str>,
    pub serious_only: bool,
    pub outcome: Option<SeriousOutcome>,
    pub age: Option<AgeBracket>,
    pub date_from: Option<&'a str>,
    pub date_to: Option<&'a str>,
}

impl EventQuery<'_> {
    pub fn build(&self) -> Result<String, FaersError> {
        let mut terms: Vec<String> = Vec::new();
        if let Some(drug) = self.drug.map(str::trim).filter(|v| !v.is_empty()) {
            terms.push(drug_event_clause(drug));
        }
        if let Some(class) = self.pharm_class.map(str::trim).filter(|v| !v.is_empty()) {
            terms.push(pharm_class_event_clause(class));
        }
        if let Some(reaction) = self.reaction.map(str::trim).filter(|v| !v.is_empty()) {
            terms.push(reaction_clause(reaction));
        }
        if self.serious_only {
            terms.push(SERIOUS_CLAUSE.to_string());
        }
        if let Some(outcome) = self.outcome {
            terms.push(outcome.clause().to_string());
        }
        if let Some(age) = self.age {
            terms.push(age.clause());
        }
        if let Some(range) = date_range_clause("receivedate", self.date_from, self.date_to)? {
            terms.push(range);
        }

        if terms.is_empty() {
            return Err(FaersError::InvalidArgument(
                "at least one search filter is required".into(),
            ));
        }
        Ok(terms.join(" AND "))
    }
}

/// Filters for a search over `drug/enforcement.json`.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecallQuery<'a> {
    pub drug: Option<&'a str>,
    pub classification: Option<RecallClassification>,
    pub status: Option<RecallStatus>,
    pub reason: Option<&'a str>,
    pub date_from: Option<&'a str>,
    pub date_to: Option<&'a str>,
}

impl RecallQuery<'_> {
    pub fn build(&self) -> Result<String, FaersError> {
        let mut terms: Vec<String> = Vec::new();
        if let Some(drug) = self.drug.map(str::trim).filter(|v| !v.is_empty()) {
            terms.push(drug_recall_clause(drug));
        }
        if let Some(classification) = self.classification {
            terms.push(phrase("classification", classification.as_str()));
        }
        if let Some(status) = self.status {
            terms.push(phrase("status", status.as_str()));
        }
        if let Some(reason) = self.reason.map(str::trim).filter(|v| !v.is_empty()) {
            terms.push(phrase("reason_for_recall", reason));
        }
        if let Some(range) =
            date_range_clause("recall_initiation_date", self.date_from, self.date_to)?
        {
            terms.push(range);
        }

        if terms.is_empty() {
            // The enforcement endpoint rejects an empty search.
            terms.push(format!(
                "recall_initiation_date:[{RECALL_DEFAULT_START} TO {OPEN_END}]"
            ));
        }
        Ok(terms.join(" AND "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drug_clause_ors_three_fields_with_exact_name() {
        let clause = drug_event_clause("ibuprofen");
        assert_eq!(
            clause,
            "(patient.drug.openfda.brand_name:\"ibuprofen\" OR patient.drug.openfda.generic_name:\"ibuprofen\" OR patient.drug.medicinalproduct:\"ibuprofen\")"
        );
        assert_eq!(clause.matches(" OR ").count(), 2);
    }

    #[test]
    fn drug_clause_escapes_embedded_quotes() {
        let clause = drug_event_clause("Tylenol \"PM\"");
        assert_eq!(clause.matches("\"Tylenol \\\"PM\\\"\"").count(), 3);
    }

    #[test]
    fn date_range_uses_sentinel_for_missing_bound() {
        assert_eq!(
            date_range_clause("receivedate", Some("20200101"), None).unwrap(),
            Some("receivedate:[20200101 TO 29991231]".to_string())
        );
        assert_eq!(
            date_range_clause("receivedate", None, Some("20201231")).unwrap(),
            Some("receivedate:[19000101 TO 20201231]".to_string())
        );
        assert_eq!(date_range_clause("receivedate", None, None).unwrap(), None);
    }

    #[test]
    fn date_range_rejects_bad_or_inverted_dates() {
        let err = date_range_clause("receivedate", Some("2020-01-01"), None).unwrap_err();
        assert!(err.to_string().contains("date_from"));

        let err = date_range_clause("receivedate", Some("20210101"), Some("20200101")).unwrap_err();
        assert!(err.to_string().contains("date_to"));
    }

    #[test]
    fn event_query_joins_clauses_with_and() {
        let q = EventQuery {
            drug: Some("aspirin"),
            reaction: Some("nausea"),
            serious_only: true,
            date_from: Some("20200101"),
            date_to: Some("20201231"),
            ..EventQuery::default()
        }
        .build()
        .unwrap();

        assert!(q.starts_with("(patient.drug.openfda.brand_name:\"aspirin\""));
        assert!(q.contains(" AND patient.reaction.reactionmeddrapt:\"nausea\""));
        assert!(q.contains(" AND serious:1"));
        assert!(q.ends_with(" AND receivedate:[20200101 TO 20201231]"));
    }

    #[test]
    fn age_bracket_clause_is_qualified_in_years() {
        assert_eq!(
            AgeBracket::Adolescent.clause(),
            "patient.patientonsetage:[12 TO 17] AND patient.patientonsetageunit:801"
        );
        assert_eq!(AgeBracket::Neonate.range(), (0, 0));
        assert_eq!(AgeBracket::From65To74.range(), (65, 74));
        assert_eq!(AgeBracket::Neonate.describe(), "0 years");
    }

    #[test]
    fn recall_query_without_filters_uses_default_window() {
        let q = RecallQuery::default().build().unwrap();
        assert_eq!(q, "recall_initiation_date:[20000101 TO 29991231]");
    }

    #[test]
    fn recall_query_quotes_classification_and_status() {
        let q = RecallQuery {
            classification: Some(RecallClassification::ClassII),
            status: Some(RecallStatus::Ongoing),
            ..RecallQuery::default()
        }
        .build()
        .unwrap();
        assert_eq!(q, "classification:\"Class II\" AND status:\"Ongoing\"");
    }

    #[test]
    fn enum_parsers_name_the_field() {
        assert_eq!(
            RecallClassification::parse("class iii").unwrap(),
            RecallClassification::ClassIII
        );
        assert!(RecallClassification::parse("Class IV").unwrap_err().contains("classification"));
        assert!(SeriousOutcome::parse("sneeze").unwrap_err().contains("outcome_type"));
        assert!(ClassType::parse("xyz").unwrap_err().contains("class_type"));
        assert!(RecallStatus::parse("paused").unwrap_err().contains("status"));
    }

    #[test]
    fn pharm_class_label_clause_targets_index() {
        assert_eq!(
            pharm_class_label_clause(ClassType::Moa, "Cyclooxygenase Inhibitors [MoA]"),
            "openfda.pharm_class_moa:\"Cyclooxygenase Inhibitors [MoA]\""
        );
    }
}
