use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::entities::param_enum_from_str;
use crate::sources::openfda::LabelResult;
use crate::transform::adverse_event::TermCount;
use crate::utils::date::iso_from_yyyymmdd;

/// Narrative label sections the label tools can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum LabelSection {
    IndicationsAndUsage,
    DosageAndAdministration,
    Contraindications,
    BoxedWarning,
    WarningsAndCautions,
    Warnings,
    Precautions,
    AdverseReactions,
    DrugInteractions,
    UseInSpecificPopulations,
    Pregnancy,
    PediatricUse,
    GeriatricUse,
    Overdosage,
    MechanismOfAction,
}

impl LabelSection {
    pub const ALL: [LabelSection; 15] = [
        Self::IndicationsAndUsage,
        Self::DosageAndAdministration,
        Self::Contraindications,
        Self::BoxedWarning,
        Self::WarningsAndCautions,
        Self::Warnings,
        Self::Precautions,
        Self::AdverseReactions,
        Self::DrugInteractions,
        Self::UseInSpecificPopulations,
        Self::Pregnancy,
        Self::PediatricUse,
        Self::GeriatricUse,
        Self::Overdosage,
        Self::MechanismOfAction,
    ];

    /// Sections scanned for documented reactions.
    pub const SAFETY: [LabelSection; 5] = [
        Self::AdverseReactions,
        Self::WarningsAndCautions,
        Self::Warnings,
        Self::BoxedWarning,
        Self::Precautions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::IndicationsAndUsage => "indications_and_usage",
            Self::DosageAndAdministration => "dosage_and_administration",
            Self::Contraindications => "contraindications",
            Self::BoxedWarning => "boxed_warning",
            Self::WarningsAndCautions => "warnings_and_cautions",
            Self::Warnings => "warnings",
            Self::Precautions => "precautions",
            Self::AdverseReactions => "adverse_reactions",
            Self::DrugInteractions => "drug_interactions",
            Self::UseInSpecificPopulations => "use_in_specific_populations",
            Self::Pregnancy => "pregnancy",
            Self::PediatricUse => "pediatric_use",
            Self::GeriatricUse => "geriatric_use",
            Self::Overdosage => "overdosage",
            Self::MechanismOfAction => "mechanism_of_action",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let key = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == key)
            .ok_or_else(|| {
                format!(
                    "sections value '{key}' is not recognized. Available: {}",
                    Self::ALL.map(Self::as_str).join(", ")
                )
            })
    }

    /// The section body with paragraphs joined; `None` when absent or blank.
    pub fn text(self, label: &LabelResult) -> Option<String> {
        let field = match self {
            Self::IndicationsAndUsage => &label.indications_and_usage,
            Self::DosageAndAdministration => &label.dosage_and_administration,
            Self::Contraindications => &label.contraindications,
            Self::BoxedWarning => &label.boxed_warning,
            Self::WarningsAndCautions => &label.warnings_and_cautions,
            Self::Warnings => &label.warnings,
            Self::Precautions => &label.precautions,
            Self::AdverseReactions => &label.adverse_reactions,
            Self::DrugInteractions => &label.drug_interactions,
            Self::UseInSpecificPopulations => &label.use_in_specific_populations,
            Self::Pregnancy => &label.pregnancy,
            Self::PediatricUse => &label.pediatric_use,
            Self::GeriatricUse => &label.geriatric_use,
            Self::Overdosage => &label.overdosage,
            Self::MechanismOfAction => &label.mechanism_of_action,
        };
        field.joined()
    }
}

param_enum_from_str!(LabelSection);

pub fn brand_name(label: &LabelResult) -> Option<String> {
    label.openfda.brand_name.first().cloned()
}

pub fn generic_name(label: &LabelResult) -> Option<String> {
    label.openfda.generic_name.first().cloned()
}

pub fn manufacturer(label: &LabelResult) -> Option<String> {
    label.openfda.manufacturer_name.first().cloned()
}

/// Label revision date as `YYYY-MM-DD`.
pub fn effective_date(label: &LabelResult) -> Option<String> {
    iso_from_yyyymmdd(label.effective_time.as_deref())
}

fn capitalized_phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Z][a-zA-Z-]+(?:\s+[a-zA-Z][a-zA-Z-]+){0,3}\b").expect("valid regex")
    })
}

/// Safety-section text of a label with the phrases pulled from it.
#[derive(Debug, Clone, Default)]
pub struct LabelSafetyText {
    words: Vec<String>,
    phrases: BTreeSet<String>,
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl LabelSafetyText {
    pub fn from_label(label: &LabelResult) -> Self {
        let text = LabelSection::SAFETY
            .iter()
            .filter_map(|s| s.text(label))
            .collect::<Vec<_>>()
            .join("\n");
        let phrases = capitalized_phrase_re()
            .find_iter(&text)
            .map(|m| words(m.as_str()).join(" "))
            .filter(|p| p.len() > 2)
            .collect();
        Self {
            words: words(&text),
            phrases,
        }
    }

    pub fn phrase_count(&self) -> usize {
        self.phrases.len()
    }

    /// Best-effort: a reaction counts as documented when its whole words occur
    /// in sequence in the safety text, or when it names an extracted phrase in
    /// singular or plural form ("Serious Infections" covers SERIOUS INFECTION).
    pub fn documents(&self, reaction: &str) -> bool {
        let needle = words(reaction);
        if needle.is_empty() {
            return false;
        }
        if self.words.windows(needle.len()).any(|w| w == needle.as_slice()) {
            return true;
        }
        let key = needle.join(" ");
        self.phrases.contains(&key) || self.phrases.contains(&format!("{key}s"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalSplit {
    pub documented: Vec<TermCount>,
    pub potential_signals: Vec<TermCount>,
}

pub fn split_signals(label: &LabelSafetyText, reported: Vec<TermCount>) -> SignalSplit {
    let mut split = SignalSplit::default();
    for row in reported {
        if label.documents(&row.term) {
            split.documented.push(row);
        } else {
            split.potential_signals.push(row);
        }
    }
    split
}
