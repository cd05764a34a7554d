use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::entities::param_enum_from_str;
use crate::sources::openfda::{FaersEventResult, FaersPatient, OpenFdaCountBucket};
use crate::utils::date::iso_from_yyyymmdd;

/// Coded FAERS dimensions with a fixed code → label table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodedField {
    Sex,
    ReactionOutcome,
    ReporterQualification,
    Seriousness,
    DrugCharacterization,
    AgeUnit,
}

impl CodedField {
    pub fn label(self, code: &str) -> Option<&'static str> {
        let code = code.trim();
        match self {
            Self::Sex => match code {
                "0" => Some("Unknown"),
                "1" => Some("Male"),
                "2" => Some("Female"),
                _ => None,
            },
            Self::ReactionOutcome => match code {
                "1" => Some("Recovered/Resolved"),
                "2" => Some("Recovering/Resolving"),
                "3" => Some("Not Recovered/Not Resolved"),
                "4" => Some("Recovered/Resolved with Sequelae"),
                "5" => Some("Fatal"),
                "6" => Some("Unknown"),
                _ => None,
            },
            Self::ReporterQualification => match code {
                "1" => Some("Physician"),
                "2" => Some("Pharmacist"),
                "3" => Some("Other Health Professional"),
                "4" => Some("Lawyer"),
                "5" => Some("Consumer"),
                _ => None,
            },
            Self::Seriousness => match code {
                "1" => Some("Serious"),
                "2" => Some("Non-serious"),
                _ => None,
            },
            Self::DrugCharacterization => match code {
                "1" => Some("Suspect"),
                "2" => Some("Concomitant"),
                "3" => Some("Interacting"),
                _ => None,
            },
            Self::AgeUnit => match code {
                "800" => Some("Decade"),
                "801" => Some("Year"),
                "802" => Some("Month"),
                "803" => Some("Week"),
                "804" => Some("Day"),
                "805" => Some("Hour"),
                _ => None,
            },
        }
    }

    /// Decoded label, or the raw code when the table has no entry.
    pub fn decode(self, code: &str) -> String {
        self.label(code)
            .map(str::to_string)
            .unwrap_or_else(|| code.trim().to_string())
    }

    /// Same as [`CodedField::decode`] but over a JSON count term, which
    /// openFDA serves as either a number or a string. Unmapped terms are
    /// returned unchanged, including their JSON type.
    pub fn decode_term(self, term: &Value) -> Value {
        let code = match term {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return term.clone(),
        };
        match self.label(&code) {
            Some(label) => Value::String(label.to_string()),
            None => term.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Seriousness {
    pub death: bool,
    pub hospitalization: bool,
    pub life_threatening: bool,
    pub disability: bool,
    pub congenital_anomaly: bool,
    pub other: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PatientSummary {
    pub sex: Option<String>,
    pub age: Option<String>,
    pub age_unit: Option<String>,
    pub weight_kg: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportDrug {
    pub name: String,
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indication: Option<String>,
}

/// One FAERS case report in caller-facing form.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub report_id: String,
    pub receive_date: Option<String>,
    pub serious: bool,
    pub seriousness: Seriousness,
    pub patient: PatientSummary,
    pub reactions: Vec<String>,
    pub drugs: Vec<ReportDrug>,
    pub reporter_type: Option<String>,
    pub country: Option<String>,
}

fn flag(value: Option<&str>) -> bool {
    value.map(str::trim) == Some("1")
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn patient_summary(patient: Option<&FaersPatient>) -> PatientSummary {
    let Some(patient) = patient else {
        return PatientSummary::default();
    };
    PatientSummary {
        sex: non_blank(patient.patientsex.as_deref()).map(|c| CodedField::Sex.decode(&c)),
        age: non_blank(patient.patientonsetage.as_deref()),
        age_unit: non_blank(patient.patientonsetageunit.as_deref())
            .map(|c| CodedField::AgeUnit.decode(&c)),
        weight_kg: non_blank(patient.patientweight.as_deref()),
    }
}

fn report_drug_name(drug: &crate::sources::openfda::FaersDrug) -> Option<String> {
    non_blank(drug.medicinalproduct.as_deref()).or_else(|| {
        drug.openfda
            .as_ref()
            .and_then(|o| o.brand_name.first().or_else(|| o.generic_name.first()))
            .and_then(|v| non_blank(Some(v.as_str())))
    })
}

pub fn report_from_openfda(r: FaersEventResult) -> Report {
    let patient = r.patient.as_ref();

    let mut reactions: Vec<String> = Vec::new();
    let mut drugs: Vec<ReportDrug> = Vec::new();
    if let Some(p) = patient {
        reactions = p
            .reaction
            .iter()
            .filter_map(|rx| non_blank(rx.reactionmeddrapt.as_deref()))
            .collect();
        drugs = p
            .drug
            .iter()
            .filter_map(|d| {
                let name = report_drug_name(d)?;
                Some(ReportDrug {
                    name,
                    role: non_blank(d.drugcharacterization.as_deref())
                        .map(|c| CodedField::DrugCharacterization.decode(&c)),
                    indication: non_blank(d.drugindication.as_deref()),
                })
            })
            .collect();
    }

    let reporter_type = r
        .primarysource
        .as_ref()
        .and_then(|s| non_blank(s.qualification.as_deref()))
        .map(|c| CodedField::ReporterQualification.decode(&c));
    let country = non_blank(r.occurcountry.as_deref()).or_else(|| {
        r.primarysource
            .as_ref()
            .and_then(|s| non_blank(s.reportercountry.as_deref()))
    });

    Report {
        report_id: non_blank(r.safetyreportid.as_deref()).unwrap_or_else(|| "unknown".into()),
        receive_date: iso_from_yyyymmdd(r.receivedate.as_deref()),
        serious: flag(r.serious.as_deref()),
        seriousness: Seriousness {
            death: flag(r.seriousnessdeath.as_deref()),
            hospitalization: flag(r.seriousnesshospitalization.as_deref()),
            life_threatening: flag(r.seriousnesslifethreatening.as_deref()),
            disability: flag(r.seriousnessdisabling.as_deref()),
            congenital_anomaly: flag(r.seriousnesscongenitalanomali.as_deref()),
            other: flag(r.seriousnessother.as_deref()),
        },
        patient: patient_summary(patient),
        reactions,
        drugs,
        reporter_type,
        country,
    }
}

/// A `{term, count}` row with the term as display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermCount {
    pub term: String,
    pub count: u64,
}

pub fn term_counts(buckets: &[OpenFdaCountBucket]) -> Vec<TermCount> {
    buckets
        .iter()
        .filter_map(|b| {
            Some(TermCount {
                term: b.term_text()?,
                count: b.count,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum TrendInterval {
    #[default]
    Year,
    Quarter,
    Month,
}

impl TrendInterval {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "year" => Ok(Self::Year),
            "quarter" => Ok(Self::Quarter),
            "month" => Ok(Self::Month),
            other => Err(format!(
                "interval '{other}' is not recognized. Expected one of: year, quarter, month"
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Quarter => "quarter",
            Self::Month => "month",
        }
    }
}

param_enum_from_str!(TrendInterval);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub period: String,
    pub count: u64,
}

fn bucket_label(time: &str, interval: TrendInterval) -> Option<String> {
    let t = time.trim();
    if t.len() < 6 || !t.is_char_boundary(6) || !t[..6].chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year = &t[0..4];
    let month: u32 = t[4..6].parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(match interval {
        TrendInterval::Year => year.to_string(),
        TrendInterval::Quarter => format!("{year}-Q{}", month.div_ceil(3)),
        TrendInterval::Month => format!("{year}-{month:02}"),
    })
}

/// Sums daily `receivedate` counts into period buckets, ordered by label.
pub fn bucket_trends(buckets: &[OpenFdaCountBucket], interval: TrendInterval) -> Vec<TrendPoint> {
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    for b in buckets {
        let Some(label) = b.time.as_deref().and_then(|t| bucket_label(t, interval)) else {
            continue;
        };
        *totals.entry(label).or_insert(0) += b.count;
    }
    totals
        .into_iter()
        .map(|(period, count)| TrendPoint { period, count })
        .collect()
}

/// Renders `a : b` as a rounded integer ratio.
pub fn report_ratio(a: u64, b: u64) -> String {
    if b == 0 {
        return "N/A".to_string();
    }
    if a == 0 {
        return "0:1".to_string();
    }
    if a >= b {
        format!("{}:1", (a as f64 / b as f64).round() as u64)
    } else {
        format!("1:{}", (b as f64 / a as f64).round() as u64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReactionSplit {
    pub only_left: Vec<String>,
    pub only_right: Vec<String>,
    pub shared: Vec<String>,
}

/// Partitions two reaction lists by exact term match, keeping input order.
pub fn split_reactions(left: &[TermCount], right: &[TermCount]) -> ReactionSplit {
    let left_terms: HashSet<&str> = left.iter().map(|r| r.term.as_str()).collect();
    let right_terms: HashSet<&str> = right.iter().map(|r| r.term.as_str()).collect();

    let mut split = ReactionSplit::default();
    for r in left {
        if right_terms.contains(r.term.as_str()) {
            split.shared.push(r.term.clone());
        } else {
            split.only_left.push(r.term.clone());
        }
    }
    split.only_right = right
        .iter()
        .filter(|r| !left_terms.contains(r.term.as_str()))
        .map(|r| r.term.clone())
        .collect();
    split
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::openfda::{FaersDrug, FaersPrimarySource, FaersReaction};

    fn bucket(term: Value, count: u64) -> OpenFdaCountBucket {
        OpenFdaCountBucket {
            term: Some(term),
            time: None,
            count,
        }
    }

    fn day(time: &str, count: u64) -> OpenFdaCountBucket {
        OpenFdaCountBucket {
            term: None,
            time: Some(time.to_string()),
            count,
        }
    }

    #[test]
    fn outcome_code_five_is_fatal() {
        assert_eq!(
            CodedField::ReactionOutcome.decode_term(&serde_json::json!(5)),
            serde_json::json!("Fatal")
        );
        assert_eq!(CodedField::ReactionOutcome.decode("5"), "Fatal");
    }

    #[test]
    fn unmapped_code_passes_through_raw() {
        assert_eq!(
            CodedField::ReactionOutcome.decode_term(&serde_json::json!(9)),
            serde_json::json!(9)
        );
        assert_eq!(CodedField::Sex.decode("7"), "7");
    }

    #[test]
    fn report_mapping_decodes_codes_and_dates() {
        let raw = FaersEventResult {
            safetyreportid: Some("10003300".into()),
            serious: Some("1".into()),
            receivedate: Some("20200315".into()),
            seriousnesshospitalization: Some("1".into()),
            occurcountry: Some("US".into()),
            patient: Some(FaersPatient {
                patientonsetage: Some("54".into()),
                patientonsetageunit: Some("801".into()),
                patientsex: Some("2".into()),
                patientweight: None,
                reaction: vec![FaersReaction {
                    reactionmeddrapt: Some("Nausea".into()),
                }],
                drug: vec![FaersDrug {
                    medicinalproduct: Some("ADVIL".into()),
                    drugcharacterization: Some("1".into()),
                    drugindication: Some("Pain".into()),
                    openfda: None,
                }],
            }),
            primarysource: Some(FaersPrimarySource {
                qualification: Some("5".into()),
                reportercountry: None,
            }),
            ..FaersEventResult::default()
        };

        let report = report_from_openfda(raw);
        assert_eq!(report.report_id, "10003300");
        assert_eq!(report.receive_date.as_deref(), Some("2020-03-15"));
        assert!(report.serious);
        assert!(report.seriousness.hospitalization);
        assert!(!report.seriousness.death);
        assert_eq!(report.patient.sex.as_deref(), Some("Female"));
        assert_eq!(report.patient.age_unit.as_deref(), Some("Year"));
        assert_eq!(report.reactions, vec!["Nausea"]);
        assert_eq!(report.drugs[0].role.as_deref(), Some("Suspect"));
        assert_eq!(report.reporter_type.as_deref(), Some("Consumer"));
        assert_eq!(report.country.as_deref(), Some("US"));
    }

    #[test]
    fn trends_bucket_by_quarter_and_sort() {
        let rows = vec![
            day("20210402", 1),
            day("20200105", 2),
            day("20200330", 3),
            day("20201201", 4),
            day("garbage", 100),
        ];
        let trends = bucket_trends(&rows, TrendInterval::Quarter);
        assert_eq!(
            trends,
            vec![
                TrendPoint { period: "2020-Q1".into(), count: 5 },
                TrendPoint { period: "2020-Q4".into(), count: 4 },
                TrendPoint { period: "2021-Q2".into(), count: 1 },
            ]
        );

        let months = bucket_trends(&rows, TrendInterval::Month);
        assert_eq!(months[0].period, "2020-01");
        let years = bucket_trends(&rows, TrendInterval::Year);
        assert_eq!(years.len(), 2);
        assert_eq!(years[0].count, 9);
    }

    #[test]
    fn ratio_rounds_and_guards_zero() {
        assert_eq!(report_ratio(30, 10), "3:1");
        assert_eq!(report_ratio(10, 25), "1:3");
        assert_eq!(report_ratio(10, 10), "1:1");
        assert_eq!(report_ratio(0, 10), "0:1");
        assert_eq!(report_ratio(5, 0), "N/A");
        assert_eq!(report_ratio(0, 0), "N/A");
    }

    #[test]
    fn split_reactions_uses_exact_labels() {
        let left = term_counts(&[
            bucket(serde_json::json!("NAUSEA"), 5),
            bucket(serde_json::json!("RASH"), 3),
        ]);
        let right = term_counts(&[
            bucket(serde_json::json!("NAUSEA"), 50),
            bucket(serde_json::json!("FALL"), 30),
        ]);
        let split = split_reactions(&left, &right);
        assert_eq!(split.shared, vec!["NAUSEA"]);
        assert_eq!(split.only_left, vec!["RASH"]);
        assert_eq!(split.only_right, vec!["FALL"]);
    }
}
