//! Static tool catalog: names, titles, descriptions, and input contracts.

use std::sync::Arc;

use rmcp::model::{Tool, ToolAnnotations};
use serde_json::{Map, Value, json};

use crate::entities::query::SeriousOutcome;

#[derive(Debug, Clone, Copy)]
pub enum ParamKind {
    String,
    Integer,
    Boolean,
    StringArray,
    Enum(&'static [&'static str]),
    EnumArray(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: true,
        description,
    }
}

const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: false,
        description,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

const GROUP_BY: &[&str] = &[
    "reaction",
    "sex",
    "outcome",
    "reporter_type",
    "country",
    "seriousness",
];
const INTERVALS: &[&str] = &["year", "quarter", "month"];
const CLASS_TYPES: &[&str] = &["epc", "moa", "pe", "cs"];
const LABEL_SECTIONS: &[&str] = &[
    "indications_and_usage",
    "dosage_and_administration",
    "contraindications",
    "boxed_warning",
    "warnings_and_cautions",
    "warnings",
    "precautions",
    "adverse_reactions",
    "drug_interactions",
    "use_in_specific_populations",
    "pregnancy",
    "pediatric_use",
    "geriatric_use",
    "overdosage",
    "mechanism_of_action",
];
const PEDIATRIC_GROUPS: &[&str] = &["neonate", "infant", "child", "adolescent", "all_pediatric"];
const GERIATRIC_GROUPS: &[&str] = &["65_to_74", "75_to_84", "85_plus", "all_geriatric"];
const POPULATIONS: &[&str] = &["pediatric", "geriatric"];
const RECALL_CLASSES: &[&str] = &["Class I", "Class II", "Class III"];
const RECALL_STATUSES: &[&str] = &["ongoing", "completed", "terminated"];

const DRUG_NAME: ParamSpec = required(
    "drug_name",
    ParamKind::String,
    "Brand or generic drug name, e.g. \"ibuprofen\" or \"Advil\"",
);
const REACTION: ParamSpec = optional(
    "reaction",
    ParamKind::String,
    "MedDRA preferred term to filter by, e.g. \"nausea\"",
);
const SERIOUS_ONLY: ParamSpec = optional(
    "serious_only",
    ParamKind::Boolean,
    "Only count reports flagged serious (default false)",
);
const DATE_FROM: ParamSpec = optional(
    "date_from",
    ParamKind::String,
    "Earliest receive date, YYYYMMDD",
);
const DATE_TO: ParamSpec = optional("date_to", ParamKind::String, "Latest receive date, YYYYMMDD");
const LIMIT_10_100: ParamSpec = optional(
    "limit",
    ParamKind::Integer,
    "Maximum rows to return (default 10, max 100)",
);
const LIMIT_10_50: ParamSpec = optional(
    "limit",
    ParamKind::Integer,
    "Maximum rows to return (default 10, max 50)",
);
const LIMIT_20_100: ParamSpec = optional(
    "limit",
    ParamKind::Integer,
    "Maximum rows to return (default 20, max 100)",
);
const PHARM_CLASS: ParamSpec = required(
    "pharm_class",
    ParamKind::String,
    "FDA pharmacologic class, e.g. \"Tumor Necrosis Factor Blocker [EPC]\"",
);

pub static TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "search_adverse_events",
        title: "Search adverse event reports",
        description: "Search FAERS adverse event reports for a drug. Returns individual case \
reports with decoded patient, reaction, and drug-role details. Supports reaction, seriousness, \
and receive-date filters with paging (skip up to 25000).",
        params: &[
            DRUG_NAME,
            REACTION,
            SERIOUS_ONLY,
            DATE_FROM,
            DATE_TO,
            LIMIT_10_100,
            optional(
                "skip",
                ParamKind::Integer,
                "Number of reports to skip for paging (default 0, max 25000)",
            ),
        ],
    },
    ToolDescriptor {
        name: "get_serious_events",
        title: "Serious adverse event reports",
        description: "List FAERS reports for a drug that were flagged serious, optionally \
restricted to one outcome category such as death or hospitalization.",
        params: &[
            DRUG_NAME,
            optional(
                "outcome_type",
                ParamKind::Enum(SeriousOutcome::NAMES),
                "Seriousness category to require",
            ),
            DATE_FROM,
            DATE_TO,
            LIMIT_10_100,
        ],
    },
    ToolDescriptor {
        name: "get_event_counts",
        title: "Adverse event counts",
        description: "Count FAERS reports for a drug grouped by reaction, sex, outcome, \
reporter type, country, or seriousness. Coded values are decoded to readable labels.",
        params: &[
            DRUG_NAME,
            optional(
                "group_by",
                ParamKind::Enum(GROUP_BY),
                "Dimension to group counts by (default reaction)",
            ),
            SERIOUS_ONLY,
            DATE_FROM,
            DATE_TO,
            LIMIT_10_100,
        ],
    },
    ToolDescriptor {
        name: "get_event_trends",
        title: "Adverse event reporting trends",
        description: "Bucket FAERS report counts for a drug over time by year, quarter, or \
month, optionally for a single reaction. Includes a line chart hint.",
        params: &[
            DRUG_NAME,
            REACTION,
            optional(
                "interval",
                ParamKind::Enum(INTERVALS),
                "Bucket size (default year)",
            ),
            DATE_FROM,
            DATE_TO,
        ],
    },
    ToolDescriptor {
        name: "compare_drugs",
        title: "Compare drugs",
        description: "Compare FAERS report volume and top reactions across 2 to 5 drugs, \
optionally measuring how often one reaction is reported for each. Lists reactions shared by \
every drug.",
        params: &[
            required(
                "drug_names",
                ParamKind::StringArray,
                "Between 2 and 5 distinct drug names",
            ),
            REACTION,
            LIMIT_10_50,
        ],
    },
    ToolDescriptor {
        name: "get_drugs_for_reaction",
        title: "Drugs reported for a reaction",
        description: "Find the drugs most frequently named in FAERS reports of a given \
reaction, counted by generic name.",
        params: &[
            required(
                "reaction",
                ParamKind::String,
                "MedDRA preferred term, e.g. \"rhabdomyolysis\"",
            ),
            SERIOUS_ONLY,
            LIMIT_10_100,
        ],
    },
    ToolDescriptor {
        name: "get_drug_label_info",
        title: "Drug label sections",
        description: "Fetch sections of the official FDA drug label (structured product \
labeling). Returns every known section by default, or only the requested ones.",
        params: &[
            DRUG_NAME,
            optional(
                "sections",
                ParamKind::EnumArray(LABEL_SECTIONS),
                "Label sections to include (default all)",
            ),
        ],
    },
    ToolDescriptor {
        name: "get_drugs_by_class",
        title: "Drugs in a pharmacologic class",
        description: "List drugs whose FDA labels carry a pharmacologic class, with the \
number of labels per generic name.",
        params: &[
            PHARM_CLASS,
            optional(
                "class_type",
                ParamKind::Enum(CLASS_TYPES),
                "Class vocabulary: established pharmacologic class, mechanism of action, \
physiologic effect, or chemical structure (default epc)",
            ),
            LIMIT_20_100,
        ],
    },
    ToolDescriptor {
        name: "get_class_adverse_events",
        title: "Adverse events for a drug class",
        description: "Count the most frequently reported reactions across every drug in an \
FDA established pharmacologic class.",
        params: &[PHARM_CLASS, SERIOUS_ONLY, LIMIT_10_100],
    },
    ToolDescriptor {
        name: "compare_label_to_reports",
        title: "Compare label to reports",
        description: "Check which frequently reported reactions for a drug appear in the \
safety sections of its FDA label. Reactions not found in the label are listed as potential \
signals. Text matching is approximate.",
        params: &[DRUG_NAME, LIMIT_20_100],
    },
    ToolDescriptor {
        name: "get_pediatric_events",
        title: "Pediatric adverse events",
        description: "Top reported reactions for a drug among pediatric patients, optionally \
narrowed to neonates, infants, children, or adolescents.",
        params: &[
            DRUG_NAME,
            optional(
                "age_group",
                ParamKind::Enum(PEDIATRIC_GROUPS),
                "Pediatric age bracket (default all_pediatric)",
            ),
            LIMIT_10_100,
        ],
    },
    ToolDescriptor {
        name: "get_geriatric_events",
        title: "Geriatric adverse events",
        description: "Top reported reactions for a drug among patients aged 65 and over, \
optionally narrowed to one age bracket.",
        params: &[
            DRUG_NAME,
            optional(
                "age_group",
                ParamKind::Enum(GERIATRIC_GROUPS),
                "Geriatric age bracket (default all_geriatric)",
            ),
            LIMIT_10_100,
        ],
    },
    ToolDescriptor {
        name: "compare_age_groups",
        title: "Compare age groups",
        description: "Compare reactions reported for a drug in pediatric or geriatric \
patients against adults aged 18 to 64. Reports which reactions are unique to each group and \
the ratio of report volumes.",
        params: &[
            DRUG_NAME,
            required(
                "population",
                ParamKind::Enum(POPULATIONS),
                "Population to compare against adults",
            ),
            LIMIT_10_50,
        ],
    },
    ToolDescriptor {
        name: "get_drug_recalls",
        title: "Drug recalls",
        description: "List FDA enforcement (recall) records for a drug, optionally filtered \
by recall classification.",
        params: &[
            DRUG_NAME,
            optional(
                "classification",
                ParamKind::Enum(RECALL_CLASSES),
                "Recall severity class; Class I is the most serious",
            ),
            LIMIT_10_100,
        ],
    },
    ToolDescriptor {
        name: "search_recalls",
        title: "Search recalls",
        description: "Search FDA drug enforcement (recall) records by classification, status, \
reason text, and initiation date. Includes a breakdown by classification.",
        params: &[
            optional(
                "classification",
                ParamKind::Enum(RECALL_CLASSES),
                "Recall severity class",
            ),
            optional(
                "status",
                ParamKind::Enum(RECALL_STATUSES),
                "Recall status",
            ),
            optional(
                "reason",
                ParamKind::String,
                "Text to match in the reason for recall, e.g. \"contamination\"",
            ),
            optional(
                "date_from",
                ParamKind::String,
                "Earliest recall initiation date, YYYYMMDD",
            ),
            optional(
                "date_to",
                ParamKind::String,
                "Latest recall initiation date, YYYYMMDD",
            ),
            LIMIT_10_100,
        ],
    },
    ToolDescriptor {
        name: "get_safety_summary",
        title: "Drug safety summary",
        description: "One-call safety overview for a drug: total and serious report counts, \
top reactions, reaction outcome breakdown, and number of recalls.",
        params: &[DRUG_NAME],
    },
    ToolDescriptor {
        name: "get_data_info",
        title: "Data source information",
        description: "Describe the data sources behind these tools, their limitations, the \
FAERS disclaimer, and the meaning of coded values.",
        params: &[],
    },
];

impl ParamSpec {
    fn schema(&self) -> Value {
        let mut prop = match self.kind {
            ParamKind::String => json!({"type": "string"}),
            ParamKind::Integer => json!({"type": "integer"}),
            ParamKind::Boolean => json!({"type": "boolean"}),
            ParamKind::StringArray => json!({"type": "array", "items": {"type": "string"}}),
            ParamKind::Enum(values) => json!({"type": "string", "enum": values}),
            ParamKind::EnumArray(values) => {
                json!({"type": "array", "items": {"type": "string", "enum": values}})
            }
        };
        if let Value::Object(map) = &mut prop {
            map.insert("description".into(), Value::String(self.description.into()));
        }
        prop
    }
}

impl ToolDescriptor {
    /// JSON schema object for the tool's arguments.
    pub fn input_schema(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        for param in self.params {
            properties.insert(param.name.into(), param.schema());
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        let mut schema = Map::new();
        schema.insert("type".into(), Value::String("object".into()));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), json!(required));
        }
        schema
    }

    pub fn to_rmcp_tool(&self) -> Tool {
        let mut tool = Tool::new(self.name, self.description, Arc::new(self.input_schema()));
        tool.title = Some(self.title.to_string());
        tool.annotations = Some(ToolAnnotations {
            title: Some(self.title.to_string()),
            read_only_hint: Some(true),
            destructive_hint: Some(false),
            idempotent_hint: Some(true),
            open_world_hint: Some(true),
        });
        tool
    }
}

pub fn find(name: &str) -> Option<&'static ToolDescriptor> {
    TOOLS.iter().find(|t| t.name == name)
}

pub fn rmcp_tools() -> Vec<Tool> {
    TOOLS.iter().map(ToolDescriptor::to_rmcp_tool).collect()
}

/// The catalog as clients see it from `tools/list`.
pub fn catalog_json() -> Value {
    Value::Array(
        rmcp_tools()
            .into_iter()
            .map(|tool| serde_json::to_value(tool).unwrap_or(Value::Null))
            .collect(),
    )
}
