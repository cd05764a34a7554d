use serde::{Deserialize, Serialize};

use crate::entities::adverse_event::{REACTION_COUNT_FIELD, ReactionCount, reaction_counts};
use crate::entities::query::{AgeBracket, EventQuery};
use crate::entities::{
    Attribution, ChartHint, FAERS_DISCLAIMER, Outcome, check_limit, param_enum_from_str,
    required_text,
};
use crate::error::FaersError;
use crate::sources::openfda::OpenFdaClient;
use crate::transform::adverse_event::{report_ratio, split_reactions, term_counts};

const MAX_POPULATION_LIMIT: usize = 100;
const MAX_AGE_COMPARE_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum PediatricAgeGroup {
    Neonate,
    Infant,
    Child,
    Adolescent,
    #[default]
    AllPediatric,
}

impl PediatricAgeGroup {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "neonate" => Ok(Self::Neonate),
            "infant" => Ok(Self::Infant),
            "child" => Ok(Self::Child),
            "adolescent" => Ok(Self::Adolescent),
            "all_pediatric" => Ok(Self::AllPediatric),
            other => Err(format!(
                "age_group '{other}' is not recognized. Expected one of: neonate, infant, child, adolescent, all_pediatric"
            )),
        }
    }

    pub fn bracket(self) -> AgeBracket {
        match self {
            Self::Neonate => AgeBracket::Neonate,
            Self::Infant => AgeBracket::Infant,
            Self::Child => AgeBracket::Child,
            Self::Adolescent => AgeBracket::Adolescent,
            Self::AllPediatric => AgeBracket::AllPediatric,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum GeriatricAgeGroup {
    From65To74,
    From75To84,
    From85,
    #[default]
    AllGeriatric,
}

impl GeriatricAgeGroup {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "65_to_74" => Ok(Self::From65To74),
            "75_to_84" => Ok(Self::From75To84),
            "85_plus" => Ok(Self::From85),
            "all_geriatric" => Ok(Self::AllGeriatric),
            other => Err(format!(
                "age_group '{other}' is not recognized. Expected one of: 65_to_74, 75_to_84, 85_plus, all_geriatric"
            )),
        }
    }

    pub fn bracket(self) -> AgeBracket {
        match self {
            Self::From65To74 => AgeBracket::From65To74,
            Self::From75To84 => AgeBracket::From75To84,
            Self::From85 => AgeBracket::From85,
            Self::AllGeriatric => AgeBracket::AllGeriatric,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Population {
    Pediatric,
    Geriatric,
}

impl Population {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pediatric" => Ok(Self::Pediatric),
            "geriatric" => Ok(Self::Geriatric),
            other => Err(format!(
                "population '{other}' is not recognized. Expected one of: pediatric, geriatric"
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pediatric => "pediatric",
            Self::Geriatric => "geriatric",
        }
    }

    fn bracket(self) -> AgeBracket {
        match self {
            Self::Pediatric => AgeBracket::AllPediatric,
            Self::Geriatric => AgeBracket::AllGeriatric,
        }
    }
}

param_enum_from_str!(PediatricAgeGroup, GeriatricAgeGroup, Population);

#[derive(Debug, Clone, Deserialize)]
pub struct PediatricEventsParams {
    pub drug_name: String,
    #[serde(default)]
    pub age_group: PediatricAgeGroup,
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeriatricEventsParams {
    pub drug_name: String,
    #[serde(default)]
    pub age_group: GeriatricAgeGroup,
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PopulationEvents {
    pub drug: String,
    pub population: &'static str,
    pub age_group: &'static str,
    pub age_range: String,
    pub results: Vec<ReactionCount>,
    pub disclaimer: &'static str,
}

pub async fn pediatric_events(
    client: &OpenFdaClient,
    params: PediatricEventsParams,
) -> Result<Outcome<PopulationEvents>, FaersError> {
    let drug = required_text("drug_name", &params.drug_name)?;
    let limit = check_limit(params.limit, 10, MAX_POPULATION_LIMIT)?;
    population_events(
        client,
        drug,
        Population::Pediatric,
        params.age_group.bracket(),
        limit,
    )
    .await
}

pub async fn geriatric_events(
    client: &OpenFdaClient,
    params: GeriatricEventsParams,
) -> Result<Outcome<PopulationEvents>, FaersError> {
    let drug = required_text("drug_name", &params.drug_name)?;
    let limit = check_limit(params.limit, 10, MAX_POPULATION_LIMIT)?;
    population_events(
        client,
        drug,
        Population::Geriatric,
        params.age_group.bracket(),
        limit,
    )
    .await
}

async fn population_events(
    client: &OpenFdaClient,
    drug: String,
    population: Population,
    bracket: AgeBracket,
    limit: usize,
) -> Result<Outcome<PopulationEvents>, FaersError> {
    let search = EventQuery {
        drug: Some(&drug),
        age: Some(bracket),
        ..EventQuery::default()
    }
    .build()?;

    let resp = client
        .event_count(&search, REACTION_COUNT_FIELD, Some(limit))
        .await?;
    let results = resp
        .map(|r| reaction_counts(term_counts(&r.results)))
        .unwrap_or_default();
    if results.is_empty() {
        return Ok(Outcome::empty(
            format!(
                "No {} adverse event reports ({}) found for '{drug}'.",
                population.as_str(),
                bracket.describe()
            ),
            Attribution::Faers,
        ));
    }

    Ok(Outcome::Found(PopulationEvents {
        drug,
        population: population.as_str(),
        age_group: bracket.as_str(),
        age_range: bracket.describe(),
        results,
        disclaimer: FAERS_DISCLAIMER,
    }))
}

// compare_age_groups

#[derive(Debug, Clone, Deserialize)]
pub struct CompareAgeGroupsParams {
    pub drug_name: String,
    pub population: Population,
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgeGroupComparison {
    pub drug: String,
    pub population: &'static str,
    pub population_range: String,
    pub adult_range: String,
    pub population_reports: u64,
    pub adult_reports: u64,
    pub report_ratio: String,
    pub unique_to_population: Vec<String>,
    pub unique_to_adults: Vec<String>,
    pub shared_reactions: Vec<String>,
    pub chart_hint: ChartHint,
    pub disclaimer: &'static str,
}

pub async fn compare_age_groups(
    client: &OpenFdaClient,
    params: CompareAgeGroupsParams,
) -> Result<Outcome<AgeGroupComparison>, FaersError> {
    let drug = required_text("drug_name", &params.drug_name)?;
    let limit = check_limit(params.limit, 10, MAX_AGE_COMPARE_LIMIT)?;
    let population = params.population;
    let bracket = population.bracket();

    let population_search = EventQuery {
        drug: Some(&drug),
        age: Some(bracket),
        ..EventQuery::default()
    }
    .build()?;
    let adult_search = EventQuery {
        drug: Some(&drug),
        age: Some(AgeBracket::Adult),
        ..EventQuery::default()
    }
    .build()?;

    let (population_reports, adult_reports, population_counts, adult_counts) = tokio::try_join!(
        client.event_total(&population_search),
        client.event_total(&adult_search),
        client.event_count(&population_search, REACTION_COUNT_FIELD, Some(limit)),
        client.event_count(&adult_search, REACTION_COUNT_FIELD, Some(limit)),
    )?;

    if population_reports == 0 && adult_reports == 0 {
        return Ok(Outcome::empty(
            format!("No age-coded adverse event reports found for '{drug}'."),
            Attribution::Faers,
        ));
    }

    let population_rows = population_counts
        .map(|c| term_counts(&c.results))
        .unwrap_or_default();
    let adult_rows = adult_counts
        .map(|c| term_counts(&c.results))
        .unwrap_or_default();
    let split = split_reactions(&population_rows, &adult_rows);

    Ok(Outcome::Found(AgeGroupComparison {
        chart_hint: ChartHint::new(
            "grouped_bar",
            format!("{drug}: {} vs adult reports", population.as_str()),
            "reaction",
            "count",
        ),
        drug,
        population: population.as_str(),
        population_range: bracket.describe(),
        adult_range: AgeBracket::Adult.describe(),
        population_reports,
        adult_reports,
        report_ratio: report_ratio(population_reports, adult_reports),
        unique_to_population: split.only_left,
        unique_to_adults: split.only_right,
        shared_reactions: split.shared,
        disclaimer: FAERS_DISCLAIMER,
    }))
}
