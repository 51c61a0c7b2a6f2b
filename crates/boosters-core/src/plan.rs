use std::collections::HashMap;
use std::fmt;

use anyhow::{anyhow, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use crate::record::{VaccinationRecord, VaccineType};

/// A named stage of a plan, e.g. "primary" with three doses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanSeries {
    pub name: String,
    pub required_doses: u32,
}

impl std::str::FromStr for PlanSeries {
    type Err = anyhow::Error;

    /// Parses `name:doses`, e.g. `primary:3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, doses) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("expected SERIES:DOSES, got: {s}"))?;
        let name = name.trim();
        if name.is_empty() {
            bail!("series name cannot be empty: {s}");
        }
        let required_doses: u32 = doses
            .trim()
            .parse()
            .map_err(|_| anyhow!("invalid dose count in series {s}"))?;
        if required_doses == 0 {
            bail!("series {name} must require at least one dose");
        }
        Ok(Self {
            name: name.to_string(),
            required_doses,
        })
    }
}

/// The doses one vaccine needs, split into series. Records linked to the
/// plan count as completed doses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImmunizationPlan {
    pub id: Uuid,

    pub name: String,

    pub vaccine_type_id: Uuid,

    #[serde(default)]
    pub series: Vec<PlanSeries>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl ImmunizationPlan {
    pub fn new(
        name: String,
        vaccine_type: &VaccineType,
        series: Vec<PlanSeries>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Self> {
        let name = name.trim().to_string();
        if name.is_empty() {
            bail!("plan name cannot be empty");
        }
        if let Some(zero) = series.iter().find(|s| s.required_doses == 0) {
            bail!("series {} must require at least one dose", zero.name);
        }
        for (idx, s) in series.iter().enumerate() {
            if series[..idx]
                .iter()
                .any(|earlier| earlier.name.eq_ignore_ascii_case(&s.name))
            {
                bail!("series {} appears twice in plan {name}", s.name);
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            vaccine_type_id: vaccine_type.id,
            series,
            created_at: now,
            updated_at: now,
        })
    }

    /// Sum over all series. A plan without series needs a single dose.
    pub fn required_doses(&self) -> u32 {
        if self.series.is_empty() {
            return 1;
        }
        self.series.iter().map(|s| s.required_doses).sum()
    }

    /// Fails when a record of `vaccine_type` is linked to a plan for a
    /// different vaccine.
    pub fn ensure_covers(&self, vaccine_type: &VaccineType) -> anyhow::Result<()> {
        if self.vaccine_type_id != vaccine_type.id {
            bail!(
                "plan {} is not a plan for {}",
                self.name,
                vaccine_type.name
            );
        }
        Ok(())
    }

    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

/// Why the next dose of a plan is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeriesReason {
    Primary,
    Continuing,
    Booster,
}

impl SeriesReason {
    pub fn from_progress(completed: u32, required: u32) -> Self {
        if completed == 0 {
            Self::Primary
        } else if completed < required {
            Self::Continuing
        } else {
            Self::Booster
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Primary => "primary series",
            Self::Continuing => "continuing series",
            Self::Booster => "booster",
        }
    }
}

impl fmt::Display for SeriesReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanProgress {
    pub plan_id: Uuid,
    pub required_doses: u32,
    pub completed_doses: u32,
    pub missing_doses: u32,
    pub reason: SeriesReason,
}

impl PlanProgress {
    fn new(plan: &ImmunizationPlan, completed_doses: u32) -> Self {
        let required_doses = plan.required_doses();
        Self {
            plan_id: plan.id,
            required_doses,
            completed_doses,
            missing_doses: required_doses.saturating_sub(completed_doses),
            reason: SeriesReason::from_progress(completed_doses, required_doses),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing_doses == 0
    }
}

/// Progress of a single plan over the given records.
pub fn progress_for<'a, I>(plan: &ImmunizationPlan, records: I) -> PlanProgress
where
    I: IntoIterator<Item = &'a VaccinationRecord>,
{
    let completed = records
        .into_iter()
        .filter(|record| record.plan_id == Some(plan.id))
        .count();
    PlanProgress::new(plan, u32::try_from(completed).unwrap_or(u32::MAX))
}

/// Plans that have at least one linked record but are not yet complete,
/// most missing doses first.
pub fn pending_plans<'a, I>(plans: &[ImmunizationPlan], records: I) -> Vec<PlanProgress>
where
    I: IntoIterator<Item = &'a VaccinationRecord>,
{
    let mut completed: HashMap<Uuid, u32> = HashMap::new();
    for plan_id in records.into_iter().filter_map(|record| record.plan_id) {
        *completed.entry(plan_id).or_default() += 1;
    }

    let mut pending: Vec<(PlanProgress, &str)> = plans
        .iter()
        .filter_map(|plan| {
            let done = completed.get(&plan.id).copied()?;
            let progress = PlanProgress::new(plan, done);
            (!progress.is_complete()).then_some((progress, plan.name.as_str()))
        })
        .collect();
    pending.sort_by(|(a, a_name), (b, b_name)| {
        b.missing_doses
            .cmp(&a.missing_doses)
            .then_with(|| a_name.cmp(b_name))
    });

    trace!(count = pending.len(), "computed pending plans");
    pending.into_iter().map(|(progress, _)| progress).collect()
}
