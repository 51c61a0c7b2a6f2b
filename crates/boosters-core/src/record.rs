use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::datetime::calendar_date_serde;
use crate::error::ScheduleError;
use crate::schedule::{compute_next_due, validate_administered_on, validate_dose_order};
use crate::status::{DueStatus, Thresholds, classify_with};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VaccineType {
    pub id: Uuid,

    pub name: String,

    #[serde(default)]
    pub code: Option<String>,

    /// Zero means the vaccine needs no booster.
    #[serde(default)]
    pub recommended_interval_months: i64,
}

impl VaccineType {
    pub fn new(name: String, recommended_interval_months: i64) -> Result<Self, ScheduleError> {
        if recommended_interval_months < 0 {
            return Err(ScheduleError::InvalidInterval {
                months: recommended_interval_months,
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            code: None,
            recommended_interval_months,
        })
    }
}

/// The user-entered part of a record apart from its vaccine type;
/// everything else is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDraft {
    pub administered_on: NaiveDate,
    pub dose_order_claimed: Option<u32>,
    pub plan_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VaccinationRecord {
    pub id: Uuid,

    pub vaccine_type_id: Uuid,

    #[serde(with = "calendar_date_serde")]
    pub administered_on: NaiveDate,

    #[serde(default, deserialize_with = "deserialize_dose_order")]
    pub dose_order_claimed: Option<u32>,

    #[serde(default)]
    pub plan_id: Option<Uuid>,

    #[serde(default, with = "calendar_date_serde::option")]
    pub next_due_date: Option<NaiveDate>,

    #[serde(default)]
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl VaccinationRecord {
    /// Builds a new record from a validated draft, deriving the next due
    /// date from the vaccine type's interval.
    pub fn create(
        draft: RecordDraft,
        vaccine_type: &VaccineType,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Self, ScheduleError> {
        let administered_on = validate_administered_on(draft.administered_on, today)?;
        let next_due_date =
            compute_next_due(administered_on, vaccine_type.recommended_interval_months)?;

        Ok(Self {
            id: Uuid::new_v4(),
            vaccine_type_id: vaccine_type.id,
            administered_on,
            dose_order_claimed: draft.dose_order_claimed,
            plan_id: draft.plan_id,
            next_due_date,
            notes: draft.notes,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies an edit. The due date is always recomputed so it never
    /// drifts from `administered_on` + interval.
    pub fn apply_edit(
        &mut self,
        draft: RecordDraft,
        vaccine_type: &VaccineType,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), ScheduleError> {
        let administered_on = validate_administered_on(draft.administered_on, today)?;
        let next_due_date =
            compute_next_due(administered_on, vaccine_type.recommended_interval_months)?;

        self.vaccine_type_id = vaccine_type.id;
        self.administered_on = administered_on;
        self.dose_order_claimed = draft.dose_order_claimed;
        self.plan_id = draft.plan_id;
        self.next_due_date = next_due_date;
        self.notes = draft.notes;
        self.updated_at = now;
        Ok(())
    }

    pub fn draft(&self) -> RecordDraft {
        RecordDraft {
            administered_on: self.administered_on,
            dose_order_claimed: self.dose_order_claimed,
            plan_id: self.plan_id,
            notes: self.notes.clone(),
        }
    }

    pub fn status(&self, today: NaiveDate, thresholds: &Thresholds) -> DueStatus {
        classify_with(self.next_due_date, today, thresholds)
    }

    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

/// Stored dose numbers go through the same check as entered ones.
fn deserialize_dose_order<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer)?
        .map(validate_dose_order)
        .transpose()
        .map_err(serde::de::Error::custom)
}
