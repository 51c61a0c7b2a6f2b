use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::{
  Deserialize,
  Serialize
};
use tracing::trace;

use crate::datetime::days_between;

pub const DEFAULT_DUE_SOON_DAYS: i64 =
  30;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize
)]
#[serde(rename_all = "kebab-case")]
pub enum DueStatus {
  NoDate,
  Overdue,
  DueSoon,
  Upcoming,
  UpToDate
}

impl DueStatus {
  pub const ALL: [DueStatus; 5] = [
    DueStatus::Overdue,
    DueStatus::DueSoon,
    DueStatus::Upcoming,
    DueStatus::UpToDate,
    DueStatus::NoDate
  ];

  pub fn as_str(
    &self
  ) -> &'static str {
    match self {
      | Self::NoDate => "no-date",
      | Self::Overdue => "overdue",
      | Self::DueSoon => "due-soon",
      | Self::Upcoming => "upcoming",
      | Self::UpToDate => "up-to-date"
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      | Self::NoDate => "No due date",
      | Self::Overdue => "Overdue",
      | Self::DueSoon => "Due soon",
      | Self::Upcoming => "Upcoming",
      | Self::UpToDate => "Up to date"
    }
  }

  /// Sort rank for due lists; most
  /// urgent first.
  pub fn priority(&self) -> u8 {
    match self {
      | Self::Overdue => 1,
      | Self::DueSoon => 2,
      | Self::Upcoming => 3,
      | Self::UpToDate => 4,
      | Self::NoDate => 5
    }
  }

  /// Counted toward the dashboard's
  /// pending total.
  pub fn is_pending(&self) -> bool {
    matches!(
      self,
      Self::Overdue
        | Self::DueSoon
        | Self::Upcoming
    )
  }
}

impl fmt::Display for DueStatus {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for DueStatus {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .replace('_', "-")
      .as_str()
    {
      | "overdue" => Ok(Self::Overdue),
      | "due-soon" | "duesoon" => {
        Ok(Self::DueSoon)
      }
      | "upcoming" => {
        Ok(Self::Upcoming)
      }
      | "up-to-date" | "uptodate"
      | "current" => Ok(Self::UpToDate),
      | "no-date" | "nodate" => {
        Ok(Self::NoDate)
      }
      | other => {
        Err(anyhow!(
          "unknown due status: {other} \
           (expected overdue, \
           due-soon, upcoming, \
           up-to-date or no-date)"
        ))
      }
    }
  }
}

/// Day-count thresholds separating the
/// buckets.
///
/// The default is the 30-day scheme:
/// anything further out than
/// `due_soon_days` is up to date.
/// Setting `upcoming_days` opts into
/// an extra band between the two.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct Thresholds {
  pub due_soon_days: i64,
  pub upcoming_days: Option<i64>
}

impl Default for Thresholds {
  fn default() -> Self {
    Self {
      due_soon_days:
        DEFAULT_DUE_SOON_DAYS,
      upcoming_days: None
    }
  }
}

impl Thresholds {
  pub fn new(
    due_soon_days: i64,
    upcoming_days: Option<i64>
  ) -> anyhow::Result<Self> {
    if due_soon_days < 0 {
      return Err(anyhow!(
        "due.soon_days must not be \
         negative: {due_soon_days}"
      ));
    }
    if let Some(upcoming) =
      upcoming_days
      && upcoming <= due_soon_days
    {
      return Err(anyhow!(
        "due.upcoming_days \
         ({upcoming}) must be greater \
         than due.soon_days \
         ({due_soon_days})"
      ));
    }
    Ok(Self {
      due_soon_days,
      upcoming_days
    })
  }
}

/// Buckets a booster due date against
/// `today` using the default 30-day
/// scheme.
#[must_use]
pub fn classify(
  next_due: Option<NaiveDate>,
  today: NaiveDate
) -> DueStatus {
  classify_with(
    next_due,
    today,
    &Thresholds::default()
  )
}

#[must_use]
pub fn classify_with(
  next_due: Option<NaiveDate>,
  today: NaiveDate,
  thresholds: &Thresholds
) -> DueStatus {
  let Some(due) = next_due else {
    return DueStatus::NoDate;
  };

  let days_until_due =
    days_between(today, due);
  let status = if days_until_due < 0 {
    DueStatus::Overdue
  } else if days_until_due
    <= thresholds.due_soon_days
  {
    DueStatus::DueSoon
  } else {
    match thresholds.upcoming_days {
      | Some(limit)
        if days_until_due <= limit =>
      {
        DueStatus::Upcoming
      }
      | _ => DueStatus::UpToDate
    }
  };

  trace!(%due, %today, days_until_due, %status, "classified due date");
  status
}

#[cfg(test)]
mod tests {
  use chrono::{
    Duration,
    NaiveDate
  };

  use super::{
    DueStatus,
    Thresholds,
    classify,
    classify_with
  };

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(
      2024, 6, 15
    )
    .expect("valid date")
  }

  fn in_days(days: i64) -> NaiveDate {
    today() + Duration::days(days)
  }

  #[test]
  fn missing_due_date_is_no_date() {
    assert_eq!(
      classify(None, today()),
      DueStatus::NoDate
    );
    assert_eq!(
      classify(
        None,
        NaiveDate::MIN
      ),
      DueStatus::NoDate
    );
  }

  #[test]
  fn boundaries_of_default_scheme() {
    let t = today();
    assert_eq!(
      classify(Some(in_days(-1)), t),
      DueStatus::Overdue
    );
    assert_eq!(
      classify(Some(t), t),
      DueStatus::DueSoon
    );
    assert_eq!(
      classify(Some(in_days(30)), t),
      DueStatus::DueSoon
    );
    assert_eq!(
      classify(Some(in_days(31)), t),
      DueStatus::UpToDate
    );
    assert_eq!(
      classify(Some(in_days(400)), t),
      DueStatus::UpToDate
    );
  }

  #[test]
  fn upcoming_band_is_opt_in() {
    let thresholds =
      Thresholds::new(30, Some(90))
        .expect("valid thresholds");
    let t = today();
    assert_eq!(
      classify_with(
        Some(in_days(30)),
        t,
        &thresholds
      ),
      DueStatus::DueSoon
    );
    assert_eq!(
      classify_with(
        Some(in_days(31)),
        t,
        &thresholds
      ),
      DueStatus::Upcoming
    );
    assert_eq!(
      classify_with(
        Some(in_days(90)),
        t,
        &thresholds
      ),
      DueStatus::Upcoming
    );
    assert_eq!(
      classify_with(
        Some(in_days(91)),
        t,
        &thresholds
      ),
      DueStatus::UpToDate
    );
  }

  #[test]
  fn classification_is_repeatable() {
    let due = Some(in_days(12));
    let first = classify(due, today());
    let second = classify(due, today());
    assert_eq!(first, second);
  }

  #[test]
  fn rejects_inverted_thresholds() {
    assert!(
      Thresholds::new(30, Some(30))
        .is_err()
    );
    assert!(
      Thresholds::new(-1, None)
        .is_err()
    );
  }

  #[test]
  fn status_text_parses_back() {
    for status in DueStatus::ALL {
      assert_eq!(
        status
          .as_str()
          .parse::<DueStatus>()
          .expect("known status"),
        status
      );
    }
    assert!(
      "later"
        .parse::<DueStatus>()
        .is_err()
    );
  }

  #[test]
  fn priority_orders_most_urgent_first()
   {
    let mut statuses = vec![
      DueStatus::NoDate,
      DueStatus::UpToDate,
      DueStatus::Overdue,
      DueStatus::Upcoming,
      DueStatus::DueSoon,
    ];
    statuses.sort_by_key(|s| s.priority());
    assert_eq!(
      statuses,
      DueStatus::ALL.to_vec()
    );
  }
}
