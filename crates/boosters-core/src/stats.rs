use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::record::VaccinationRecord;
use crate::status::{DueStatus, Thresholds, classify_with};

/// Dashboard summary counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub overdue_count: usize,
    pub due_soon_count: usize,
    pub upcoming_count: usize,
    pub up_to_date_count: usize,
    pub no_date_count: usize,
    /// Overdue + due soon + upcoming.
    pub total_pending: usize,
}

impl DashboardStats {
    fn count(&mut self, status: DueStatus) {
        match status {
            DueStatus::Overdue => self.overdue_count += 1,
            DueStatus::DueSoon => self.due_soon_count += 1,
            DueStatus::Upcoming => self.upcoming_count += 1,
            DueStatus::UpToDate => self.up_to_date_count += 1,
            DueStatus::NoDate => self.no_date_count += 1,
        }
        if status.is_pending() {
            self.total_pending += 1;
        }
    }

    pub fn get(&self, status: DueStatus) -> usize {
        match status {
            DueStatus::Overdue => self.overdue_count,
            DueStatus::DueSoon => self.due_soon_count,
            DueStatus::Upcoming => self.upcoming_count,
            DueStatus::UpToDate => self.up_to_date_count,
            DueStatus::NoDate => self.no_date_count,
        }
    }
}

pub fn aggregate<'a, I>(records: I, today: NaiveDate) -> DashboardStats
where
    I: IntoIterator<Item = &'a VaccinationRecord>,
{
    aggregate_with(records, today, &Thresholds::default())
}

#[tracing::instrument(skip(records, thresholds))]
pub fn aggregate_with<'a, I>(records: I, today: NaiveDate, thresholds: &Thresholds) -> DashboardStats
where
    I: IntoIterator<Item = &'a VaccinationRecord>,
{
    let stats = records
        .into_iter()
        .map(|record| classify_with(record.next_due_date, today, thresholds))
        .fold(DashboardStats::default(), |mut acc, status| {
            acc.count(status);
            acc
        });

    debug!(?stats, "aggregated dashboard stats");
    stats
}
