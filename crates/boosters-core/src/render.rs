use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::{days_between, format_date};
use crate::plan::{ImmunizationPlan, PlanProgress};
use crate::record::{VaccinationRecord, VaccineType};
use crate::stats::DashboardStats;
use crate::status::{DueStatus, Thresholds};

/// A record joined with its catalog entry and current status.
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    pub record: &'a VaccinationRecord,
    pub vaccine: Option<&'a VaccineType>,
    pub status: DueStatus,
}

impl RecordView<'_> {
    fn vaccine_name(&self) -> String {
        self.vaccine
            .map(|vt| vt.name.clone())
            .unwrap_or_else(|| "(unknown type)".to_string())
    }
}

/// A plan joined with its vaccine and dose progress.
#[derive(Debug, Clone)]
pub struct PlanRow<'a> {
    pub plan: &'a ImmunizationPlan,
    pub vaccine: Option<&'a VaccineType>,
    pub progress: PlanProgress,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self { color: cfg.color }
    }

    #[tracing::instrument(skip(self, rows, today))]
    pub fn print_record_table(&mut self, rows: &[RecordView<'_>], today: NaiveDate) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Vaccine".to_string(),
            "Dose".to_string(),
            "Administered".to_string(),
            "Next due".to_string(),
            "In".to_string(),
            "Status".to_string(),
        ];

        let mut table = Vec::with_capacity(rows.len());
        for row in rows {
            let dose = row
                .record
                .dose_order_claimed
                .map(|dose| dose.to_string())
                .unwrap_or_default();
            let next_due = row.record.next_due_date.map(format_date).unwrap_or_default();
            let days = row
                .record
                .next_due_date
                .map(|due| format!("{}d", days_between(today, due)))
                .unwrap_or_default();

            table.push(vec![
                self.paint(&row.record.short_id(), "33"),
                row.vaccine_name(),
                dose,
                format_date(row.record.administered_on),
                next_due,
                days,
                self.paint_status(row.status),
            ]);
        }

        write_table(&mut out, headers, table)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, view, plan))]
    pub fn print_record_info(
        &mut self,
        view: &RecordView<'_>,
        plan: Option<&PlanRow<'_>>,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let record = view.record;

        writeln!(out, "id            {}", record.id)?;
        writeln!(out, "vaccine       {}", view.vaccine_name())?;
        if let Some(code) = view.vaccine.and_then(|vt| vt.code.as_deref()) {
            writeln!(out, "code          {code}")?;
        }
        if let Some(vt) = view.vaccine {
            writeln!(out, "interval      {} months", vt.recommended_interval_months)?;
        }
        writeln!(out, "administered  {}", format_date(record.administered_on))?;
        if let Some(dose) = record.dose_order_claimed {
            writeln!(out, "dose          {dose}")?;
        }
        if let Some(row) = plan {
            let progress = &row.progress;
            writeln!(
                out,
                "plan          {} ({}/{} doses, {} missing, next: {})",
                row.plan.name,
                progress.completed_doses,
                progress.required_doses,
                progress.missing_doses,
                progress.reason
            )?;
        }
        match record.next_due_date {
            Some(due) => writeln!(
                out,
                "next due      {} ({} days)",
                format_date(due),
                days_between(today, due)
            )?,
            None => writeln!(out, "next due      -")?,
        }
        writeln!(out, "status        {}", self.paint_status(view.status))?;
        if let Some(notes) = &record.notes {
            writeln!(out, "notes         {notes}")?;
        }
        writeln!(out, "created       {}", record.created_at.to_rfc3339())?;
        writeln!(out, "updated       {}", record.updated_at.to_rfc3339())?;

        Ok(())
    }

    #[tracing::instrument(skip(self, stats, thresholds))]
    pub fn print_dashboard(&mut self, stats: &DashboardStats, thresholds: &Thresholds) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let mut buckets = vec![
            (DueStatus::Overdue, "past due".to_string()),
            (
                DueStatus::DueSoon,
                format!("within {} days", thresholds.due_soon_days),
            ),
        ];
        if let Some(upcoming) = thresholds.upcoming_days {
            buckets.push((
                DueStatus::Upcoming,
                format!("{}-{} days", thresholds.due_soon_days + 1, upcoming),
            ));
        }
        buckets.push((DueStatus::UpToDate, "no action needed".to_string()));
        buckets.push((DueStatus::NoDate, "no booster required".to_string()));

        let rows = buckets
            .into_iter()
            .map(|(status, hint)| {
                vec![
                    self.paint_status(status),
                    stats.get(status).to_string(),
                    hint,
                ]
            })
            .collect();

        write_table(
            &mut out,
            vec!["Status".to_string(), "Count".to_string(), "".to_string()],
            rows,
        )?;
        writeln!(out)?;
        writeln!(out, "Pending boosters: {}", stats.total_pending)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, types))]
    pub fn print_type_table(&mut self, types: &[VaccineType]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Name".to_string(),
            "Code".to_string(),
            "Booster interval".to_string(),
        ];
        let rows = types
            .iter()
            .map(|vt| {
                let interval = if vt.recommended_interval_months == 0 {
                    "none".to_string()
                } else {
                    format!("{} months", vt.recommended_interval_months)
                };
                vec![
                    self.paint(&vt.id.simple().to_string()[..8], "33"),
                    vt.name.clone(),
                    vt.code.clone().unwrap_or_default(),
                    interval,
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, rows))]
    pub fn print_plan_table(&mut self, rows: &[PlanRow<'_>]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Plan".to_string(),
            "Vaccine".to_string(),
            "Series".to_string(),
            "Done".to_string(),
            "Missing".to_string(),
            "Next".to_string(),
        ];
        let table = rows
            .iter()
            .map(|row| {
                let series = if row.plan.series.is_empty() {
                    "single dose".to_string()
                } else {
                    row.plan
                        .series
                        .iter()
                        .map(|s| format!("{} x{}", s.name, s.required_doses))
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                let missing = if row.progress.is_complete() {
                    self.paint("0", "32")
                } else {
                    self.paint(&row.progress.missing_doses.to_string(), "33")
                };
                vec![
                    self.paint(&row.plan.short_id(), "33"),
                    row.plan.name.clone(),
                    row.vaccine
                        .map(|vt| vt.name.clone())
                        .unwrap_or_else(|| "(unknown type)".to_string()),
                    series,
                    format!("{}/{}", row.progress.completed_doses, row.progress.required_doses),
                    missing,
                    row.progress.reason.label().to_string(),
                ]
            })
            .collect();

        write_table(&mut out, headers, table)?;
        Ok(())
    }

    fn paint_status(&self, status: DueStatus) -> String {
        let code = match status {
            DueStatus::Overdue => "31",
            DueStatus::DueSoon => "33",
            DueStatus::Upcoming => "36",
            DueStatus::UpToDate => "32",
            DueStatus::NoDate => return status.label().to_string(),
        };
        self.paint(status.label(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{strip_ansi, write_table};

    #[test]
    fn table_pads_to_visible_width() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["Status".to_string(), "N".to_string()],
            vec![
                vec!["\x1b[31mOverdue\x1b[0m".to_string(), "1".to_string()],
                vec!["Impfung für".to_string(), "12".to_string()],
            ],
        )
        .expect("render table");

        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Status      N  ");
        assert_eq!(lines[1], "----------- -- ");
        assert_eq!(strip_ansi(lines[2]), "Overdue     1  ");
        assert_eq!(lines[3], "Impfung für 12 ");
    }
}
