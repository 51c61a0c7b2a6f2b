use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::plan::ImmunizationPlan;
use crate::record::{VaccinationRecord, VaccineType};

/// JSON-lines files holding one user's records, the vaccine catalog and
/// the immunization plans.
#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub records_path: PathBuf,
    pub types_path: PathBuf,
    pub plans_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let records_path = data_dir.join("records.data");
        let types_path = data_dir.join("vaccine_types.data");
        let plans_path = data_dir.join("plans.data");

        for path in [&records_path, &types_path, &plans_path] {
            if !path.exists() {
                fs::write(path, "")
                    .with_context(|| format!("failed to create {}", path.display()))?;
            }
        }

        info!(
            data_dir = %data_dir.display(),
            records = %records_path.display(),
            types = %types_path.display(),
            plans = %plans_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            records_path,
            types_path,
            plans_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_records(&self) -> anyhow::Result<Vec<VaccinationRecord>> {
        load_jsonl(&self.records_path).context("failed to load records.data")
    }

    #[tracing::instrument(skip(self, records))]
    pub fn save_records(&self, records: &[VaccinationRecord]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.records_path, records).context("failed to save records.data")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_types(&self) -> anyhow::Result<Vec<VaccineType>> {
        load_jsonl(&self.types_path).context("failed to load vaccine_types.data")
    }

    #[tracing::instrument(skip(self, types))]
    pub fn save_types(&self, types: &[VaccineType]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.types_path, types).context("failed to save vaccine_types.data")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_plans(&self) -> anyhow::Result<Vec<ImmunizationPlan>> {
        load_jsonl(&self.plans_path).context("failed to load plans.data")
    }

    #[tracing::instrument(skip(self, plans))]
    pub fn save_plans(&self, plans: &[ImmunizationPlan]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.plans_path, plans).context("failed to save plans.data")
    }

    #[tracing::instrument(skip(self, vaccine_type), fields(name = %vaccine_type.name))]
    pub fn add_type(&self, vaccine_type: VaccineType) -> anyhow::Result<Vec<VaccineType>> {
        let mut types = self.load_types()?;
        if types
            .iter()
            .any(|existing| existing.name.eq_ignore_ascii_case(&vaccine_type.name))
        {
            return Err(anyhow!("vaccine type already exists: {}", vaccine_type.name));
        }
        types.push(vaccine_type);
        types.sort_by_key(|t| t.name.to_ascii_lowercase());
        self.save_types(&types)?;
        Ok(types)
    }

    #[tracing::instrument(skip(self, plan), fields(name = %plan.name))]
    pub fn add_plan(&self, plan: ImmunizationPlan) -> anyhow::Result<Vec<ImmunizationPlan>> {
        let mut plans = self.load_plans()?;
        if plans
            .iter()
            .any(|existing| existing.name.eq_ignore_ascii_case(&plan.name))
        {
            return Err(anyhow!("plan already exists: {}", plan.name));
        }
        plans.push(plan);
        plans.sort_by_key(|p| p.name.to_ascii_lowercase());
        self.save_plans(&plans)?;
        Ok(plans)
    }

    #[tracing::instrument(skip(self, record), fields(id = %record.id))]
    pub fn add_record(&self, record: VaccinationRecord) -> anyhow::Result<Vec<VaccinationRecord>> {
        let mut records = self.load_records()?;
        records.push(record);
        sort_records(&mut records);
        self.save_records(&records)?;
        Ok(records)
    }

    #[tracing::instrument(skip(self, record), fields(id = %record.id))]
    pub fn update_record(&self, record: VaccinationRecord) -> anyhow::Result<()> {
        let mut records = self.load_records()?;
        let slot = records
            .iter_mut()
            .find(|existing| existing.id == record.id)
            .ok_or_else(|| anyhow!("record not found: {}", record.id))?;
        *slot = record;
        sort_records(&mut records);
        self.save_records(&records)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn delete_record(&self, id: Uuid) -> anyhow::Result<VaccinationRecord> {
        let mut records = self.load_records()?;
        let idx = records
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| anyhow!("record not found: {id}"))?;
        let removed = records.remove(idx);
        self.save_records(&records)?;
        info!(remaining = records.len(), "deleted record");
        Ok(removed)
    }

    /// Looks a record up by full id or by an unambiguous id prefix.
    pub fn find_record(&self, selector: &str) -> anyhow::Result<VaccinationRecord> {
        let records = self.load_records()?;
        select_by_id(records, |record| record.id, selector, "record")
    }

    /// Looks a vaccine type up by name, code, full id or id prefix.
    pub fn find_type(&self, selector: &str) -> anyhow::Result<VaccineType> {
        let types = self.load_types()?;
        let needle = selector.trim();
        if let Some(found) = types.iter().find(|t| {
            t.name.eq_ignore_ascii_case(needle)
                || t.code
                    .as_deref()
                    .is_some_and(|code| code.eq_ignore_ascii_case(needle))
        }) {
            return Ok(found.clone());
        }
        select_by_id(types, |t| t.id, needle, "vaccine type")
    }

    /// Looks a plan up by name, full id or id prefix.
    pub fn find_plan(&self, selector: &str) -> anyhow::Result<ImmunizationPlan> {
        let plans = self.load_plans()?;
        let needle = selector.trim();
        if let Some(found) = plans.iter().find(|p| p.name.eq_ignore_ascii_case(needle)) {
            return Ok(found.clone());
        }
        select_by_id(plans, |p| p.id, needle, "plan")
    }
}

/// Picks the single item whose id starts with `selector`. Hyphens and case
/// are ignored so both full and short ids work.
fn select_by_id<T>(
    items: Vec<T>,
    id_of: impl Fn(&T) -> Uuid,
    selector: &str,
    kind: &str,
) -> anyhow::Result<T> {
    let prefix = selector.trim().to_ascii_lowercase().replace('-', "");
    if prefix.is_empty() {
        return Err(anyhow!("empty {kind} id"));
    }

    let mut matches = items
        .into_iter()
        .filter(|item| id_of(item).simple().to_string().starts_with(&prefix));
    let first = matches
        .next()
        .ok_or_else(|| anyhow!("no {kind} matches {selector}"))?;
    if matches.next().is_some() {
        return Err(anyhow!("{kind} id {selector} is ambiguous"));
    }
    Ok(first)
}

fn sort_records(records: &mut [VaccinationRecord]) {
    records.sort_by(|a, b| {
        b.administered_on
            .cmp(&a.administered_on)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let item: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(item);
    }

    debug!(count = out.len(), "loaded entries from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, items))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, items: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = items.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for item in items {
        let serialized = serde_json::to_string(item)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
