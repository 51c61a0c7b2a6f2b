use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::cli::Invocation;
use crate::config::Config;
use crate::datastore::DataStore;
use crate::datetime::{self, format_date, parse_date_expr};
use crate::plan::{ImmunizationPlan, PlanSeries, pending_plans, progress_for};
use crate::record::{RecordDraft, VaccinationRecord, VaccineType};
use crate::render::{PlanRow, RecordView, Renderer};
use crate::schedule::validate_dose_order;
use crate::stats::aggregate_with;
use crate::status::{DueStatus, Thresholds};

/// Shorter prefixes are too easily a record id, e.g. `ad` or `da`.
const MIN_ABBREVIATION_LEN: usize = 3;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "dashboard",
        "list",
        "info",
        "add",
        "modify",
        "delete",
        "types",
        "type-add",
        "plans",
        "plan-add",
        "export",
        "show",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &str, known: &[&'a str]) -> Option<&'a str> {
    if let Some(exact) = known.iter().copied().find(|name| *name == token) {
        return Some(exact);
    }
    if token.len() < MIN_ABBREVIATION_LEN {
        return None;
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// Per-invocation context: settings are read once here and handed down,
/// never looked up globally.
struct Ctx {
    now: DateTime<Utc>,
    today: NaiveDate,
    thresholds: Thresholds,
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let ctx = Ctx {
        now,
        today: datetime::today(now),
        thresholds: cfg.thresholds,
    };
    let command = inv.command.as_str();

    debug!(
        command,
        selectors = ?inv.selectors,
        args = ?inv.command_args,
        today = %ctx.today,
        "dispatching command"
    );

    match command {
        "dashboard" => {
            no_arguments(&inv)?;
            cmd_dashboard(store, renderer, &ctx)
        }
        "list" => cmd_list(store, renderer, &inv.command_args, &ctx),
        "info" => cmd_info(store, renderer, &inv, &ctx),
        "add" => cmd_add(store, &inv.command_args, &ctx),
        "modify" => cmd_modify(store, &inv, &ctx),
        "delete" => cmd_delete(store, &inv),
        "types" => {
            no_arguments(&inv)?;
            cmd_types(store, renderer)
        }
        "type-add" => cmd_type_add(store, &inv.command_args),
        "plans" => {
            no_arguments(&inv)?;
            cmd_plans(store, renderer)
        }
        "plan-add" => cmd_plan_add(store, &inv.command_args, &ctx),
        "export" => {
            no_arguments(&inv)?;
            cmd_export(store, &ctx)
        }
        "show" => {
            no_arguments(&inv)?;
            cmd_show(cfg)
        }
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(store, renderer, ctx))]
fn cmd_dashboard(store: &mut DataStore, renderer: &mut Renderer, ctx: &Ctx) -> anyhow::Result<()> {
    info!("command dashboard");

    let records = store.load_records()?;
    let types = store.load_types()?;
    let stats = aggregate_with(&records, ctx.today, &ctx.thresholds);
    renderer.print_dashboard(&stats, &ctx.thresholds)?;

    let by_id = index_types(&types);
    let mut due: Vec<RecordView<'_>> = views(&records, &by_id, ctx)
        .into_iter()
        .filter(|view| view.status.is_pending())
        .collect();
    if !due.is_empty() {
        sort_by_priority(&mut due);
        println!();
        renderer.print_record_table(&due, ctx.today)?;
    }

    let plans = store.load_plans()?;
    let pending = pending_plans(&plans, &records);
    if pending.is_empty() {
        return Ok(());
    }
    let rows: Vec<PlanRow<'_>> = pending
        .into_iter()
        .filter_map(|progress| {
            let plan = plans.iter().find(|plan| plan.id == progress.plan_id)?;
            Some(PlanRow {
                plan,
                vaccine: by_id.get(&plan.vaccine_type_id).copied(),
                progress,
            })
        })
        .collect();
    println!();
    println!("Plans in progress:");
    renderer.print_plan_table(&rows)
}

#[instrument(skip(store, renderer, args, ctx))]
fn cmd_list(
    store: &mut DataStore,
    renderer: &mut Renderer,
    args: &[String],
    ctx: &Ctx,
) -> anyhow::Result<()> {
    info!("command list");

    let filter = ListFilter::parse(store, args)?;
    let records = store.load_records()?;
    let types = store.load_types()?;
    let by_id = index_types(&types);

    let mut rows: Vec<RecordView<'_>> = views(&records, &by_id, ctx)
        .into_iter()
        .filter(|view| filter.matches(view))
        .collect();
    sort_by_priority(&mut rows);

    debug!(count = rows.len(), "listing records");
    renderer.print_record_table(&rows, ctx.today)
}

#[instrument(skip(store, renderer, inv, ctx))]
fn cmd_info(
    store: &mut DataStore,
    renderer: &mut Renderer,
    inv: &Invocation,
    ctx: &Ctx,
) -> anyhow::Result<()> {
    info!("command info");

    let selector = single_selector(inv)?;
    let record = store.find_record(&selector)?;
    let types = store.load_types()?;
    let vaccine = types.iter().find(|vt| vt.id == record.vaccine_type_id);
    let view = RecordView {
        record: &record,
        vaccine,
        status: record.status(ctx.today, &ctx.thresholds),
    };

    let plan_row = match record.plan_id {
        Some(plan_id) => {
            let plans = store.load_plans()?;
            let records = store.load_records()?;
            plans
                .into_iter()
                .find(|plan| plan.id == plan_id)
                .map(|plan| (progress_for(&plan, &records), plan))
        }
        None => None,
    };
    let plan_row = plan_row.as_ref().map(|(progress, plan)| PlanRow {
        plan,
        vaccine,
        progress: progress.clone(),
    });
    renderer.print_record_info(&view, plan_row.as_ref(), ctx.today)
}

#[instrument(skip(store, args, ctx))]
fn cmd_add(store: &mut DataStore, args: &[String], ctx: &Ctx) -> anyhow::Result<()> {
    info!("command add");

    let parsed = RecordArgs::parse(args, ctx.today)?;
    let (type_selector, date) = match (parsed.positional.as_slice(), parsed.date) {
        ([vaccine], Some(date)) => (vaccine.clone(), date),
        ([vaccine, raw_date], None) => (vaccine.clone(), parse_date_expr(raw_date, ctx.today)?),
        ([], _) => return Err(anyhow!("add requires a vaccine type and a date")),
        ([_], None) => return Err(anyhow!("add requires an administration date")),
        _ => {
            return Err(anyhow!(
                "unexpected arguments to add: {}",
                parsed.positional.join(" ")
            ));
        }
    };
    let type_selector = parsed.vaccine.clone().unwrap_or(type_selector);
    let vaccine = store.find_type(&type_selector)?;
    let plan_id = match parsed.plan.flatten() {
        Some(selector) => Some(linked_plan(store, &selector, &vaccine)?.id),
        None => None,
    };

    let draft = RecordDraft {
        administered_on: date,
        dose_order_claimed: parsed.dose.flatten(),
        plan_id,
        notes: parsed.notes.flatten(),
    };
    let record = VaccinationRecord::create(draft, &vaccine, ctx.today, ctx.now)
        .with_context(|| format!("cannot record {} on {}", vaccine.name, format_date(date)))?;

    let status = record.status(ctx.today, &ctx.thresholds);
    let next_due = record
        .next_due_date
        .map(format_date)
        .unwrap_or_else(|| "none".to_string());
    store.add_record(record.clone())?;

    println!(
        "Recorded {} ({}). Next due: {next_due} [{}].",
        vaccine.name,
        record.short_id(),
        status.label()
    );
    Ok(())
}

#[instrument(skip(store, inv, ctx))]
fn cmd_modify(store: &mut DataStore, inv: &Invocation, ctx: &Ctx) -> anyhow::Result<()> {
    info!("command modify");

    let (selector, mod_args) = selector_and_rest(inv)?;
    let parsed = RecordArgs::parse(mod_args, ctx.today)?;
    if !parsed.positional.is_empty() {
        return Err(anyhow!(
            "unexpected arguments to modify: {}",
            parsed.positional.join(" ")
        ));
    }
    if parsed.is_empty() {
        return Err(anyhow!(
            "modify requires at least one of type:, date:, dose:, plan:, notes:"
        ));
    }

    let mut record = store.find_record(&selector)?;
    let vaccine = match &parsed.vaccine {
        Some(type_selector) => store.find_type(type_selector)?,
        None => {
            let types = store.load_types()?;
            types
                .into_iter()
                .find(|vt| vt.id == record.vaccine_type_id)
                .ok_or_else(|| {
                    anyhow!(
                        "record {} references unknown vaccine type {}",
                        record.short_id(),
                        record.vaccine_type_id
                    )
                })?
        }
    };

    let mut draft = record.draft();
    if let Some(date) = parsed.date {
        draft.administered_on = date;
    }
    if let Some(dose) = parsed.dose {
        draft.dose_order_claimed = dose;
    }
    if let Some(notes) = parsed.notes {
        draft.notes = notes;
    }
    match parsed.plan {
        Some(Some(selector)) => draft.plan_id = Some(linked_plan(store, &selector, &vaccine)?.id),
        Some(None) => draft.plan_id = None,
        None => {
            // A type change must not leave the record in another vaccine's plan.
            if let Some(plan_id) = draft.plan_id {
                linked_plan(store, &plan_id.simple().to_string(), &vaccine)?;
            }
        }
    }

    record
        .apply_edit(draft, &vaccine, ctx.today, ctx.now)
        .with_context(|| format!("cannot modify record {}", record.short_id()))?;
    store.update_record(record.clone())?;

    println!(
        "Modified {}. Next due: {} [{}].",
        record.short_id(),
        record
            .next_due_date
            .map(format_date)
            .unwrap_or_else(|| "none".to_string()),
        record.status(ctx.today, &ctx.thresholds).label()
    );
    Ok(())
}

#[instrument(skip(store, inv))]
fn cmd_delete(store: &mut DataStore, inv: &Invocation) -> anyhow::Result<()> {
    info!("command delete");

    let mut selectors: Vec<&String> = inv.selectors.iter().collect();
    selectors.extend(inv.command_args.iter());
    if selectors.is_empty() {
        return Err(anyhow!("delete requires a record id"));
    }

    let mut ids = BTreeSet::new();
    for selector in selectors {
        ids.insert(store.find_record(selector)?.id);
    }

    let count = ids.len();
    for id in ids {
        store.delete_record(id)?;
    }
    println!("Deleted {count} record(s).");
    Ok(())
}

#[instrument(skip(store, renderer))]
fn cmd_types(store: &mut DataStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    info!("command types");
    let types = store.load_types()?;
    renderer.print_type_table(&types)
}

#[instrument(skip(store, args))]
fn cmd_type_add(store: &mut DataStore, args: &[String]) -> anyhow::Result<()> {
    info!("command type-add");

    let mut code = None;
    let mut positional = Vec::new();
    for arg in args {
        if let Some(value) = arg.strip_prefix("code:") {
            code = Some(value.trim().to_string()).filter(|v| !v.is_empty());
        } else {
            positional.push(arg.as_str());
        }
    }

    let [name, months] = positional.as_slice() else {
        return Err(anyhow!("type-add requires a name and an interval in months"));
    };
    let months: i64 = months
        .trim()
        .parse()
        .with_context(|| format!("invalid interval in months: {months}"))?;

    let mut vaccine = VaccineType::new(name.trim().to_string(), months)?;
    vaccine.code = code;
    let id = vaccine.id;
    let name = vaccine.name.clone();
    store.add_type(vaccine)?;

    println!("Added vaccine type {name} ({}).", &id.simple().to_string()[..8]);
    Ok(())
}

#[instrument(skip(store, renderer))]
fn cmd_plans(store: &mut DataStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    info!("command plans");

    let plans = store.load_plans()?;
    let records = store.load_records()?;
    let types = store.load_types()?;
    let by_id = index_types(&types);

    let rows: Vec<PlanRow<'_>> = plans
        .iter()
        .map(|plan| PlanRow {
            plan,
            vaccine: by_id.get(&plan.vaccine_type_id).copied(),
            progress: progress_for(plan, &records),
        })
        .collect();
    renderer.print_plan_table(&rows)
}

#[instrument(skip(store, args, ctx))]
fn cmd_plan_add(store: &mut DataStore, args: &[String], ctx: &Ctx) -> anyhow::Result<()> {
    info!("command plan-add");

    let [name, type_selector, series @ ..] = args else {
        return Err(anyhow!("plan-add requires a name and a vaccine type"));
    };
    let vaccine = store.find_type(type_selector)?;
    let series = series
        .iter()
        .map(|raw| raw.parse::<PlanSeries>())
        .collect::<anyhow::Result<Vec<_>>>()?;

    let plan = ImmunizationPlan::new(name.clone(), &vaccine, series, ctx.now)?;
    let summary = format!(
        "Added plan {} ({}) for {}: {} dose(s).",
        plan.name,
        plan.short_id(),
        vaccine.name,
        plan.required_doses()
    );
    store.add_plan(plan)?;

    println!("{summary}");
    Ok(())
}

/// Resolves `selector` to a plan that covers `vaccine`.
fn linked_plan(
    store: &DataStore,
    selector: &str,
    vaccine: &VaccineType,
) -> anyhow::Result<ImmunizationPlan> {
    let plan = store.find_plan(selector)?;
    plan.ensure_covers(vaccine)?;
    Ok(plan)
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    #[serde(flatten)]
    record: &'a VaccinationRecord,
    vaccine_name: Option<&'a str>,
    plan_name: Option<&'a str>,
    status: DueStatus,
}

#[instrument(skip(store, ctx))]
fn cmd_export(store: &mut DataStore, ctx: &Ctx) -> anyhow::Result<()> {
    info!("command export");

    let records = store.load_records()?;
    let types = store.load_types()?;
    let plans = store.load_plans()?;
    let by_id = index_types(&types);
    let plan_names: HashMap<Uuid, &str> = plans
        .iter()
        .map(|plan| (plan.id, plan.name.as_str()))
        .collect();

    let rows: Vec<ExportRow<'_>> = records
        .iter()
        .map(|record| ExportRow {
            record,
            vaccine_name: by_id.get(&record.vaccine_type_id).map(|vt| vt.name.as_str()),
            plan_name: record.plan_id.and_then(|id| plan_names.get(&id).copied()),
            status: record.status(ctx.today, &ctx.thresholds),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    for (key, value) in cfg.entries() {
        println!("{key} = {value}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("Usage: boosters [options] [id] <command> [args]");
    println!();
    println!("Commands:");
    println!("  dashboard                         summary of due boosters (default)");
    println!("  list [status...] [type:NAME]      records, most urgent first");
    println!("  info <id>                         one record in detail");
    println!("  add <type> <date> [dose:N] [plan:NAME] [notes:TEXT]");
    println!("  <id> modify [type:] [date:] [dose:] [plan:] [notes:]");
    println!("  delete <id>...");
    println!("  types                             vaccine type catalog");
    println!("  type-add <name> <months> [code:X] add a vaccine type (0 = no booster)");
    println!("  plans                             immunization plans and dose progress");
    println!("  plan-add <name> <type> [SERIES:DOSES...]");
    println!("  export                            records as JSON");
    println!("  show                              effective configuration");
    println!();
    println!("Statuses: overdue, due-soon, upcoming, up-to-date, no-date");
    println!("Dates: YYYY-MM-DD, RFC3339, today, yesterday, -Nd, -Nw, -Nm");
    println!("Options: -v/-q, --set KEY=VALUE, --config FILE, --data DIR");
    Ok(())
}

/// Key-prefixed arguments shared by `add` and `modify`. For the optional
/// fields an inner `None` means "clear".
#[derive(Debug, Default, PartialEq, Eq)]
struct RecordArgs {
    vaccine: Option<String>,
    date: Option<NaiveDate>,
    dose: Option<Option<u32>>,
    plan: Option<Option<String>>,
    notes: Option<Option<String>>,
    positional: Vec<String>,
}

impl RecordArgs {
    fn parse(args: &[String], today: NaiveDate) -> anyhow::Result<Self> {
        let mut out = Self::default();
        for arg in args {
            let Some((key, value)) = arg.split_once(':') else {
                out.positional.push(arg.clone());
                continue;
            };
            let value = value.trim();
            match key {
                "type" | "vaccine" => out.vaccine = Some(value.to_string()),
                "date" | "on" => out.date = Some(parse_date_expr(value, today)?),
                "dose" => {
                    out.dose = Some(if value.is_empty() {
                        None
                    } else {
                        let raw: i64 = value
                            .parse()
                            .with_context(|| format!("invalid dose number: {value}"))?;
                        Some(validate_dose_order(raw)?)
                    });
                }
                "plan" => {
                    out.plan = Some(Some(value.to_string()).filter(|v| !v.is_empty()));
                }
                "notes" | "note" => {
                    out.notes = Some(Some(value.to_string()).filter(|v| !v.is_empty()));
                }
                _ => out.positional.push(arg.clone()),
            }
        }
        Ok(out)
    }

    fn is_empty(&self) -> bool {
        self.vaccine.is_none()
            && self.date.is_none()
            && self.dose.is_none()
            && self.plan.is_none()
            && self.notes.is_none()
    }
}

#[derive(Debug, Default)]
struct ListFilter {
    statuses: BTreeSet<&'static str>,
    vaccine_type: Option<Uuid>,
}

impl ListFilter {
    fn parse(store: &DataStore, args: &[String]) -> anyhow::Result<Self> {
        let mut filter = Self::default();
        for arg in args {
            if let Some(selector) = arg
                .strip_prefix("type:")
                .or_else(|| arg.strip_prefix("vaccine:"))
            {
                filter.vaccine_type = Some(store.find_type(selector)?.id);
                continue;
            }
            let raw = arg.strip_prefix("status:").unwrap_or(arg);
            let status: DueStatus = raw.parse()?;
            filter.statuses.insert(status.as_str());
        }
        Ok(filter)
    }

    fn matches(&self, view: &RecordView<'_>) -> bool {
        let status_ok = self.statuses.is_empty() || self.statuses.contains(view.status.as_str());
        let type_ok = self
            .vaccine_type
            .is_none_or(|id| view.record.vaccine_type_id == id);
        status_ok && type_ok
    }
}

fn index_types(types: &[VaccineType]) -> HashMap<Uuid, &VaccineType> {
    types.iter().map(|vt| (vt.id, vt)).collect()
}

fn views<'a>(
    records: &'a [VaccinationRecord],
    by_id: &HashMap<Uuid, &'a VaccineType>,
    ctx: &Ctx,
) -> Vec<RecordView<'a>> {
    records
        .iter()
        .map(|record| RecordView {
            record,
            vaccine: by_id.get(&record.vaccine_type_id).copied(),
            status: record.status(ctx.today, &ctx.thresholds),
        })
        .collect()
}

fn sort_by_priority(rows: &mut [RecordView<'_>]) {
    rows.sort_by(|a, b| {
        a.status
            .priority()
            .cmp(&b.status.priority())
            .then_with(|| a.record.next_due_date.cmp(&b.record.next_due_date))
            .then_with(|| b.record.administered_on.cmp(&a.record.administered_on))
    });
}

fn no_arguments(inv: &Invocation) -> anyhow::Result<()> {
    if inv.selectors.is_empty() && inv.command_args.is_empty() {
        return Ok(());
    }
    let extra: Vec<&str> = inv
        .selectors
        .iter()
        .chain(inv.command_args.iter())
        .map(String::as_str)
        .collect();
    Err(anyhow!(
        "{} takes no arguments, got: {}",
        inv.command,
        extra.join(" ")
    ))
}

fn single_selector(inv: &Invocation) -> anyhow::Result<String> {
    let mut candidates = inv.selectors.iter().chain(inv.command_args.iter());
    let selector = candidates
        .next()
        .ok_or_else(|| anyhow!("{} requires a record id", inv.command))?;
    if candidates.next().is_some() {
        return Err(anyhow!("{} takes exactly one record id", inv.command));
    }
    Ok(selector.clone())
}

fn selector_and_rest(inv: &Invocation) -> anyhow::Result<(String, &[String])> {
    match inv.selectors.as_slice() {
        [single] => Ok((single.clone(), inv.command_args.as_slice())),
        [] => {
            let (first, rest) = inv
                .command_args
                .split_first()
                .ok_or_else(|| anyhow!("{} requires a record id", inv.command))?;
            Ok((first.clone(), rest))
        }
        _ => Err(anyhow!("{} takes exactly one record id", inv.command)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{RecordArgs, expand_command_abbrev, known_command_names, no_arguments};
    use crate::cli::Invocation;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid date")
    }

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn abbreviations_must_be_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("dash", &known), Some("dashboard"));
        assert_eq!(expand_command_abbrev("type", &known), None);
        assert_eq!(expand_command_abbrev("types", &known), Some("types"));
        assert_eq!(expand_command_abbrev("d", &known), None);
        assert_eq!(expand_command_abbrev("plan", &known), None);
        assert_eq!(expand_command_abbrev("plans", &known), Some("plans"));
    }

    #[test]
    fn two_letter_prefixes_do_not_expand() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("ad", &known), None);
        assert_eq!(expand_command_abbrev("da", &known), None);
        assert_eq!(expand_command_abbrev("add", &known), Some("add"));
        assert_eq!(expand_command_abbrev("das", &known), Some("dashboard"));
    }

    #[test]
    fn argument_free_commands_reject_extras() {
        let bare = Invocation {
            selectors: vec![],
            command: "dashboard".to_string(),
            command_args: vec![],
        };
        assert!(no_arguments(&bare).is_ok());

        let with_selector = Invocation {
            selectors: strings(&["ad12"]),
            ..bare.clone()
        };
        let err = no_arguments(&with_selector).expect_err("extra selector");
        assert!(err.to_string().contains("ad12"));

        let with_args = Invocation {
            command_args: strings(&["overdue"]),
            ..bare
        };
        assert!(no_arguments(&with_args).is_err());
    }

    #[test]
    fn plan_key_links_and_clears() {
        let parsed = RecordArgs::parse(&strings(&["plan:Tetanus basic"]), today()).expect("parse");
        assert_eq!(parsed.plan, Some(Some("Tetanus basic".to_string())));
        assert!(!parsed.is_empty());

        let cleared = RecordArgs::parse(&strings(&["plan:"]), today()).expect("parse");
        assert_eq!(cleared.plan, Some(None));
    }

    #[test]
    fn record_args_split_keys_and_positionals() {
        let parsed = RecordArgs::parse(
            &strings(&["Influenza", "date:2024-06-01", "dose:2", "notes:left arm"]),
            today(),
        )
        .expect("parse args");
        assert_eq!(parsed.positional, strings(&["Influenza"]));
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(parsed.dose, Some(Some(2)));
        assert_eq!(parsed.notes, Some(Some("left arm".to_string())));
    }

    #[test]
    fn empty_values_clear_optional_fields() {
        let parsed = RecordArgs::parse(&strings(&["dose:", "notes:"]), today()).expect("parse args");
        assert_eq!(parsed.dose, Some(None));
        assert_eq!(parsed.notes, Some(None));
        assert!(!parsed.is_empty());
    }

    #[test]
    fn rejects_zero_dose() {
        assert!(RecordArgs::parse(&strings(&["dose:0"]), today()).is_err());
    }
}
