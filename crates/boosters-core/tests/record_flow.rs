use boosters_core::datastore::DataStore;
use boosters_core::plan::{ImmunizationPlan, SeriesReason, pending_plans, progress_for};
use boosters_core::record::{RecordDraft, VaccinationRecord, VaccineType};
use boosters_core::stats::aggregate;
use boosters_core::status::DueStatus;
use chrono::{NaiveDate, TimeZone, Utc};
use tempfile::tempdir;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn record_lifecycle_and_dashboard() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");

    let now = Utc
        .with_ymd_and_hms(2024, 6, 15, 9, 0, 0)
        .single()
        .expect("valid now");
    let today = ymd(2024, 6, 15);

    let flu = VaccineType::new("Influenza".to_string(), 12).expect("flu type");
    let mut tetanus = VaccineType::new("Tetanus".to_string(), 120).expect("tetanus type");
    tetanus.code = Some("TD".to_string());
    let measles = VaccineType::new("Measles".to_string(), 0).expect("measles type");
    for vt in [flu.clone(), tetanus.clone(), measles.clone()] {
        store.add_type(vt).expect("add type");
    }
    assert!(store.add_type(VaccineType::new("influenza".to_string(), 6).expect("dup")).is_err());
    assert_eq!(store.find_type("td").expect("by code").id, tetanus.id);

    let draft = |date: NaiveDate| RecordDraft {
        administered_on: date,
        dose_order_claimed: Some(1),
        plan_id: None,
        notes: None,
    };

    // Due 2024-06-10: overdue by five days.
    let overdue = VaccinationRecord::create(draft(ymd(2023, 6, 10)), &flu, today, now).expect("overdue");
    // Due 2024-06-25: ten days out.
    let due_soon = VaccinationRecord::create(draft(ymd(2023, 6, 25)), &flu, today, now).expect("due soon");
    let current = VaccinationRecord::create(draft(ymd(2020, 1, 31)), &tetanus, today, now).expect("current");
    let no_booster = VaccinationRecord::create(draft(ymd(2001, 3, 3)), &measles, today, now).expect("no booster");

    for record in [&overdue, &due_soon, &current, &no_booster] {
        store.add_record(record.clone()).expect("add record");
    }

    let records = store.load_records().expect("load records");
    assert_eq!(records.len(), 4);
    let stats = aggregate(&records, today);
    assert_eq!(stats.overdue_count, 1);
    assert_eq!(stats.due_soon_count, 1);
    assert_eq!(stats.upcoming_count, 0);
    assert_eq!(stats.total_pending, 2);

    let selector = overdue.id.simple().to_string();
    let mut found = store.find_record(&selector[..6]).expect("find by prefix");
    assert_eq!(found.id, overdue.id);

    let mut edit = found.draft();
    edit.administered_on = ymd(2024, 6, 1);
    found.apply_edit(edit, &flu, today, now).expect("edit");
    assert_eq!(found.next_due_date, Some(ymd(2025, 6, 1)));
    store.update_record(found.clone()).expect("update record");

    let reloaded = store.find_record(&selector).expect("reload");
    assert_eq!(reloaded.next_due_date, Some(ymd(2025, 6, 1)));
    assert_eq!(
        boosters_core::classify(reloaded.next_due_date, today),
        DueStatus::UpToDate
    );

    store.delete_record(no_booster.id).expect("delete record");
    assert_eq!(store.load_records().expect("load records").len(), 3);
    assert!(store.find_record(&no_booster.id.to_string()).is_err());
}

#[test]
fn plan_progress_over_stored_records() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let now = Utc
        .with_ymd_and_hms(2024, 6, 15, 9, 0, 0)
        .single()
        .expect("valid now");
    let today = ymd(2024, 6, 15);

    let tetanus = VaccineType::new("Tetanus".to_string(), 120).expect("tetanus type");
    let flu = VaccineType::new("Influenza".to_string(), 12).expect("flu type");
    store.add_type(tetanus.clone()).expect("add type");
    store.add_type(flu.clone()).expect("add type");

    let plan = ImmunizationPlan::new(
        "Tetanus basic".to_string(),
        &tetanus,
        vec!["primary:3".parse().expect("series"), "booster:1".parse().expect("series")],
        now,
    )
    .expect("plan");
    store.add_plan(plan.clone()).expect("add plan");
    assert!(store.add_plan(plan.clone()).is_err());
    assert_eq!(store.find_plan("tetanus BASIC").expect("by name").id, plan.id);
    assert_eq!(store.find_plan(&plan.short_id()).expect("by id").id, plan.id);
    assert!(store.find_plan("Hepatitis").is_err());
    assert!(store.find_plan("Tetanus basic").expect("plan").ensure_covers(&flu).is_err());

    for (month, dose) in [(1, 1), (3, 2)] {
        let draft = RecordDraft {
            administered_on: ymd(2024, month, 10),
            dose_order_claimed: Some(dose),
            plan_id: Some(plan.id),
            notes: None,
        };
        let record = VaccinationRecord::create(draft, &tetanus, today, now).expect("record");
        store.add_record(record).expect("add record");
    }

    let records = store.load_records().expect("load records");
    let plans = store.load_plans().expect("load plans");
    let progress = progress_for(&plans[0], &records);
    assert_eq!(progress.completed_doses, 2);
    assert_eq!(progress.missing_doses, 2);
    assert_eq!(progress.reason, SeriesReason::Continuing);

    let pending = pending_plans(&plans, &records);
    assert_eq!(pending, vec![progress]);
}
