//! desk-runner: headless runner for the civic complaint lifecycle engine.
//!
//! Usage:
//!   desk-runner --db desk.db --seed-demo --once
//!   desk-runner --db desk.db --config config.json --watch

use anyhow::Result;
use civicdesk_core::{
    clock::SystemClock,
    complaint::{ComplaintCategory, ComplaintDraft, Location, Priority},
    config::EngineConfig,
    engine::LifecycleEngine,
    notify::LogNotifier,
    scheduler::EscalationScheduler,
    staff::{Profession, StaffProfile},
    store::DeskStore,
};
use std::env;
use std::io::{self, BufRead};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = str_arg(&args, "--db", ":memory:");
    let config_path = args
        .windows(2)
        .find(|w| w[0] == "--config")
        .map(|w| w[1].as_str());
    let watch = args.iter().any(|a| a == "--watch");
    let seed_demo = args.iter().any(|a| a == "--seed-demo");

    let mut config = match config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(secs) = opt_arg::<u64>(&args, "--interval-secs") {
        config.scan_interval_secs = secs;
    }

    // For :memory: use a shared-cache URI so a second connection (the
    // scheduler's) sees the same database.
    let db_effective: String = if db == ":memory:" {
        format!("file:deskrun_{}?mode=memory&cache=shared", unix_now())
    } else {
        db.to_string()
    };
    let store = DeskStore::open(&db_effective)?;
    store.migrate()?;

    let engine = LifecycleEngine::new(
        store,
        config.clone(),
        Arc::new(SystemClock),
        Arc::new(LogNotifier),
    );

    if seed_demo {
        seed_demo_data(&engine)?;
    }

    if watch {
        let scheduler_store = engine.store().reopen()?;
        let scheduler_engine = LifecycleEngine::new(
            scheduler_store,
            config.clone(),
            Arc::new(SystemClock),
            Arc::new(LogNotifier),
        );
        let interval = Duration::from_secs(config.scan_interval_secs);
        let scheduler = EscalationScheduler::start(scheduler_engine, interval);
        println!(
            "watching — escalation scan every {}s; type 'quit' (or EOF) to stop",
            config.scan_interval_secs
        );

        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = line?;
            if line.trim() == "quit" {
                break;
            }
        }
        scheduler.stop();
    } else {
        let report = engine.run_escalation_cycle()?;
        if args.iter().any(|a| a == "--report-json") {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            println!("=== CYCLE REPORT ===");
            println!("  scanned:   {}", report.scanned);
            println!("  escalated: {}", report.escalated);
            println!("  warned:    {}", report.warned);
            println!("  failed:    {}", report.failed);
        }
    }

    print_summary(&engine)?;
    Ok(())
}

/// A small cross-city dataset exercising the matcher and the SLA bands.
fn seed_demo_data(engine: &LifecycleEngine) -> Result<()> {
    let staff = [
        ("staff-wv-plumber", "Mara Voss", Profession::Plumber, "Wondervale"),
        ("staff-wv-electrician", "Elio Brandt", Profession::Electrician, "Wondervale"),
        ("staff-wv-cleaner", "Sami Okafor", Profession::Cleaner, "Wondervale"),
        ("staff-nb-mechanic", "Petra Juhl", Profession::Mechanic, "Northbay"),
    ];
    for (id, name, profession, city) in staff {
        engine.store().insert_staff(&StaffProfile {
            staff_id: id.to_string(),
            full_name: name.to_string(),
            profession,
            city: city.to_string(),
        })?;
    }

    let drafts = [
        ("Burst main on Elm Street", ComplaintCategory::WaterLeakage, "Wondervale", Priority::High),
        ("Street lights dark since Monday", ComplaintCategory::PowerOutage, "Wondervale", Priority::Medium),
        ("Overflowing bins at the market", ComplaintCategory::Garbage, "Wondervale", Priority::Low),
        ("Stalled truck blocking the bridge", ComplaintCategory::AbandonedVehicle, "Northbay", Priority::High),
        ("Graffiti on the library wall", ComplaintCategory::Graffiti, "Northbay", Priority::Low),
    ];
    for (title, category, city, priority) in drafts {
        let complaint = engine.create_and_maybe_assign(ComplaintDraft {
            title: title.to_string(),
            description: format!("{title} — reported via desk-runner demo seed"),
            category,
            priority: Some(priority),
            reporter_id: Some("demo-reporter".to_string()),
            location: Location::city(city),
            sla_hours: None,
        })?;
        println!(
            "seeded {} [{}] -> {} (assigned: {})",
            complaint.complaint_id,
            complaint.category,
            complaint.status,
            complaint.assigned_to.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn print_summary(engine: &LifecycleEngine) -> Result<()> {
    let store = engine.store();
    println!("=== DESK SUMMARY ===");
    println!("  total:       {}", store.complaint_count()?);
    for status in ["OPEN", "IN_PROGRESS", "ESCALATED", "RESOLVED"] {
        println!("  {:<12} {}", format!("{status}:"), store.count_by_status(status)?);
    }
    Ok(())
}

fn str_arg<'a>(args: &'a [String], flag: &str, default: &'a str) -> &'a str {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .unwrap_or(default)
}

fn opt_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
}

fn unix_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
