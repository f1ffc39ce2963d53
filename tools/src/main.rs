//! mes-runner: headless runner for the MES planning engine.
//!
//! Usage:
//!   mes-runner --seed 12345 --date 2025-03-10 --db plant.db
//!   mes-runner --db plant.db --ipc-mode

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use mes_core::{
    capacity::LoadLevel,
    command::PlannerCommand,
    demo::{seed_demo_plant, DemoPlan},
    engine::MesEngine,
    planner::{CalendarWindow, Granularity},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    GetCapacity {
        date: NaiveDate,
    },
    GetPlanner {
        date: NaiveDate,
        #[serde(default)]
        granularity: Granularity,
    },
    GetBacklog,
    GetViolations {
        start: NaiveDate,
        end: NaiveDate,
    },
    Trace {
        serial_number: String,
    },
    Search {
        term: String,
    },
    Command {
        command: PlannerCommand,
    },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let operators = parse_arg(&args, "--operators", DemoPlan::default().operators);
    let orders = parse_arg(&args, "--orders", DemoPlan::default().work_orders);
    let date = parse_arg(&args, "--date", Utc::now().date_naive());
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = string_arg(&args, "--db", ":memory:");
    let data_dir = string_arg(&args, "--data-dir", "./data");

    let engine = MesEngine::build(db, data_dir)?;

    if ipc_mode {
        return run_ipc_loop(&engine);
    }

    println!("MES planner, mes-runner");
    println!("  seed:      {seed}");
    println!("  date:      {date}");
    println!("  db:        {db}");
    println!("  data_dir:  {data_dir}");
    println!();

    let summary = seed_demo_plant(
        &engine,
        seed,
        date,
        DemoPlan {
            operators,
            work_orders: orders,
        },
    )?;
    println!("=== DEMO PLANT ===");
    println!("  operators:      {}", summary.operators);
    println!("  absences:       {}", summary.absences);
    println!("  work orders:    {}", summary.work_orders);
    println!("  scheduled:      {}", summary.scheduled);
    println!("  assigned:       {}", summary.assigned);
    println!("  rejected:       {}", summary.rejected);
    println!();

    print_summary(&engine, date)
}

fn run_ipc_loop(engine: &MesEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        if handle.read_line(&mut buffer)? == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let request: IpcRequest = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };
        if matches!(request, IpcRequest::Quit) {
            break;
        }

        let reply = match handle_request(engine, request) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("IPC request failed: {e}");
                serde_json::json!({ "error": e.to_string() })
            }
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_request(engine: &MesEngine, request: IpcRequest) -> Result<serde_json::Value> {
    let value = match request {
        IpcRequest::GetCapacity { date } => {
            serde_json::to_value(engine.capacity().capacity_for_date(date, None)?)?
        }
        IpcRequest::GetPlanner { date, granularity } => {
            let window = CalendarWindow::around(date, granularity);
            serde_json::to_value(engine.planner().view(window)?)?
        }
        IpcRequest::GetBacklog => serde_json::to_value(engine.planner().unscheduled_backlog()?)?,
        IpcRequest::GetViolations { start, end } => {
            serde_json::to_value(engine.capacity().violations(start, end)?)?
        }
        IpcRequest::Trace { serial_number } => {
            serde_json::to_value(engine.genealogy().trace_serial(&serial_number)?)?
        }
        IpcRequest::Search { term } => serde_json::to_value(engine.genealogy().search(&term)?)?,
        IpcRequest::Command { command } => serde_json::to_value(engine.apply(command)?)?,
        IpcRequest::Quit => serde_json::Value::Null,
    };
    Ok(value)
}

fn print_summary(engine: &MesEngine, date: NaiveDate) -> Result<()> {
    let capacity = engine.capacity().capacity_for_date(date, None)?;
    println!("=== CAPACITY {date} ===");
    for c in &capacity {
        let load = match c.load {
            LoadLevel::Free => "free",
            LoadLevel::Normal => "normal",
            LoadLevel::Overbooked => "OVERBOOKED",
        };
        let status = if c.is_unavailable() { "unavailable" } else { "available" };
        println!(
            "  {:<24} {:>4.1}h  {:<11}  {:>2} assignments  {load}",
            c.display_name, c.hours_available, status, c.assignment_count
        );
    }

    let window = CalendarWindow::around(date, Granularity::Week);
    let view = engine.planner().view(window)?;
    println!();
    println!("=== WEEK {} .. {} ===", window.start, window.end);
    for day in &view.days {
        let absent = day.capacity.iter().filter(|c| c.is_unavailable()).count();
        println!(
            "  {}  {:>3} orders active  {:>2} operators out",
            day.date,
            day.work_orders.len(),
            absent
        );
    }

    let month = CalendarWindow::around(date, Granularity::Month);
    let violations = engine.capacity().violations(month.start, month.end)?;
    println!();
    println!("  capacity violations this month: {}", violations.len());

    let backlog = engine.planner().unscheduled_backlog()?;
    println!();
    println!("=== BACKLOG ({}) ===", backlog.len());
    for wo in backlog.iter().take(10) {
        let ship = wo
            .ship_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "no ship date".into());
        println!("  {:<10} {:<18} x{:<3} {ship}", wo.order_number, wo.product_type, wo.quantity);
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str, default: &'a str) -> &'a str {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .unwrap_or(default)
}
