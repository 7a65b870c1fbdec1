//! V2G facility simulator entry point — CLI wiring and config-driven engine
//! construction.

use std::path::Path;
use std::process;

use v2g_sim::config::ScenarioConfig;
use v2g_sim::io::export::export_csv;
use v2g_sim::sim::booking::BookingRequest;
use v2g_sim::sim::engine::Engine;
use v2g_sim::sim::types::TickReport;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    telemetry_out: Option<String>,
}

fn print_help() {
    eprintln!("v2g-sim — V2G charging facility slot scheduling simulator");
    eprintln!();
    eprintln!("Usage: v2g-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!("  --preset <name>          Use a built-in preset (baseline)");
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --telemetry-out <path>   Export per-slot tick results to CSV");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        telemetry_out: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --scenario requires a path argument");
                    process::exit(1);
                }
                cli.scenario_path = Some(args[i].clone());
            }
            "--preset" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --preset requires a name argument");
                    process::exit(1);
                }
                cli.preset = Some(args[i].clone());
            }
            "--seed" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --seed requires a u64 argument");
                    process::exit(1);
                }
                if let Ok(s) = args[i].parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{}\" is not a valid u64", args[i]);
                    process::exit(1);
                }
            }
            "--telemetry-out" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --telemetry-out requires a path argument");
                    process::exit(1);
                }
                cli.telemetry_out = Some(args[i].clone());
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Seeds a demo day: two reservations and one walk-in from the configured
/// customer roster. Skipped silently for rosters too small to cover it.
fn seed_demo_sessions(engine: &mut Engine) {
    let ids: Vec<String> = engine.customers().iter().map(|c| c.id.clone()).collect();

    if let Some(id) = ids.first() {
        let result = engine.request_booking(BookingRequest {
            customer_id: id.clone(),
            slot_id: 3,
            start: 2,
            duration: 20,
            grid_support: true,
            departure_tick: None,
        });
        if let Err(e) = result {
            tracing::warn!(%e, "demo booking rejected");
        }
    }
    if let Some(id) = ids.get(1) {
        let result = engine.request_booking(BookingRequest {
            customer_id: id.clone(),
            slot_id: 1,
            start: 0,
            duration: 9,
            grid_support: false,
            departure_tick: None,
        });
        if let Err(e) = result {
            tracing::warn!(%e, "demo booking rejected");
        }
    }
    if let Some(id) = ids.get(2) {
        if let Err(e) = engine.occupy_walk_in(5, id, true, Some(20)) {
            tracing::warn!(%e, "demo walk-in rejected");
        }
    }
}

/// Runs every configured tick and returns the committed reports.
fn run_simulation(scenario: &ScenarioConfig) -> (Vec<TickReport>, Engine) {
    let mut engine = scenario.build_engine();
    seed_demo_sessions(&mut engine);
    let reports = engine.run();
    (reports, engine)
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let cli = parse_args();

    // Load config: --scenario takes priority, then --preset, then baseline default
    let mut scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::baseline()
    };

    // Apply seed override
    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }

    // Validate
    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    // Build and run
    let (reports, engine) = run_simulation(&scenario);

    // Print per-tick results
    for report in &reports {
        println!("{report}");
    }

    // Print facility analytics and customer totals
    println!("\n{}", engine.analytics_snapshot());
    println!("\n--- Customer Savings ---");
    for customer in engine.customers() {
        println!(
            "{}  {:<20} {:>9.2}",
            customer.id, customer.name, customer.total_savings
        );
    }

    // Export CSV if requested
    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&reports, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Telemetry written to {path}");
    }
}
