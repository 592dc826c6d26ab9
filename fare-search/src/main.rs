use std::process::ExitCode;
use std::time::Instant;

use tracing_subscriber::EnvFilter;

use fare_search::catalog::SolutionCatalog;
use fare_search::mock::Scenario;
use fare_search::pricing::{DiagnosticsSink, NullSink, VecSink};
use fare_search::search::{AbortFlag, FareSearch};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fare_search=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("Usage: fare-search <scenario.json> [--trace]");
        return ExitCode::from(2);
    };
    let trace = args.any(|a| a == "--trace");

    let scenario = match Scenario::from_json_file(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };
    let routing = match scenario.routing_data() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Invalid routing data: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let engine = match scenario.engine(&routing) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Invalid fares: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let catalog = SolutionCatalog::standard();
    let oracle = scenario.oracle();
    let search = match FareSearch::new(&catalog, &routing, &oracle, &engine, &scenario.config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to start search: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut policy = scenario.policy();
    let abort = AbortFlag::with_deadline(Instant::now() + scenario.config.request_timeout());
    let mut lines = VecSink::new();
    let mut null = NullSink;
    let diagnostics: &mut dyn DiagnosticsSink = if trace { &mut lines } else { &mut null };

    let outcome = match search.run(policy.as_mut(), &abort, diagnostics) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Search failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for line in &lines.lines {
        println!("# {}", line);
    }
    println!(
        "{:?}: {} solution(s), {} evicted, {} dequeues",
        outcome.status,
        outcome.solutions.len(),
        outcome.evicted.len(),
        outcome.stats.dequeues
    );
    for s in &outcome.solutions {
        let pattern = catalog.pattern(s.pattern).map_or("?", |p| p.name());
        println!(
            "{:>10}  {:<10} {:<12} {:<24} {}",
            s.price.to_string(),
            s.applicability.to_string(),
            s.key.to_string(),
            pattern,
            s.fare_path.fare_bases().join(" + ")
        );
    }
    ExitCode::SUCCESS
}
