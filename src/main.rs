use orrery::{Counter, DevsResult, ExperimentBuilder, Janitor, Storage, Value};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("═══════════════════════════════════════════════════════");
    println!("  Orrery — DEVS Simulation Kernel");
    println!("  Structural dynamics demo");
    println!("═══════════════════════════════════════════════════════");
    println!();

    if let Err(e) = run() {
        eprintln!("  ✗ simulation failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> DevsResult<()> {
    // Two generators feed a counter. At T=5 the janitor deletes the
    // fast one and hangs a second counter off the slow one.
    let root = ExperimentBuilder::new("top")
        .name("swap")
        .with_builtins()
        .duration(10.0)
        .condition("slow", &[("period", Value::Double(1.0))])
        .condition("fast", &[("period", Value::Double(0.25))])
        .condition(
            "swap",
            &[
                ("at", Value::Double(5.0)),
                ("delete", "burst".into()),
                ("create", "late".into()),
                ("dynamics", "counter".into()),
                ("connect", "gen".into()),
            ],
        )
        .observable("counted", "count", &["counts", "totals"])
        .timed_view("counts", 1.0)
        .finish_view("totals")
        .atomic("top", "gen", &[], &["out"], "beep", &["slow"])
        .atomic("top", "burst", &[], &["out"], "beep", &["fast"])
        .atomic_node(
            "top",
            "sink",
            &["in"],
            &[],
            orrery::AtomicNode::new("counter").with_observable("counted"),
        )
        .atomic("top", "janitor", &[], &[], "janitor", &["swap"])
        .connect("top:gen", "out", "top:sink", "in")
        .connect("top:burst", "out", "top:sink", "in")
        .run()?;

    let coordinator = root.coordinator();

    // ── Trace ─────────────────────────────────────────────────
    println!("  {} steps, ended at {}", root.steps(), root.current_time());
    for entry in coordinator.trace.iter().take(12) {
        println!("    {}", entry);
    }
    if coordinator.trace.len() > 12 {
        println!("    … {} more dispatches", coordinator.trace.len() - 12);
    }
    println!();

    // ── Views ─────────────────────────────────────────────────
    if let Some(counts) = coordinator.output::<Storage>("counts") {
        println!("  counts (timed, step 1):");
        for (time, value) in counts.column("top:sink.count") {
            println!("    {:<6} {:?}", time.to_string(), value);
        }
    }
    if let Some(totals) = coordinator.output::<Storage>("totals") {
        for row in totals.rows() {
            println!("  totals (finish): {:?}", row.get("top:sink.count"));
        }
    }
    println!();

    if let Some(counter) = coordinator.dynamics::<Counter>("top:sink") {
        println!("  sink received {} events", counter.count);
    }
    if let Some(late) = coordinator.dynamics::<Counter>("top:late") {
        println!("  late received {} events", late.count);
    }
    if let Some(janitor) = coordinator.executive::<Janitor>("top:janitor") {
        println!("  janitor fired at {:?}, siblings {:?}", janitor.fired_at, janitor.siblings);
    }
    println!();
    println!("  ✓ Demo complete.");
    Ok(())
}
