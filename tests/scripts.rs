//! Full-pipeline script tests: source text in, scheduler state and metrics
//! snapshots out.

use rand::rngs::SmallRng;
use rand::SeedableRng;

use simsched::{
    interpret, metrics, Fcfs, MetricsTracker, PolicyKind, RoundRobin, Scheduler, ScriptError,
    DEFAULT_QUANTUM,
};

fn run_to_completion(scheduler: &mut Scheduler, script: &str, seed: u64) -> MetricsTracker {
    let mut rng = SmallRng::seed_from_u64(seed);
    interpret(script, scheduler, &mut rng).expect("script evaluates");

    let mut tracker = MetricsTracker::new();
    while !scheduler.complete() {
        scheduler.step();
        tracker.observe(scheduler);
    }
    tracker
}

#[test]
fn test_minimal_program_snapshot() {
    let mut scheduler = Scheduler::new(1, Box::new(Fcfs));
    let tracker = run_to_completion(
        &mut scheduler,
        r#"spawn_process("A", 1, 0, [(Cpu, 3), (Io, 2), (Cpu, 4)])"#,
        42,
    );

    // CPU ticks 1..=3, IO ticks 4..=5, then the second CPU burst is
    // installed at tick 5 and ticks through 6..=9.
    assert_eq!(scheduler.finished.len(), 1);
    assert_eq!(scheduler.finished[0].start_time, Some(0));
    assert_eq!(scheduler.finished[0].finish_time, Some(9));

    let rendered = metrics::snapshot(&scheduler, &tracker);
    assert!(rendered.starts_with("timer = 10\n"));
    assert!(rendered.contains("schedule_policy = First Come First Served\n"));
    assert!(rendered.contains("\nseparator\n"));
    assert!(rendered.contains("avg_waiting_time = 0\n"));
    assert!(rendered.contains("avg_turnaround_time = 9\n"));
}

#[test]
fn test_configured_random_program_terminates() {
    let script = "max_processes :: 50\n\
                  max_arrival_time :: 20\n\
                  max_single_event_duration :: 8\n\
                  max_events_per_process :: 6\n\
                  for 0..10 {\n\
                      spawn_random_process()\n\
                  }";
    let mut scheduler = Scheduler::new(4, PolicyKind::RoundRobin.build(DEFAULT_QUANTUM));
    run_to_completion(&mut scheduler, script, 7);

    assert_eq!(scheduler.finished.len() + scheduler.dropped_count, 10);
    assert!(scheduler.timer > 0);
}

#[test]
fn test_demo_scripts_stay_valid() {
    for source in [
        include_str!("../demos/basic.sl"),
        include_str!("../demos/random.sl"),
    ] {
        let mut scheduler = Scheduler::new(2, Box::new(RoundRobin::default()));
        run_to_completion(&mut scheduler, source, 42);
        assert!(scheduler.complete());
        assert!(!scheduler.finished.is_empty());
    }
}

#[test]
fn test_same_seed_same_metrics() {
    let script = "max_processes :: 30\n\
                  max_arrival_time :: 10\n\
                  max_single_event_duration :: 5\n\
                  max_events_per_process :: 4\n\
                  for 0..8 { spawn_random_process() }";

    let mut first = Scheduler::new(2, Box::new(RoundRobin::default()));
    let first_tracker = run_to_completion(&mut first, script, 1234);
    let mut second = Scheduler::new(2, Box::new(RoundRobin::default()));
    let second_tracker = run_to_completion(&mut second, script, 1234);

    assert_eq!(
        metrics::snapshot(&first, &first_tracker),
        metrics::snapshot(&second, &second_tracker)
    );
}

#[test]
fn test_restart_then_rerun_reproduces_run() {
    let script = r#"spawn_process("A", 1, 0, [(Cpu, 2), (Io, 1), (Cpu, 2)])"#;

    let mut scheduler = Scheduler::new(1, Box::new(RoundRobin::default()));
    run_to_completion(&mut scheduler, script, 42);
    let first_timer = scheduler.timer;

    scheduler.restart();
    assert_eq!(scheduler.timer, 0);
    assert!(scheduler.finished.is_empty());

    // Restart does not replay processes; the driver re-runs the script.
    run_to_completion(&mut scheduler, script, 42);
    assert_eq!(scheduler.timer, first_timer);
}

#[test]
fn test_pipeline_errors_carry_layer_tags() {
    let cases = [
        ("spawn_process(\"A\", 1, 0, [(Cpu; 3)])", "(lexer)"),
        ("spawn_process(\"A\" 1, 0", "(parser)"),
        ("despawn_process()", "(interpreter)"),
    ];

    for (script, tag) in cases {
        let mut scheduler = Scheduler::new(1, Box::new(Fcfs));
        let mut rng = SmallRng::seed_from_u64(42);
        let error = interpret(script, &mut scheduler, &mut rng).unwrap_err();
        let message = error.to_string();
        assert!(
            message.starts_with("[ERROR]") && message.contains(tag),
            "unexpected diagnostic for {script:?}: {message}"
        );
    }
}

#[test]
fn test_failed_script_reports_first_error_only() {
    let mut scheduler = Scheduler::new(1, Box::new(Fcfs));
    let mut rng = SmallRng::seed_from_u64(42);
    let error = interpret(
        "spawn_process(\"A\", 1, 0, [(Cpu, 3)])\nmax_threads :: 4\nspawn_thread()",
        &mut scheduler,
        &mut rng,
    )
    .unwrap_err();

    // The first valid spawn went through before the unknown constant failed.
    assert!(matches!(error, ScriptError::Interp(_)));
    assert!(error.to_string().contains("max_threads"));
    assert_eq!(scheduler.cores[0].arrival.len(), 1);
}
