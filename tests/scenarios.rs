//! End-to-end scheduling scenarios with exact expected timings.
//!
//! Each test scripts a small workload, steps the simulation to completion and
//! checks clock values, timestamps and aggregate metrics.

use rand::rngs::SmallRng;
use rand::SeedableRng;

use simsched::{interpret, Fcfs, Pid, PolicyKind, RoundRobin, Scheduler};

fn run_script(scheduler: &mut Scheduler, script: &str) {
    let mut rng = SmallRng::seed_from_u64(42);
    interpret(script, scheduler, &mut rng).expect("script evaluates");
}

fn step_to_completion(scheduler: &mut Scheduler) {
    while !scheduler.complete() {
        scheduler.step();
    }
}

/// A single CPU-only process on one core finishes after its burst length.
#[test]
fn test_single_cpu_process() {
    let mut scheduler = Scheduler::new(1, Box::new(Fcfs));
    run_script(&mut scheduler, r#"spawn_process("A", 1, 0, [(Cpu, 3)])"#);

    step_to_completion(&mut scheduler);

    assert_eq!(scheduler.timer, 4);
    assert_eq!(scheduler.finished.len(), 1);
    assert_eq!(scheduler.finished[0].start_time, Some(0));
    assert_eq!(scheduler.finished[0].finish_time, Some(3));
    assert_eq!(scheduler.average_waiting_time(), 0);
    assert_eq!(scheduler.average_turnaround_time(), 3);
}

/// CPU-IO-CPU on one core: the core sits idle while the process waits on IO.
#[test]
fn test_cpu_io_cpu_process() {
    let mut scheduler = Scheduler::new(1, Box::new(Fcfs));
    run_script(
        &mut scheduler,
        r#"spawn_process("B", 2, 0, [(Cpu, 2), (Io, 2), (Cpu, 1)])"#,
    );

    let mut running_during_io_phase = false;
    while !scheduler.complete() {
        scheduler.step();
        // Ticks 2 and 3 are the IO phase; the running slot must stay empty.
        if scheduler.timer == 3 || scheduler.timer == 4 {
            running_during_io_phase |= scheduler.cores[0].running.is_some();
        }
    }

    assert!(!running_during_io_phase);
    assert_eq!(scheduler.timer, 6);
    assert_eq!(scheduler.average_waiting_time(), 0);
    assert_eq!(scheduler.average_turnaround_time(), 5);
}

/// Round Robin with quantum 2 interleaves two CPU-bound processes, giving
/// each exactly its scripted CPU time.
#[test]
fn test_round_robin_preemption() {
    let mut scheduler = Scheduler::new(1, Box::new(RoundRobin::new(2)));
    run_script(
        &mut scheduler,
        "spawn_process(\"X\", 1, 0, [(Cpu, 5)])\n\
         spawn_process(\"Y\", 2, 0, [(Cpu, 5)])",
    );

    let mut observed = Vec::new();
    while !scheduler.complete() {
        scheduler.step();
        if let Some(running) = &scheduler.cores[0].running {
            observed.push(running.pid.0);
        }
    }

    assert_eq!(observed, vec![1, 1, 2, 2, 1, 1, 2, 2, 1, 2]);
    assert_eq!(scheduler.timer, 11);
    assert_eq!(scheduler.finished.len(), 2);

    // Each process got exactly its 5 CPU ticks: X ran during ticks
    // 1,2,5,6,9 and Y during 3,4,7,8,10.
    let x = scheduler.finished.iter().find(|p| p.pid == Pid(1)).unwrap();
    let y = scheduler.finished.iter().find(|p| p.pid == Pid(2)).unwrap();
    assert_eq!(x.finish_time, Some(9));
    assert_eq!(y.finish_time, Some(10));
    assert_eq!(scheduler.average_waiting_time(), 0);
}

/// A process arriving mid-run waits for the core and picks up where FCFS
/// leaves off.
#[test]
fn test_arrival_after_start() {
    let mut scheduler = Scheduler::new(1, Box::new(Fcfs));
    run_script(
        &mut scheduler,
        "spawn_process(\"A\", 1, 0, [(Cpu, 3)])\n\
         spawn_process(\"B\", 2, 2, [(Cpu, 2)])",
    );

    step_to_completion(&mut scheduler);

    let a = scheduler.finished.iter().find(|p| p.pid == Pid(1)).unwrap();
    let b = scheduler.finished.iter().find(|p| p.pid == Pid(2)).unwrap();
    assert_eq!(a.finish_time, Some(3));
    assert_eq!(b.finish_time, Some(5));
    assert_eq!(scheduler.average_waiting_time(), 0);
}

/// With two cores, admission round-robins the processes and they run in
/// parallel.
#[test]
fn test_multi_core_admission() {
    let mut scheduler = Scheduler::new(2, Box::new(RoundRobin::new(3)));
    run_script(
        &mut scheduler,
        "spawn_process(\"A\", 1, 0, [(Cpu, 4)])\n\
         spawn_process(\"B\", 2, 0, [(Cpu, 4)])",
    );

    step_to_completion(&mut scheduler);

    assert_eq!(scheduler.finished.len(), 2);
    for process in &scheduler.finished {
        assert_eq!(process.finish_time, Some(4));
    }
    assert!(scheduler.throughput >= 0.5);
}

/// A duplicate pid is rejected at admission; the first process survives.
#[test]
fn test_duplicate_pid_is_dropped() {
    let mut scheduler = Scheduler::new(1, Box::new(Fcfs));
    run_script(
        &mut scheduler,
        "spawn_process(\"A\", 1, 0, [(Cpu, 1)])\n\
         spawn_process(\"B\", 1, 0, [(Cpu, 1)])",
    );

    step_to_completion(&mut scheduler);

    assert_eq!(scheduler.finished.len(), 1);
    assert_eq!(scheduler.finished[0].name, "A");
    assert_eq!(scheduler.dropped_count, 1);
}

/// The default policy built from the CLI picker behaves like Round Robin
/// with the default quantum.
#[test]
fn test_policy_kind_builds_working_policy() {
    let mut scheduler = Scheduler::new(1, PolicyKind::RoundRobin.build(5));
    run_script(&mut scheduler, r#"spawn_process("A", 1, 0, [(Cpu, 12)])"#);

    step_to_completion(&mut scheduler);

    assert_eq!(scheduler.policy_name(), "Round Robin");
    assert_eq!(scheduler.finished[0].finish_time, Some(12));
}
