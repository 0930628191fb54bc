//! Pluggable scheduling policies.
//!
//! A policy is consulted once per tick for every core whose running slot is
//! empty. It may move processes between the ready queues and running slots
//! and may split a CPU event into a quantum slice plus a preempted tail. The
//! engine's FCFS fallback fills any slot the policy leaves empty.

use std::fmt;

use clap::ValueEnum;

use crate::process::{Event, EventKind};
use crate::scheduler::Core;
use crate::types::Tick;

pub const DEFAULT_QUANTUM: Tick = 5;

/// A scheduling decision function with a stable human-readable name.
pub trait SchedulePolicy {
    fn name(&self) -> &'static str;

    /// Rearrange ready queues and running slots for one tick.
    fn schedule(&mut self, cores: &mut [Core]);
}

/// First-Come-First-Served. The engine's fallback already pops the ready
/// queue head into the running slot, so the policy itself does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fcfs;

impl SchedulePolicy for Fcfs {
    fn name(&self) -> &'static str {
        "First Come First Served"
    }

    fn schedule(&mut self, _cores: &mut [Core]) {}
}

/// Round Robin with a fixed quantum: the next ready process is installed and
/// its CPU event capped at `quantum` ticks, with the remainder queued right
/// behind the slice.
#[derive(Debug, Clone, Copy)]
pub struct RoundRobin {
    pub quantum: Tick,
}

impl RoundRobin {
    pub fn new(quantum: Tick) -> Self {
        RoundRobin { quantum }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        RoundRobin::new(DEFAULT_QUANTUM)
    }
}

impl SchedulePolicy for RoundRobin {
    fn name(&self) -> &'static str {
        "Round Robin"
    }

    fn schedule(&mut self, cores: &mut [Core]) {
        for core in cores.iter_mut() {
            if core.running.is_some() {
                continue;
            }
            let Some(mut process) = core.ready.pop_front() else {
                continue;
            };

            let head = process
                .events
                .front_mut()
                .expect("ready process must have events");
            assert!(
                head.kind == EventKind::Cpu,
                "ready process must be on a CPU event"
            );
            assert!(head.duration > 0, "live event must have positive duration");

            if head.duration > self.quantum {
                // Shrink the head to the preempted tail and put the quantum
                // slice in front of it.
                let slice = Event {
                    kind: EventKind::Cpu,
                    duration: self.quantum,
                    resource_usage: head.resource_usage,
                };
                head.duration -= self.quantum;
                process.events.push_front(slice);
            }

            core.running = Some(process);
        }
    }
}

/// The selectable policies, as exposed on the command line and in pickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyKind {
    /// Run each process to the end of its CPU burst.
    FirstComeFirstServed,
    /// Preempt CPU bursts every quantum ticks.
    RoundRobin,
}

impl PolicyKind {
    pub fn build(self, quantum: Tick) -> Box<dyn SchedulePolicy> {
        match self {
            PolicyKind::FirstComeFirstServed => Box::new(Fcfs),
            PolicyKind::RoundRobin => Box::new(RoundRobin::new(quantum)),
        }
    }
}

impl fmt::Display for PolicyKind {
    /// Renders the command-line value name, so clap can round-trip defaults.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::FirstComeFirstServed => f.write_str("first-come-first-served"),
            PolicyKind::RoundRobin => f.write_str("round-robin"),
        }
    }
}
