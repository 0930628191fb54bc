//! Process and event model for the simulated workload.
//!
//! A process is a scripted sequence of CPU and IO bursts. The scheduler owns
//! every process it has admitted; events are consumed from the front of the
//! queue as the simulation advances.

use std::collections::VecDeque;
use std::fmt;

use crate::types::{Pid, Tick};

/// What a process is doing during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Consuming CPU time on a core.
    Cpu,
    /// Blocked on a device; waits out the duration off-CPU.
    Io,
}

impl EventKind {
    /// Parse an event kind from its symbolic script name, case-insensitively.
    pub fn try_from_str(value: &str) -> Option<EventKind> {
        if value.eq_ignore_ascii_case("cpu") {
            Some(EventKind::Cpu)
        } else if value.eq_ignore_ascii_case("io") {
            Some(EventKind::Io)
        } else {
            None
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Cpu => f.write_str("Cpu"),
            EventKind::Io => f.write_str("Io"),
        }
    }
}

/// One burst of work. `duration` is decremented tick by tick and the event is
/// popped when it reaches zero; a zero-duration event never sits in a live
/// queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub duration: Tick,
    /// Fraction of the core consumed while this event runs, in `(0, 1]`.
    pub resource_usage: f32,
}

/// A workload process owned by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    pub name: String,
    pub pid: Pid,
    /// Tick at which the process enters the simulation.
    pub arrival: Tick,
    pub events: VecDeque<Event>,
    /// Tick of the first promotion into a ready queue; set once.
    pub start_time: Option<Tick>,
    /// Tick at which the last event completed; set once.
    pub finish_time: Option<Tick>,
}

impl Process {
    pub fn new(name: String, pid: Pid, arrival: Tick, events: VecDeque<Event>) -> Self {
        Process {
            name,
            pid,
            arrival,
            events,
            start_time: None,
            finish_time: None,
        }
    }

    /// Ticks spent between arrival and first CPU admission. Zero until the
    /// process has started.
    pub fn waiting_time(&self) -> Tick {
        self.start_time
            .map(|start| start - self.arrival)
            .unwrap_or(0)
    }

    /// Ticks between arrival and completion. Zero until the process has
    /// finished.
    pub fn turnaround_time(&self) -> Tick {
        self.finish_time
            .map(|finish| finish - self.arrival)
            .unwrap_or(0)
    }
}
