//! Discrete-time multi-core scheduler engine.
//!
//! This is the core of the simulator. Each core owns an arrival, a ready and
//! a waiting queue plus a single running slot; [`Scheduler::step`] advances
//! every core by one tick in a fixed phase order:
//!
//! 1. admit processes whose arrival tick has come,
//! 2. tick the waiting (IO) queue,
//! 3. tick the running (CPU) slot,
//! 4. let the policy fill an empty running slot (FCFS fallback otherwise),
//! 5. sample per-core CPU usage.
//!
//! Promotions discovered while scanning the waiting queue are staged and
//! applied after the scan, so a process is ticked at most once per step and
//! never re-enters a queue that is still being iterated.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::interp::{ConfigKnob, SchedulerHandle};
use crate::policy::SchedulePolicy;
use crate::process::{Event, EventKind, Process};
use crate::types::{Pid, Tick, MAX_CORES};

/// One simulated CPU core and its queues. Fields are public: drivers render
/// them and scheduling policies rearrange them.
#[derive(Debug, Default)]
pub struct Core {
    /// Processes not yet admitted; each releases at its arrival tick.
    pub arrival: VecDeque<Process>,
    /// Processes whose next event is CPU, waiting for the running slot.
    pub ready: VecDeque<Process>,
    /// Processes blocked on an IO event.
    pub waiting: VecDeque<Process>,
    /// The process currently consuming CPU time, if any.
    pub running: Option<Process>,
    /// Resource usage sampled from the running process's head event.
    pub usage: f32,
}

impl Core {
    fn is_empty(&self) -> bool {
        self.arrival.is_empty()
            && self.ready.is_empty()
            && self.waiting.is_empty()
            && self.running.is_none()
    }
}

/// The scheduler engine. Single-owner and single-threaded: a driver calls
/// [`step`](Scheduler::step) repeatedly and reads metrics between steps.
pub struct Scheduler {
    pub cores: Vec<Core>,
    policy: Box<dyn SchedulePolicy>,
    pub timer: Tick,
    /// Processes that ran all their events to completion.
    pub finished: Vec<Process>,
    /// `finished / timer`, refreshed at the end of every step.
    pub throughput: f64,
    pub previous_finished_count: usize,
    /// Round-robin cursor for admission.
    next_core: usize,
    /// Processes rejected at admission (duplicate pid, empty or zero-length
    /// events).
    pub dropped_count: usize,

    // Workload limits configured from scripts. Only consulted by the random
    // spawning builtin; explicit spawns bypass them.
    pub max_processes: u64,
    pub max_events_per_process: u64,
    pub max_single_event_duration: u64,
    pub max_arrival_time: u64,
}

impl Scheduler {
    /// Create a scheduler with `cores` cores under the given policy.
    ///
    /// # Panics
    /// Panics if `cores` is zero or exceeds [`MAX_CORES`].
    pub fn new(cores: usize, policy: Box<dyn SchedulePolicy>) -> Self {
        assert!(
            (1..=MAX_CORES).contains(&cores),
            "core count {cores} outside 1..={MAX_CORES}"
        );
        Scheduler {
            cores: (0..cores).map(|_| Core::default()).collect(),
            policy,
            timer: 0,
            finished: Vec::new(),
            throughput: 0.0,
            previous_finished_count: 0,
            next_core: 0,
            dropped_count: 0,
            max_processes: u64::MAX,
            max_events_per_process: u64::MAX,
            max_single_event_duration: u64::MAX,
            max_arrival_time: u64::MAX,
        }
    }

    /// True once every queue and running slot is empty.
    pub fn complete(&self) -> bool {
        self.cores.iter().all(Core::is_empty)
    }

    /// Admit a process into the next core's arrival queue (round-robin).
    pub fn emplace_process(
        &mut self,
        name: String,
        pid: Pid,
        arrival: Tick,
        events: VecDeque<Event>,
    ) {
        debug!(%pid, name = %name, arrival, core = self.next_core, "queued process");
        self.cores[self.next_core]
            .arrival
            .push_back(Process::new(name, pid, arrival, events));
        self.next_core = (self.next_core + 1) % self.cores.len();
    }

    /// Advance the simulation by one tick. A no-op once the simulation is
    /// complete, so the clock settles together with the queues.
    pub fn step(&mut self) {
        if self.complete() {
            return;
        }

        for core in 0..self.cores.len() {
            self.admit_arrivals(core);
            self.update_waiting(core);
            self.update_running(core);

            if self.cores[core].running.is_none() {
                self.policy.schedule(&mut self.cores);
            }
            if self.cores[core].running.is_none() {
                if let Some(process) = self.cores[core].ready.pop_front() {
                    self.cores[core].running = Some(process);
                }
            }

            if let Some(running) = &self.cores[core].running {
                if let Some(head) = running.events.front() {
                    self.cores[core].usage = head.resource_usage;
                }
            }
            if self.complete() {
                for idle_core in &mut self.cores {
                    idle_core.usage = 0.0;
                }
            }
        }

        self.throughput = if self.timer != 0 {
            self.finished.len() as f64 / self.timer as f64
        } else {
            0.0
        };
        self.previous_finished_count = self.finished.len();
        self.timer += 1;
    }

    /// Reset the simulation to tick zero. Queues, finished processes and
    /// metrics are cleared; the policy is kept. Previously admitted processes
    /// are not replayed; the driver re-runs the script.
    pub fn restart(&mut self) {
        for core in &mut self.cores {
            core.arrival.clear();
            core.ready.clear();
            core.waiting.clear();
            core.running = None;
            core.usage = 0.0;
        }
        self.timer = 0;
        self.finished.clear();
        self.throughput = 0.0;
        self.previous_finished_count = 0;
        self.next_core = 0;
        self.dropped_count = 0;
    }

    /// Replace the scheduling policy in place without disturbing the queues.
    pub fn switch_schedule_policy(&mut self, policy: Box<dyn SchedulePolicy>) {
        info!(policy = policy.name(), "switching schedule policy");
        self.policy = policy;
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Mean of `start_time - arrival` over finished processes, zero when
    /// nothing has finished. Integer division, matching the tick domain.
    pub fn average_waiting_time(&self) -> Tick {
        if self.finished.is_empty() {
            return 0;
        }
        let total: Tick = self
            .finished
            .iter()
            .filter(|process| process.start_time.is_some())
            .map(Process::waiting_time)
            .sum();
        total / self.finished.len() as Tick
    }

    /// Mean of `finish_time - arrival` over finished processes, zero when
    /// nothing has finished.
    pub fn average_turnaround_time(&self) -> Tick {
        if self.finished.is_empty() {
            return 0;
        }
        let total: Tick = self
            .finished
            .iter()
            .filter(|process| process.finish_time.is_some())
            .map(Process::turnaround_time)
            .sum();
        total / self.finished.len() as Tick
    }

    /// Mean resource usage across all cores.
    pub fn average_cpu_usage(&self) -> f64 {
        let total: f64 = self.cores.iter().map(|core| core.usage as f64).sum();
        total / self.cores.len() as f64
    }

    /// Number of processes currently in any queue or running slot.
    pub fn live_count(&self) -> usize {
        self.cores
            .iter()
            .map(|core| {
                core.arrival.len()
                    + core.ready.len()
                    + core.waiting.len()
                    + usize::from(core.running.is_some())
            })
            .sum()
    }

    /// Phase 1: release processes whose arrival tick is now, dropping any
    /// that fail validation.
    fn admit_arrivals(&mut self, core: usize) {
        let mut pending = VecDeque::new();
        std::mem::swap(&mut pending, &mut self.cores[core].arrival);

        while let Some(process) = pending.pop_front() {
            if process.arrival != self.timer {
                self.cores[core].arrival.push_back(process);
                continue;
            }

            if !self.pid_is_unique(process.pid) {
                warn!(
                    name = %process.name,
                    pid = %process.pid,
                    "pid already in use, dropping process"
                );
                self.dropped_count += 1;
                continue;
            }
            if process.events.is_empty() {
                warn!(
                    name = %process.name,
                    pid = %process.pid,
                    "process has no events, dropping process"
                );
                self.dropped_count += 1;
                continue;
            }
            if process.events.iter().any(|event| event.duration == 0) {
                warn!(
                    name = %process.name,
                    pid = %process.pid,
                    "process has a zero-length event, dropping process"
                );
                self.dropped_count += 1;
                continue;
            }

            debug!(pid = %process.pid, core, tick = self.timer, "admitted process");
            self.dispatch_by_first_event(core, process);
        }
    }

    /// Phase 2: tick every waiting process's IO event. Completed events stage
    /// their process for re-dispatch after the scan so nothing is ticked
    /// twice and the queue is never mutated mid-iteration.
    fn update_waiting(&mut self, core: usize) {
        let mut still_waiting = VecDeque::with_capacity(self.cores[core].waiting.len());
        let mut to_dispatch = Vec::new();

        while let Some(mut process) = self.cores[core].waiting.pop_front() {
            let head = process
                .events
                .front_mut()
                .expect("waiting process must have events");
            assert!(
                head.kind == EventKind::Io,
                "waiting process must be on an IO event"
            );
            assert!(head.duration > 0, "live event must have positive duration");
            head.duration -= 1;

            if head.duration == 0 {
                process.events.pop_front();
                if process.events.is_empty() {
                    self.finalize(core, process);
                } else {
                    to_dispatch.push(process);
                }
            } else {
                still_waiting.push_back(process);
            }
        }

        self.cores[core].waiting = still_waiting;
        for process in to_dispatch {
            self.dispatch_by_first_event(core, process);
        }
    }

    /// Phase 3: tick the running process's CPU event. The slot is vacated
    /// only when the event completes.
    fn update_running(&mut self, core: usize) {
        let Some(mut process) = self.cores[core].running.take() else {
            return;
        };

        let head = process
            .events
            .front_mut()
            .expect("running process must have events");
        assert!(
            head.kind == EventKind::Cpu,
            "running process must be on a CPU event"
        );
        assert!(head.duration > 0, "live event must have positive duration");
        head.duration -= 1;

        if head.duration == 0 {
            process.events.pop_front();
            if process.events.is_empty() {
                self.finalize(core, process);
            } else {
                self.dispatch_by_first_event(core, process);
            }
        } else {
            self.cores[core].running = Some(process);
        }
    }

    /// Route a process into ready or waiting based on its first event. First
    /// promotion into ready stamps the start time.
    fn dispatch_by_first_event(&mut self, core: usize, mut process: Process) {
        let first = process
            .events
            .front()
            .expect("dispatched process must have events");
        debug!(pid = %process.pid, core, kind = %first.kind, "dispatching by first event");
        match first.kind {
            EventKind::Cpu => {
                if process.start_time.is_none() {
                    process.start_time = Some(self.timer);
                }
                self.cores[core].ready.push_back(process);
            }
            EventKind::Io => self.cores[core].waiting.push_back(process),
        }
    }

    fn finalize(&mut self, core: usize, mut process: Process) {
        if process.finish_time.is_none() {
            process.finish_time = Some(self.timer);
        }
        info!(
            core,
            name = %process.name,
            pid = %process.pid,
            tick = self.timer,
            "COMPLETED"
        );
        self.finished.push(process);
    }

    /// A pid is unique if no live process anywhere carries it. Checked across
    /// every core so round-robin admission cannot smuggle in a duplicate.
    fn pid_is_unique(&self, pid: Pid) -> bool {
        self.cores.iter().all(|core| {
            core.running.as_ref().map(|p| p.pid) != Some(pid)
                && core.ready.iter().all(|p| p.pid != pid)
                && core.waiting.iter().all(|p| p.pid != pid)
        })
    }
}

impl SchedulerHandle for Scheduler {
    fn emplace_process(&mut self, name: String, pid: Pid, arrival: Tick, events: VecDeque<Event>) {
        Scheduler::emplace_process(self, name, pid, arrival, events);
    }

    fn set_knob(&mut self, knob: ConfigKnob, value: u64) {
        match knob {
            ConfigKnob::MaxProcesses => self.max_processes = value,
            ConfigKnob::MaxEventsPerProcess => self.max_events_per_process = value,
            ConfigKnob::MaxSingleEventDuration => self.max_single_event_duration = value,
            ConfigKnob::MaxArrivalTime => self.max_arrival_time = value,
        }
    }
}
