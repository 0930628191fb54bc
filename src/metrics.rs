//! Derived statistics over a simulation run.
//!
//! The scheduler itself only exposes instantaneous averages; the running
//! maxima of those averages belong to the driver, sampled between steps. The
//! snapshot renderer produces the line-oriented `.met` key-value format the
//! comparison tooling consumes.

use std::fmt::Write;

use crate::scheduler::Scheduler;
use crate::types::Tick;

/// Running maxima of the metric time series, updated once per step.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsTracker {
    pub max_waiting_time: Tick,
    pub max_turnaround_time: Tick,
    pub max_throughput: f64,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample the scheduler's metrics. Call between steps; metric reads are
    /// undefined mid-step.
    pub fn observe(&mut self, scheduler: &Scheduler) {
        self.max_waiting_time = self.max_waiting_time.max(scheduler.average_waiting_time());
        self.max_turnaround_time = self
            .max_turnaround_time
            .max(scheduler.average_turnaround_time());
        if scheduler.throughput > self.max_throughput {
            self.max_throughput = scheduler.throughput;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Render the metrics snapshot in canonical `.met` order: a header with the
/// timer and policy, a `separator` line, then the aggregate body.
pub fn snapshot(scheduler: &Scheduler, tracker: &MetricsTracker) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "timer = {}", scheduler.timer);
    let _ = writeln!(out, "schedule_policy = {}", scheduler.policy_name());
    let _ = writeln!(out, "separator");
    let _ = writeln!(out, "avg_waiting_time = {}", scheduler.average_waiting_time());
    let _ = writeln!(out, "max_waiting_time = {}", tracker.max_waiting_time);
    let _ = writeln!(
        out,
        "avg_turnaround_time = {}",
        scheduler.average_turnaround_time()
    );
    let _ = writeln!(out, "max_turnaround_time = {}", tracker.max_turnaround_time);
    let _ = writeln!(out, "avg_throughput = {:.2}", scheduler.throughput);
    let _ = writeln!(out, "max_throughput = {:.2}", tracker.max_throughput);

    out
}
