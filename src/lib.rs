//! simsched - Discrete-time scheduling simulator with a workload language.
//!
//! Workload scripts describe processes (arrival tick plus a sequence of CPU
//! and IO bursts); the scheduler engine admits them onto simulated cores and
//! advances a shared clock one tick at a time under a pluggable policy.
//!
//! # Architecture
//!
//! - **Lexer/Parser**: workload script source → tokens → flat arena AST
//! - **Interpreter**: walks the AST and seeds a scheduler through the
//!   [`SchedulerHandle`] capability
//! - **Scheduler**: per-tick state machine over arrival/ready/waiting queues
//!   and one running slot per core
//! - **Policies**: FCFS and Round Robin, pluggable via [`SchedulePolicy`]
//! - **Metrics**: waiting/turnaround/throughput aggregates and their maxima
//!
//! The engine is driver-agnostic: the bundled CLI runs it headless, and a
//! graphical front end can drive the same `step`/`complete` loop.
//!
//! # Usage
//!
//! ```rust,no_run
//! use rand::rngs::SmallRng;
//! use rand::SeedableRng;
//! use simsched::{interpret, PolicyKind, Scheduler};
//!
//! let mut scheduler = Scheduler::new(2, PolicyKind::RoundRobin.build(5));
//! let mut rng = SmallRng::seed_from_u64(42);
//! interpret(
//!     r#"spawn_process("worker", 1, 0, [(Cpu, 3), (Io, 2)])"#,
//!     &mut scheduler,
//!     &mut rng,
//! )
//! .expect("script evaluates");
//!
//! while !scheduler.complete() {
//!     scheduler.step();
//! }
//! assert_eq!(scheduler.finished.len(), 1);
//! ```

pub mod ast;
pub mod interp;
pub mod lexer;
pub mod metrics;
pub mod parser;
pub mod policy;
pub mod process;
pub mod scheduler;
pub mod token;
pub mod types;

// Re-export the main public types for convenience.
pub use ast::{Ast, Expression, ExpressionId, ExpressionKind, Statement, StatementId};
pub use interp::{
    entropy_seed, interpret, ConfigKnob, InterpError, Interpreter, SchedulerHandle, ScriptError,
    Value,
};
pub use lexer::{LexError, Lexer};
pub use metrics::{snapshot, MetricsTracker};
pub use parser::{ParseError, Parser};
pub use policy::{Fcfs, PolicyKind, RoundRobin, SchedulePolicy, DEFAULT_QUANTUM};
pub use process::{Event, EventKind, Process};
pub use scheduler::{Core, Scheduler};
pub use token::{Span, Token, TokenKind};
pub use types::{Pid, Tick, MAX_CORES};
