//! Interpreter for workload scripts.
//!
//! Walks the arena AST and seeds a scheduler through the narrow
//! [`SchedulerHandle`] capability: spawning processes and configuring
//! workload knobs. Every expression evaluates to a dynamic [`Value`];
//! statement results are discarded. Randomness for `spawn_random_process`
//! and per-event resource usage comes from an injected PRNG so runs are
//! reproducible under a pinned seed.

use std::collections::VecDeque;
use std::fmt;

use rand::rngs::SmallRng;
use rand::RngCore;
use tracing::debug;

use crate::ast::{Ast, ExpressionId, ExpressionKind};
use crate::lexer::{LexError, Lexer};
use crate::parser::{ParseError, Parser};
use crate::process::{Event, EventKind};
use crate::token::Token;
use crate::types::{Pid, Tick};

/// Workload knobs a script can configure with `name :: value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKnob {
    MaxProcesses,
    MaxEventsPerProcess,
    MaxSingleEventDuration,
    MaxArrivalTime,
}

impl ConfigKnob {
    pub const ALL: [ConfigKnob; 4] = [
        ConfigKnob::MaxProcesses,
        ConfigKnob::MaxEventsPerProcess,
        ConfigKnob::MaxSingleEventDuration,
        ConfigKnob::MaxArrivalTime,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConfigKnob::MaxProcesses => "max_processes",
            ConfigKnob::MaxEventsPerProcess => "max_events_per_process",
            ConfigKnob::MaxSingleEventDuration => "max_single_event_duration",
            ConfigKnob::MaxArrivalTime => "max_arrival_time",
        }
    }

    pub fn from_name(name: &str) -> Option<ConfigKnob> {
        ConfigKnob::ALL.into_iter().find(|knob| knob.name() == name)
    }
}

/// The capability set the interpreter needs from a scheduler. Anything that
/// implements this can be driven by a workload script.
pub trait SchedulerHandle {
    fn emplace_process(&mut self, name: String, pid: Pid, arrival: Tick, events: VecDeque<Event>);
    fn set_knob(&mut self, knob: ConfigKnob, value: u64);
}

/// The dynamic value domain of the script language.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Number(u64),
    List(Vec<Value>),
    Unit,
}

impl Value {
    fn into_string(self) -> Option<String> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }

    fn as_number(&self) -> Option<u64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    fn into_list(self) -> Option<Vec<Value>> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }
}

/// Evaluation errors. Each names the offending construct; evaluation stops at
/// the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpError {
    ArityMismatch {
        builtin: &'static str,
        expected: usize,
        got: usize,
    },
    TypeMismatch {
        builtin: &'static str,
        argument: usize,
        expected: &'static str,
    },
    UnknownConstant {
        name: String,
    },
    ConstantNotNumber {
        name: String,
    },
    UnknownFunction {
        name: String,
    },
    MalformedNumber {
        lexeme: String,
    },
}

impl fmt::Display for InterpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpError::ArityMismatch {
                builtin,
                expected,
                got,
            } => write!(
                f,
                "builtin `{builtin}` expects {expected} arguments, {got} were provided"
            ),
            InterpError::TypeMismatch {
                builtin,
                argument,
                expected,
            } => write!(
                f,
                "mismatched type for argument #{argument} of builtin `{builtin}`: expected {expected}"
            ),
            InterpError::UnknownConstant { name } => {
                write!(f, "unknown constant `{name}` for the current simulation (recognized constants:")?;
                for (index, knob) in ConfigKnob::ALL.into_iter().enumerate() {
                    let separator = if index == 0 { " " } else { ", " };
                    write!(f, "{separator}{}", knob.name())?;
                }
                write!(f, ")")
            }
            InterpError::ConstantNotNumber { name } => {
                write!(f, "constant `{name}` must be bound to a number literal")
            }
            InterpError::UnknownFunction { name } => {
                write!(f, "call to unknown function `{name}`")
            }
            InterpError::MalformedNumber { lexeme } => {
                write!(f, "number literal `{lexeme}` does not fit the tick domain")
            }
        }
    }
}

impl std::error::Error for InterpError {}

/// A failure from any stage of the script pipeline, tagged with the layer it
/// came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptError {
    Lex(LexError),
    Parse(ParseError),
    Interp(InterpError),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Lex(error) => write!(f, "[ERROR] (lexer) {error}"),
            ScriptError::Parse(error) => write!(f, "[ERROR] (parser) {error}"),
            ScriptError::Interp(error) => write!(f, "[ERROR] (interpreter) {error}"),
        }
    }
}

impl std::error::Error for ScriptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScriptError::Lex(error) => Some(error),
            ScriptError::Parse(error) => Some(error),
            ScriptError::Interp(error) => Some(error),
        }
    }
}

/// Run the whole pipeline: lex and parse `source`, then evaluate the script
/// against the scheduler handle.
pub fn interpret<S: SchedulerHandle>(
    source: &str,
    handle: &mut S,
    rng: &mut SmallRng,
) -> Result<(), ScriptError> {
    let tokens = Lexer::lex(source).map_err(ScriptError::Lex)?;
    let ast = Parser::parse(tokens).map_err(ScriptError::Parse)?;
    Interpreter::new(&ast, handle, rng)
        .run()
        .map_err(ScriptError::Interp)
}

/// Draw a seed from OS entropy, falling back to pid and wall clock when
/// `/dev/urandom` is unavailable.
pub fn entropy_seed() -> u64 {
    use std::io::Read;

    let mut buf = [0u8; 8];
    std::fs::File::open("/dev/urandom")
        .and_then(|mut file| file.read_exact(&mut buf).map(|_| u64::from_le_bytes(buf)))
        .unwrap_or_else(|_| {
            let pid = u64::from(std::process::id());
            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|duration| duration.as_nanos() as u64)
                .unwrap_or(0);
            pid ^ timestamp
        })
}

/// Workload limits mirrored from `set_knob` calls; consumed by the random
/// spawning builtin.
#[derive(Debug, Clone, Copy)]
struct Limits {
    max_processes: u64,
    max_events_per_process: u64,
    max_single_event_duration: u64,
    max_arrival_time: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_processes: u64::MAX,
            max_events_per_process: u64::MAX,
            max_single_event_duration: u64::MAX,
            max_arrival_time: u64::MAX,
        }
    }
}

impl Limits {
    fn set(&mut self, knob: ConfigKnob, value: u64) {
        match knob {
            ConfigKnob::MaxProcesses => self.max_processes = value,
            ConfigKnob::MaxEventsPerProcess => self.max_events_per_process = value,
            ConfigKnob::MaxSingleEventDuration => self.max_single_event_duration = value,
            ConfigKnob::MaxArrivalTime => self.max_arrival_time = value,
        }
    }
}

pub struct Interpreter<'a, 'src, S: SchedulerHandle> {
    ast: &'a Ast<'src>,
    handle: &'a mut S,
    rng: &'a mut SmallRng,
    limits: Limits,
    /// Pids already handed out by `spawn_random_process` in this evaluation.
    spawned_pids: Vec<u64>,
}

impl<'a, 'src, S: SchedulerHandle> Interpreter<'a, 'src, S> {
    pub fn new(ast: &'a Ast<'src>, handle: &'a mut S, rng: &'a mut SmallRng) -> Self {
        Interpreter {
            ast,
            handle,
            rng,
            limits: Limits::default(),
            spawned_pids: Vec::new(),
        }
    }

    /// Evaluate every statement in order, discarding values.
    pub fn run(mut self) -> Result<(), InterpError> {
        for statement in self.ast.statements() {
            self.evaluate_expression(statement.expression)?;
        }
        Ok(())
    }

    fn evaluate_expression(&mut self, id: ExpressionId) -> Result<Value, InterpError> {
        let ast = self.ast;
        let expression = ast.expression(id);
        match &expression.kind {
            ExpressionKind::Number { token } => Ok(Value::Number(parse_number(token)?)),
            ExpressionKind::StringLiteral { token } => Ok(Value::Str(token.lexeme.to_string())),
            ExpressionKind::Variable { name } => Ok(Value::Str(name.lexeme.to_string())),
            ExpressionKind::List { elements } | ExpressionKind::Tuple { elements } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate_expression(*element)?);
                }
                Ok(Value::List(values))
            }
            ExpressionKind::Range { start, end } => Ok(Value::List(vec![
                Value::Number(parse_number(start)?),
                Value::Number(parse_number(end)?),
            ])),
            ExpressionKind::For { range, body } => {
                let ExpressionKind::Range { start, end } = &ast.expression(*range).kind else {
                    unreachable!("parser only builds for loops over ranges");
                };
                let start = parse_number(start)?;
                let end = parse_number(end)?;

                // The loop index is not bound in the body; the loop is pure
                // repetition of the body expressions.
                for _ in start..end {
                    for expression in body {
                        self.evaluate_expression(*expression)?;
                    }
                }
                Ok(Value::Unit)
            }
            ExpressionKind::Constant { name, value } => {
                let ExpressionKind::Number { token } = &ast.expression(*value).kind else {
                    return Err(InterpError::ConstantNotNumber {
                        name: name.lexeme.to_string(),
                    });
                };
                let value = parse_number(token)?;
                let knob =
                    ConfigKnob::from_name(name.lexeme).ok_or_else(|| {
                        InterpError::UnknownConstant {
                            name: name.lexeme.to_string(),
                        }
                    })?;

                debug!(knob = knob.name(), value, "configuring workload knob");
                self.limits.set(knob, value);
                self.handle.set_knob(knob, value);
                Ok(Value::Unit)
            }
            ExpressionKind::Call {
                identifier,
                arguments,
            } => match identifier.lexeme {
                "spawn_process" => self.spawn_process(arguments),
                "spawn_random_process" => self.spawn_random_process(arguments),
                _ => Err(InterpError::UnknownFunction {
                    name: identifier.lexeme.to_string(),
                }),
            },
        }
    }

    fn spawn_process(&mut self, arguments: &[ExpressionId]) -> Result<Value, InterpError> {
        const NAME: &str = "spawn_process";
        if arguments.len() != 4 {
            return Err(InterpError::ArityMismatch {
                builtin: NAME,
                expected: 4,
                got: arguments.len(),
            });
        }

        let name = self
            .evaluate_expression(arguments[0])?
            .into_string()
            .ok_or(InterpError::TypeMismatch {
                builtin: NAME,
                argument: 0,
                expected: "string",
            })?;
        let pid = self
            .evaluate_expression(arguments[1])?
            .as_number()
            .ok_or(InterpError::TypeMismatch {
                builtin: NAME,
                argument: 1,
                expected: "int",
            })?;
        let arrival = self
            .evaluate_expression(arguments[2])?
            .as_number()
            .ok_or(InterpError::TypeMismatch {
                builtin: NAME,
                argument: 2,
                expected: "int",
            })?;
        let list = self
            .evaluate_expression(arguments[3])?
            .into_list()
            .ok_or(events_mismatch())?;
        let events = self.events_from_list(list)?;

        self.handle
            .emplace_process(name, Pid(pid), arrival, events);
        Ok(Value::Unit)
    }

    fn events_from_list(&mut self, list: Vec<Value>) -> Result<VecDeque<Event>, InterpError> {
        let mut events = VecDeque::with_capacity(list.len());
        for value in list {
            let tuple = value.into_list().ok_or(events_mismatch())?;
            let [kind, duration] = <[Value; 2]>::try_from(tuple).map_err(|_| events_mismatch())?;

            let kind = kind
                .into_string()
                .and_then(|name| EventKind::try_from_str(&name))
                .ok_or(events_mismatch())?;
            let duration = duration.as_number().ok_or(events_mismatch())?;

            events.push_back(Event {
                kind,
                duration,
                resource_usage: self.resource_usage(),
            });
        }
        Ok(events)
    }

    fn spawn_random_process(&mut self, arguments: &[ExpressionId]) -> Result<Value, InterpError> {
        const NAME: &str = "spawn_random_process";
        if !arguments.is_empty() {
            return Err(InterpError::ArityMismatch {
                builtin: NAME,
                expected: 0,
                got: arguments.len(),
            });
        }

        let mut pid = self.rand_range(0, self.limits.max_processes);
        while self.spawned_pids.contains(&pid) {
            pid = self.rand_range(0, self.limits.max_processes);
        }
        self.spawned_pids.push(pid);

        let arrival = self.rand_range(0, self.limits.max_arrival_time);
        let count = self.rand_range(1, self.limits.max_events_per_process);
        let mut events = VecDeque::new();
        for _ in 0..count {
            events.push_back(self.random_event());
        }

        self.handle
            .emplace_process("Process".to_string(), Pid(pid), arrival, events);
        Ok(Value::Unit)
    }

    fn random_event(&mut self) -> Event {
        let kind = if self.rand_range(0, 1) == 0 {
            EventKind::Cpu
        } else {
            EventKind::Io
        };
        Event {
            kind,
            duration: self.rand_range(1, self.limits.max_single_event_duration),
            resource_usage: self.resource_usage(),
        }
    }

    /// Uniform draw from the inclusive range `[min, max]`.
    fn rand_range(&mut self, min: u64, max: u64) -> u64 {
        let span = max.wrapping_sub(min).wrapping_add(1);
        if span == 0 {
            // The range covers the whole u64 domain.
            return self.rng.next_u64();
        }
        min + self.rng.next_u64() % span
    }

    /// Per-event core usage fraction in `(0, 1]`, floored away from zero.
    fn resource_usage(&mut self) -> f32 {
        let unit = self.rng.next_u32() as f32 / u32::MAX as f32;
        unit.max(0.01)
    }
}

fn events_mismatch() -> InterpError {
    InterpError::TypeMismatch {
        builtin: "spawn_process",
        argument: 3,
        expected: "list of (Cpu|Io, duration) tuples",
    }
}

fn parse_number(token: &Token<'_>) -> Result<u64, InterpError> {
    token
        .lexeme
        .parse()
        .map_err(|_| InterpError::MalformedNumber {
            lexeme: token.lexeme.to_string(),
        })
}
