//! Tree-walking evaluator.
//!
//! The evaluator reaches the outside world through exactly two doors: the
//! [`Console`] for printed text and the shared [`HardwareFacade`] for the arm.
//! Everything else a program can touch lives in its [`Namespace`].
//!
//! Before every statement and on every loop iteration the evaluator passes a
//! checkpoint where it observes the run's cancellation token and deadline.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use neo_hardware::{FacadeError, HardwareFacade};
use tokio_util::sync::CancellationToken;

use super::ast::{BinOp, Block, Expr, ExprKind, Stmt, StmtKind, Target, UnaryOp};
use super::builtins::{
    self, call_list_method, call_pure, call_str_method, Args, Builtin, LIST_METHODS, STR_METHODS,
};
use super::console::Console;
use super::faults::{Fault, FaultReason, HARDWARE_FAILED_WARNING};
use super::namespace::Namespace;
use super::ops;
use super::value::{lock, new_list, UserFunction, Value};
use crate::config::SandboxConfig;

/// Commands reachable through the arm binding.
pub const ARM_COMMANDS: &[&str] = &[
    "turn_left",
    "turn_right",
    "elbow_left",
    "elbow_right",
    "set_angle",
    "grab",
    "release",
    "get_angle",
    "delay",
];

/// Longest single sleep inside `delay` before the checkpoint runs again.
const SLEEP_SLICE: Duration = Duration::from_millis(20);

/// Cancellation and deadline of one run.
#[derive(Debug, Clone)]
pub struct RunControl {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    limit: Duration,
}

impl RunControl {
    /// Starts the clock now.
    pub fn new(cancel: CancellationToken, limit: Duration) -> Self {
        Self {
            cancel,
            deadline: Instant::now().checked_add(limit),
            limit,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// The checkpoint.
    pub fn check(&self, line: usize) -> Result<(), Fault> {
        if self.cancel.is_cancelled() {
            return Err(Fault::Cancelled { line });
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Fault::Timeout {
                limit: self.limit,
                line,
            }),
            _ => Ok(()),
        }
    }
}

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

fn at(line: usize) -> impl Fn(FaultReason) -> Fault {
    move |reason| Fault::runtime(reason, line)
}

pub struct Interpreter<'a> {
    globals: &'a mut Namespace,
    frames: Vec<HashMap<String, Value>>,
    console: &'a mut Console,
    arm: &'a Mutex<HardwareFacade>,
    control: &'a RunControl,
    config: &'a SandboxConfig,
    echo: bool,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        globals: &'a mut Namespace,
        console: &'a mut Console,
        arm: &'a Mutex<HardwareFacade>,
        control: &'a RunControl,
        config: &'a SandboxConfig,
    ) -> Self {
        Self {
            globals,
            frames: Vec::new(),
            console,
            arm,
            control,
            config,
            echo: false,
        }
    }

    /// Echo the value of top-level expression statements, as a console does.
    pub fn echo_expressions(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn run(&mut self, program: &Block) -> Result<(), Fault> {
        for stmt in program {
            self.control.check(stmt.line)?;
            match &stmt.kind {
                StmtKind::Expr(expr) if self.echo => {
                    let value = self.eval(expr)?;
                    if !matches!(value, Value::None) {
                        self.console.write(&value.repr());
                        self.console.write("\n");
                    }
                }
                _ => {
                    self.exec(stmt)?;
                }
            }
        }
        Ok(())
    }

    fn max_items(&self) -> usize {
        self.config.max_collection_size
    }

    fn exec_block(&mut self, block: &Block) -> Result<Flow, Fault> {
        for stmt in block {
            self.control.check(stmt.line)?;
            match self.exec(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow, Fault> {
        let line = stmt.line;
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value, line)?;
            }
            StmtKind::AugAssign { target, op, value } => {
                let right = self.eval(value)?;
                self.augmented(target, *op, right, line)?;
            }
            StmtKind::If { branches, orelse } => {
                for (cond, body) in branches {
                    if self.eval(cond)?.truthy() {
                        return self.exec_block(body);
                    }
                }
                if let Some(body) = orelse {
                    return self.exec_block(body);
                }
            }
            StmtKind::While { cond, body } => loop {
                self.control.check(line)?;
                if !self.eval(cond)?.truthy() {
                    break;
                }
                match self.exec_block(body)? {
                    Flow::Break => break,
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Normal | Flow::Continue => {}
                }
            },
            StmtKind::For { vars, iter, body } => {
                let iterable = self.eval(iter)?;
                if let Value::Range(range) = iterable {
                    for i in 0..range.len() {
                        let Some(item) = range.get(i) else { break };
                        if let Some(flow) = self.iteration(vars, Value::Int(item), body, line)? {
                            return Ok(flow);
                        }
                    }
                } else {
                    let items = iterable.items(self.max_items()).map_err(at(iter.line))?;
                    for item in items {
                        if let Some(flow) = self.iteration(vars, item, body, line)? {
                            return Ok(flow);
                        }
                    }
                }
            }
            StmtKind::Def(def) => {
                let mut defaults = Vec::with_capacity(def.params.len());
                for param in &def.params {
                    defaults.push(match &param.default {
                        Some(expr) => Some(self.eval(expr)?),
                        None => None,
                    });
                }
                let function = UserFunction {
                    def: def.clone(),
                    defaults,
                };
                self.set_name(&def.name, Value::Function(Arc::new(function)));
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Pass => {}
            StmtKind::Import(module) => {
                log::debug!("Refused import of '{}' on line {}", module, line);
                return Err(Fault::runtime(FaultReason::ImportUnavailable, line));
            }
        }
        Ok(Flow::Normal)
    }

    /// One pass through a `for` body. `Some` ends the loop with that flow.
    fn iteration(
        &mut self,
        vars: &[String],
        item: Value,
        body: &Block,
        line: usize,
    ) -> Result<Option<Flow>, Fault> {
        self.control.check(line)?;
        match vars {
            [var] => self.set_name(var, item),
            _ => {
                let parts = match &item {
                    Value::List(_) | Value::Str(_) => item.items(self.max_items()).map_err(at(line))?,
                    other => {
                        return Err(Fault::runtime(
                            FaultReason::Invalid(format!(
                                "can't unpack {} into {} loop variables",
                                other.kind(),
                                vars.len()
                            )),
                            line,
                        ))
                    }
                };
                if parts.len() != vars.len() {
                    return Err(Fault::runtime(
                        FaultReason::Invalid(format!(
                            "expected {} values to unpack, got {}",
                            vars.len(),
                            parts.len()
                        )),
                        line,
                    ));
                }
                for (var, part) in vars.iter().zip(parts) {
                    self.set_name(var, part);
                }
            }
        }
        Ok(match self.exec_block(body)? {
            Flow::Break => Some(Flow::Normal),
            Flow::Return(value) => Some(Flow::Return(value)),
            Flow::Normal | Flow::Continue => None,
        })
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.frames.last().and_then(|frame| frame.get(name)) {
            return Some(value.clone());
        }
        self.globals.get(name).cloned()
    }

    fn set_name(&mut self, name: &str, value: Value) {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.insert(name.to_string(), value);
            }
            None => self.globals.set(name, value),
        }
    }

    fn assign(&mut self, target: &Target, value: Value, line: usize) -> Result<(), Fault> {
        match target {
            Target::Name(name) => {
                self.set_name(name, value);
                Ok(())
            }
            Target::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                ops::set_item(&object, &index, value).map_err(at(line))
            }
        }
    }

    fn augmented(&mut self, target: &Target, op: BinOp, right: Value, line: usize) -> Result<(), Fault> {
        match target {
            Target::Name(name) => {
                let current = self
                    .lookup(name)
                    .ok_or_else(|| Fault::runtime(FaultReason::UnknownName(name.clone()), line))?;
                if let (BinOp::Add, Value::List(list)) = (op, &current) {
                    // `+=` extends a list in place, so every reference sees it.
                    let extra = right.items(self.max_items()).map_err(at(line))?;
                    let mut items = lock(list);
                    if items.len() + extra.len() > self.max_items() {
                        return Err(Fault::runtime(FaultReason::TooLarge, line));
                    }
                    items.extend(extra);
                    return Ok(());
                }
                let updated = ops::binary(op, &current, &right, self.max_items()).map_err(at(line))?;
                self.set_name(name, updated);
                Ok(())
            }
            Target::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                let current = ops::get_item(&object, &index).map_err(at(line))?;
                let updated = ops::binary(op, &current, &right, self.max_items()).map_err(at(line))?;
                ops::set_item(&object, &index, updated).map_err(at(line))
            }
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, Fault> {
        let line = expr.line;
        match &expr.kind {
            ExprKind::None => Ok(Value::None),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Int(i) => Ok(Value::Int(*i)),
            ExprKind::Float(f) => Ok(Value::Float(*f)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Name(name) => self
                .lookup(name)
                .ok_or_else(|| Fault::runtime(FaultReason::UnknownName(name.clone()), line)),
            ExprKind::List(elements) => {
                if elements.len() > self.max_items() {
                    return Err(Fault::runtime(FaultReason::TooLarge, line));
                }
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval(element)?);
                }
                Ok(new_list(items))
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Neg => ops::negate(&value),
                    UnaryOp::Pos => ops::plus(&value),
                }
                .map_err(at(line))
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                ops::binary(*op, &left, &right, self.max_items()).map_err(at(line))
            }
            ExprKind::And(left, right) => {
                let left = self.eval(left)?;
                if left.truthy() {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            ExprKind::Or(left, right) => {
                let left = self.eval(left)?;
                if left.truthy() {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            ExprKind::Not(operand) => Ok(Value::Bool(!self.eval(operand)?.truthy())),
            ExprKind::Compare { first, rest } => {
                let mut left = self.eval(first)?;
                for (op, next) in rest {
                    let right = self.eval(next)?;
                    if !ops::compare(*op, &left, &right).map_err(at(next.line))? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            ExprKind::Call { func, args, kwargs } => {
                let callee = self.eval(func)?;
                let mut call_args = Args::default();
                for arg in args {
                    call_args.positional.push(self.eval(arg)?);
                }
                for (keyword, arg) in kwargs {
                    call_args.keywords.push((keyword.clone(), self.eval(arg)?));
                }
                let name = match &func.kind {
                    ExprKind::Name(name) => name.clone(),
                    ExprKind::Attribute { name, .. } => name.clone(),
                    _ => callee.repr(),
                };
                self.call(callee, call_args, &name, line)
            }
            ExprKind::Attribute { object, name } => {
                let receiver = self.eval(object)?;
                attribute(receiver, name).map_err(at(line))
            }
            ExprKind::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                ops::get_item(&object, &index).map_err(at(line))
            }
        }
    }

    fn call(&mut self, callee: Value, args: Args, name: &str, line: usize) -> Result<Value, Fault> {
        let max_items = self.max_items();
        match callee {
            Value::Builtin(Builtin::Print) => self.print(args).map_err(at(line)),
            Value::Builtin(Builtin::Delay) => self.delay(args, line),
            Value::Builtin(builtin) => call_pure(builtin, args, max_items).map_err(at(line)),
            Value::Function(function) => self.call_function(&function, args, line),
            Value::Method(receiver, method) => match *receiver {
                Value::Arm => self.arm_command(&method, args, line),
                Value::List(list) => {
                    call_list_method(&list, &method, args, max_items).map_err(at(line))
                }
                Value::Str(text) => {
                    call_str_method(&text, &method, args, max_items).map_err(at(line))
                }
                other => Err(Fault::runtime(
                    FaultReason::UnknownMethod {
                        kind: other.kind(),
                        name: method,
                    },
                    line,
                )),
            },
            other => Err(Fault::runtime(
                FaultReason::NotCallable {
                    name: name.to_string(),
                    kind: other.kind(),
                },
                line,
            )),
        }
    }

    fn call_function(&mut self, function: &UserFunction, args: Args, line: usize) -> Result<Value, Fault> {
        let def = &function.def;
        let limit = self.config.recursion_limit;
        if self.frames.len() >= limit {
            return Err(Fault::runtime(FaultReason::RecursionLimit(limit), line));
        }

        let params: Vec<&str> = def.params.iter().map(|p| p.name.as_str()).collect();
        let required = function.defaults.iter().take_while(|d| d.is_none()).count();
        let got = args.count();
        let slots = args.bind(&def.name, &params, 0).map_err(at(line))?;

        let mut frame = HashMap::with_capacity(params.len());
        for ((param, slot), default) in params.iter().zip(slots).zip(&function.defaults) {
            let value = slot.or_else(|| default.clone()).ok_or_else(|| {
                Fault::runtime(
                    FaultReason::ArgumentCount {
                        name: def.name.clone(),
                        expected: builtins::expected(required, params.len()),
                        got,
                    },
                    line,
                )
            })?;
            frame.insert(param.to_string(), value);
        }

        self.frames.push(frame);
        let flow = self.exec_block(&def.body);
        self.frames.pop();
        match flow? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::None),
        }
    }

    fn print(&mut self, args: Args) -> Result<Value, FaultReason> {
        let mut sep = " ".to_string();
        let mut end = "\n".to_string();
        for (keyword, value) in args.keywords {
            let slot = match keyword.as_str() {
                "sep" => &mut sep,
                "end" => &mut end,
                _ => {
                    return Err(FaultReason::UnexpectedKeyword {
                        name: "print".to_string(),
                        keyword,
                    })
                }
            };
            match value {
                Value::Str(text) => *slot = text,
                Value::None => {}
                other => {
                    return Err(FaultReason::Invalid(format!(
                        "print's '{}' option must be text, not {}",
                        keyword,
                        other.kind()
                    )))
                }
            }
        }
        let text = args
            .positional
            .iter()
            .map(Value::display)
            .collect::<Vec<_>>()
            .join(&sep);
        self.console.write(&text);
        self.console.write(&end);
        Ok(Value::None)
    }

    /// Runs `op` against the shared facade, holding its lock for that call only.
    fn with_arm<T>(
        &mut self,
        line: usize,
        op: impl FnOnce(&mut HardwareFacade) -> Result<T, FacadeError>,
    ) -> Result<T, Fault> {
        // Text printed so far must reach the sink before any status line.
        self.console.flush();
        let result = {
            let mut facade = self.arm.lock().unwrap_or_else(PoisonError::into_inner);
            op(&mut facade)
        };
        match result {
            Ok(value) => Ok(value),
            Err(FacadeError::InvalidArgument(message)) => {
                Err(Fault::runtime(FaultReason::Rejected(message), line))
            }
            // A stop requested while the board was being waited on still
            // ends the run as stopped.
            Err(FacadeError::Hardware(error)) if self.control.cancel_token().is_cancelled() => {
                log::warn!("Arm call on line {} failed after a stop request: {}", line, error);
                self.console.status(HARDWARE_FAILED_WARNING);
                Err(Fault::Cancelled { line })
            }
            Err(FacadeError::Hardware(error)) => Err(Fault::Hardware { error, line }),
        }
    }

    fn arm_command(&mut self, command: &str, args: Args, line: usize) -> Result<Value, Fault> {
        match command {
            "turn_left" | "turn_right" | "elbow_left" | "elbow_right" => {
                let amount = match single(args, command, "angle", false).map_err(at(line))? {
                    Some(value) => Some(angle_arg(&value).map_err(at(line))?),
                    None => None,
                };
                self.with_arm(line, |arm| match command {
                    "turn_left" => arm.turn_left(amount),
                    "turn_right" => arm.turn_right(amount),
                    "elbow_left" => arm.elbow_left(amount),
                    _ => arm.elbow_right(amount),
                })?;
                Ok(Value::None)
            }
            "set_angle" => {
                let value = single(args, command, "angle", true)
                    .map_err(at(line))?
                    .unwrap_or(Value::None);
                let angle = angle_arg(&value).map_err(at(line))?;
                self.with_arm(line, |arm| arm.set_angle(angle))?;
                Ok(Value::None)
            }
            "grab" | "release" => {
                args.bind(command, &[], 0).map_err(at(line))?;
                self.with_arm(line, |arm| {
                    if command == "grab" {
                        arm.grab()
                    } else {
                        arm.release()
                    }
                })?;
                Ok(Value::None)
            }
            "get_angle" => {
                args.bind(command, &[], 0).map_err(at(line))?;
                self.with_arm(line, |arm| arm.get_angle()).map(Value::Int)
            }
            "delay" => self.delay(args, line),
            other => Err(Fault::runtime(FaultReason::UnknownCommand(other.to_string()), line)),
        }
    }

    fn delay(&mut self, args: Args, line: usize) -> Result<Value, Fault> {
        let value = single(args, "delay", "seconds", true)
            .map_err(at(line))?
            .unwrap_or(Value::None);
        let seconds = match &value {
            Value::Bool(_) => None,
            other => other.as_number(),
        }
        .ok_or_else(|| {
            Fault::runtime(
                FaultReason::Rejected(format!(
                    "delay needs a number of seconds, not {}",
                    value.kind()
                )),
                line,
            )
        })?;
        let pause = self.with_arm(line, |arm| arm.delay(seconds.to_f64()))?;
        self.sleep(pause, line)?;
        Ok(Value::None)
    }

    /// Sleeps in short slices, passing the checkpoint between them.
    fn sleep(&self, pause: Duration, line: usize) -> Result<(), Fault> {
        let until = Instant::now().checked_add(pause);
        loop {
            self.control.check(line)?;
            let remaining = match until {
                Some(until) => until.saturating_duration_since(Instant::now()),
                None => SLEEP_SLICE,
            };
            if remaining.is_zero() {
                return Ok(());
            }
            std::thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}

/// Binds a call that takes at most one argument.
fn single(args: Args, name: &str, param: &str, required: bool) -> Result<Option<Value>, FaultReason> {
    let slots = args.bind(name, &[param], usize::from(required))?;
    Ok(slots.into_iter().next().flatten())
}

/// Accepts whole numbers, including floats such as `90.0`.
fn angle_arg(value: &Value) -> Result<i64, FaultReason> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Ok(*f as i64),
        Value::Float(f) => Err(FaultReason::Rejected(format!(
            "angle must be a whole number of degrees, but got {}",
            super::value::format_float(*f)
        ))),
        other => Err(FaultReason::Rejected(format!(
            "angle must be a number, not {}",
            other.kind()
        ))),
    }
}

fn attribute(receiver: Value, name: &str) -> Result<Value, FaultReason> {
    let known: &[&str] = match &receiver {
        Value::Arm => ARM_COMMANDS,
        Value::List(_) => LIST_METHODS,
        Value::Str(_) => STR_METHODS,
        _ => &[],
    };
    if known.contains(&name) {
        return Ok(Value::Method(Box::new(receiver), name.to_string()));
    }
    Err(match receiver {
        Value::Arm => FaultReason::UnknownCommand(name.to_string()),
        other => FaultReason::UnknownMethod {
            kind: other.kind(),
            name: name.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::namespace::NamespaceBuilder;
    use crate::sandbox::parser::parse;
    use crate::sandbox::value::Number;
    use neo_hardware::{ControllerLink, HardwareConfig};
    use neo_types::{MemorySink, OutputKind, OutputSink};

    struct Harness {
        sink: Arc<MemorySink>,
        arm: Mutex<HardwareFacade>,
        config: SandboxConfig,
        namespace: Namespace,
    }

    impl Harness {
        fn new() -> Self {
            let sink = Arc::new(MemorySink::new());
            let link = ControllerLink::with_connector(HardwareConfig::simulated(), None, sink.clone());
            let config = SandboxConfig::default();
            let namespace = NamespaceBuilder::new(&config).build();
            Self {
                arm: Mutex::new(HardwareFacade::new(link, sink.clone())),
                sink,
                config,
                namespace,
            }
        }

        fn run(&mut self, source: &str) -> (Result<(), Fault>, String) {
            let program = parse(source).unwrap();
            let control = RunControl::new(CancellationToken::new(), Duration::from_secs(5));
            let sink: Arc<dyn OutputSink> = self.sink.clone();
            let mut console = Console::new(sink);
            let result = Interpreter::new(
                &mut self.namespace,
                &mut console,
                &self.arm,
                &control,
                &self.config,
            )
            .run(&program);
            (result, console.finish())
        }

        fn output(&mut self, source: &str) -> String {
            let (result, output) = self.run(source);
            result.unwrap();
            output
        }

        fn fault(&mut self, source: &str) -> Fault {
            self.run(source).0.unwrap_err()
        }
    }

    #[test]
    fn test_arithmetic_and_printing() {
        let mut h = Harness::new();
        assert_eq!(h.output("print(1 + 2 * 3, 7 // 2, 2 ** 10)"), "7 3 1024");
        assert_eq!(h.output("print('a', 'b', sep='-', end='!')"), "a-b!");
        assert_eq!(h.output("print(10 / 4)"), "2.5");
    }

    #[test]
    fn test_control_flow() {
        let mut h = Harness::new();
        let source = "\
total = 0
for i in range(10):
    if i % 2 == 0:
        continue
    if i > 7:
        break
    total += i
print(total)
n = 3
while n > 0:
    n -= 1
print(n)
";
        assert_eq!(h.output(source), "16\n0");
    }

    #[test]
    fn test_functions_defaults_and_recursion() {
        let mut h = Harness::new();
        let source = "\
def fact(n):
    if n <= 1:
        return 1
    return n * fact(n - 1)

def greet(name, punctuation='!'):
    return 'hi ' + name + punctuation

print(fact(10))
print(greet('neo'), greet('arm', punctuation='?'))
";
        assert_eq!(h.output(source), "3628800\nhi neo! hi arm?");
    }

    #[test]
    fn test_recursion_limit() {
        let mut h = Harness::new();
        h.config.recursion_limit = 10;
        let fault = h.fault("def f(n):\n    return f(n + 1)\nf(0)\n");
        match fault {
            Fault::Runtime { reason, .. } => assert_eq!(reason, FaultReason::RecursionLimit(10)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_functions_see_globals_but_keep_locals() {
        let mut h = Harness::new();
        let source = "\
speed = 5
def faster():
    boost = speed * 2
    return boost
print(faster())
";
        assert_eq!(h.output(source), "10");
        let fault = h.fault("print(boost)");
        assert!(matches!(
            fault,
            Fault::Runtime { reason: FaultReason::UnknownName(ref n), line: 1 } if n == "boost"
        ));
    }

    #[test]
    fn test_lists_are_shared() {
        let mut h = Harness::new();
        let source = "\
a = [1, 2]
b = a
b.append(3)
a += [4]
b[0] = 10
print(a, len(b))
";
        assert_eq!(h.output(source), "[10, 2, 3, 4] 4");
    }

    #[test]
    fn test_enumerate_zip_and_loop_unpacking() {
        let mut h = Harness::new();
        let source = "\
for i, name in enumerate(['upper', 'lower'], 1):
    print(i, name)
for angle, joint in zip([30, 60, 90], 'ab'):
    print(joint, angle)
print(list(zip([1, 2], [3, 4])))
";
        assert_eq!(h.output(source), "1 upper\n2 lower\na 30\nb 60\n[[1, 3], [2, 4]]");

        match h.fault("for a, b in [[1, 2], [3]]:\n    pass\n") {
            Fault::Runtime { reason, line } => {
                assert_eq!(line, 1);
                assert_eq!(reason.to_string(), "expected 2 values to unpack, got 1");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            h.fault("for a, b in [1, 2]:\n    pass\n"),
            Fault::Runtime { reason: FaultReason::Invalid(_), line: 1 }
        ));
    }

    #[test]
    fn test_fault_lines() {
        let mut h = Harness::new();
        assert_eq!(h.fault("x = 1\ny = 2\nz = x / 0\n").line(), 3);
        assert!(matches!(
            h.fault("import os"),
            Fault::Runtime { reason: FaultReason::ImportUnavailable, line: 1 }
        ));
        assert!(matches!(
            h.fault("x = 5\nx()"),
            Fault::Runtime { reason: FaultReason::NotCallable { .. }, line: 2 }
        ));
    }

    #[test]
    fn test_arm_commands_reach_the_facade() {
        let mut h = Harness::new();
        assert_eq!(h.output("arm.turn_right(30)\narm.set_angle(45.0)\nprint(arm.get_angle())"), "45");
        let status = h.sink.lines(OutputKind::Status);
        assert!(status.contains(&"arm.turn_right(30)".to_string()));
        assert!(status.contains(&"arm.set_angle(45)".to_string()));
    }

    #[test]
    fn test_arm_rejections_are_runtime_faults() {
        let mut h = Harness::new();
        match h.fault("arm.set_angle(200)") {
            Fault::Runtime { reason, line } => {
                assert_eq!(line, 1);
                assert_eq!(reason.to_string(), "angle must be between 0 and 180, but got 200");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            h.fault("arm.set_angle('up')"),
            Fault::Runtime { reason: FaultReason::Rejected(_), .. }
        ));
        assert!(matches!(
            h.fault("arm.jump()"),
            Fault::Runtime { reason: FaultReason::UnknownCommand(_), .. }
        ));
        assert_eq!(h.arm.lock().unwrap().arm_state(), Default::default());
    }

    #[test]
    fn test_print_flushes_before_arm_status() {
        let mut h = Harness::new();
        h.output("print('moving', end='')\narm.grab()");
        let events = h.sink.events();
        let moving = events.iter().position(|e| e.text == "moving").unwrap();
        let grab = events.iter().position(|e| e.text == "arm.grab()").unwrap();
        assert!(moving < grab);
    }

    #[test]
    fn test_cancelled_token_stops_at_next_checkpoint() {
        let mut h = Harness::new();
        let program = parse("while True:\n    pass\n").unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let control = RunControl::new(token, Duration::from_secs(5));
        let mut console = Console::new(h.sink.clone());
        let result = Interpreter::new(&mut h.namespace, &mut console, &h.arm, &control, &h.config)
            .run(&program);
        assert!(matches!(result, Err(Fault::Cancelled { line: 1 })));
    }

    #[test]
    fn test_deadline_stops_infinite_loop() {
        let mut h = Harness::new();
        let program = parse("n = 0\nwhile True:\n    n += 1\n").unwrap();
        let control = RunControl::new(CancellationToken::new(), Duration::from_millis(50));
        let mut console = Console::new(h.sink.clone());
        let result = Interpreter::new(&mut h.namespace, &mut console, &h.arm, &control, &h.config)
            .run(&program);
        assert!(matches!(result, Err(Fault::Timeout { .. })));
    }

    #[test]
    fn test_echo_mode() {
        let mut h = Harness::new();
        let program = parse("1 + 1\nNone\n'hi'").unwrap();
        let control = RunControl::new(CancellationToken::new(), Duration::from_secs(5));
        let mut console = Console::new(h.sink.clone());
        Interpreter::new(&mut h.namespace, &mut console, &h.arm, &control, &h.config)
            .echo_expressions(true)
            .run(&program)
            .unwrap();
        assert_eq!(console.finish(), "2\n'hi'");
    }

    #[test]
    fn test_number_helpers() {
        assert_eq!(angle_arg(&Value::Float(90.0)), Ok(90));
        assert!(angle_arg(&Value::Float(12.5)).is_err());
        assert!(angle_arg(&Value::Bool(true)).is_err());
        assert!(matches!(Value::Int(3).as_number(), Some(Number::Int(3))));
    }
}
