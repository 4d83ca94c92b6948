//! Tree-walking interpreter
use crate::ast::*;
use crate::builtin;
use crate::promise::Job;
use crate::types::{arg, loose_eq, strict_eq, BoundMethod, Closure};
use crate::{compile, Env, EnvRef, Error, Extern, Result, Val};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Default nesting limit for closure calls, safe on a default sized thread stack
pub const MAX_CALL_DEPTH: usize = 64;

/// Evaluation context holding the global scope, job queue, and step budget
pub struct Interp<T: Extern> {
    globals: EnvRef<T>,
    jobs: VecDeque<Job<T>>,
    steps: u64,
    step_limit: Option<u64>,
    depth: usize,
    depth_limit: usize,
    /// Value of the last `throw`, kept until caught or converted
    thrown: Option<Val<T>>,
}

/// Completion of a statement
enum Flow<T: Extern> {
    Normal,
    Return(Val<T>),
    Break,
    Continue,
}

/// Resolved left-hand side of an assignment
enum Target<T: Extern> {
    Binding(String),
    Member(Val<T>, String),
}

impl<T: Extern> Interp<T> {
    /// Create an interpreter with standard globals and no step limit
    pub fn new() -> Self {
        Self {
            globals: builtin::globals().into_ref(),
            jobs: VecDeque::new(),
            steps: 0,
            step_limit: None,
            depth: 0,
            depth_limit: MAX_CALL_DEPTH,
            thrown: None,
        }
    }

    /// Builder for bounding evaluation steps
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    pub fn set_step_limit(&mut self, limit: Option<u64>) {
        self.step_limit = limit;
    }

    /// Bound nesting of closure calls. Embedders raising this must run on a larger stack.
    pub fn set_call_depth_limit(&mut self, limit: usize) {
        self.depth_limit = limit;
    }

    /// Scope every program runs under
    pub fn globals(&self) -> &EnvRef<T> {
        &self.globals
    }

    /// Bind a global for all subsequent programs
    pub fn define_global(&mut self, name: &str, val: Val<T>) {
        self.globals.lock().unwrap().define(name, val);
    }

    /// Start a fresh step budget
    pub fn reset_budget(&mut self) {
        self.steps = 0;
        self.thrown = None;
    }

    /// Steps consumed since last [Interp::reset_budget]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Consume one evaluation step
    pub fn tick(&mut self) -> Result<()> {
        self.steps += 1;
        match self.step_limit {
            Some(limit) if self.steps > limit => Err(Error::StepLimit),
            _ => Ok(()),
        }
    }

    /// Compile and run text as a function body, then drain the job queue
    pub fn eval(&mut self, text: &str) -> Result<Val<T>> {
        let invokable = compile(text, &[])?;
        let result = invokable.invoke(self, vec![])?;
        self.run_jobs()?;
        Ok(result)
    }

    pub(crate) fn enqueue(&mut self, job: Job<T>) {
        self.jobs.push_back(job);
    }

    /// Number of queued jobs
    pub fn pending_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Drop all queued jobs
    pub fn clear_jobs(&mut self) {
        self.jobs.clear();
    }

    /// Run queued promise reactions until the queue is empty
    pub fn run_jobs(&mut self) -> Result<()> {
        while let Some(job) = self.jobs.pop_front() {
            self.tick()?;
            job.run(self)?;
        }
        Ok(())
    }

    /// Raise a value, returning the error to propagate
    pub fn throw(&mut self, value: Val<T>) -> Error {
        let message = message_of(&value);
        self.thrown = Some(value);
        Error::Thrown(message)
    }

    /// Convert an error into the value a `catch` clause or rejection observes
    pub fn error_to_val(&mut self, e: Error) -> Val<T> {
        match e {
            Error::Thrown(message) => self
                .thrown
                .take()
                .unwrap_or_else(|| Val::error("Error", &message)),
            e => Val::error(e.kind(), &e.message()),
        }
    }

    /// Run a compiled body with positional params bound in their own scope
    pub(crate) fn run_body(
        &mut self,
        params: &[String],
        body: &[Stmt],
        args: Vec<Val<T>>,
    ) -> Result<Val<T>> {
        let mut param_env = Env::extend(&self.globals);
        for (i, name) in params.iter().enumerate() {
            param_env.define(name, arg(&args, i));
        }
        let body_env = Env::extend(&param_env.into_ref()).into_ref();
        match self.exec_block(body, &body_env)? {
            Flow::Return(v) => Ok(v),
            _ => Ok(Val::Undefined),
        }
    }

    /// Call a function value with arguments
    pub fn call(&mut self, f: &Val<T>, args: Vec<Val<T>>) -> Result<Val<T>> {
        self.tick()?;
        match f {
            Val::Func(c) => {
                if self.depth >= self.depth_limit {
                    return Err(Error::Range("Maximum call stack size exceeded".to_string()));
                }
                self.depth += 1;
                let result = self.call_closure(c, args);
                self.depth -= 1;
                result
            }
            Val::Native(n) => (n.func)(self, &args),
            Val::Method(m) => self.call_method(&m.recv, &m.name, args),
            Val::Extern(e) if e.is_callable() => e.call(self, args),
            _ => Err(Error::Type(format!("{} is not a function", f.inspect()))),
        }
    }

    fn call_closure(&mut self, c: &Closure<T>, args: Vec<Val<T>>) -> Result<Val<T>> {
        let env = Env::extend(&c.env).into_ref();
        let func = Arc::clone(&c.func);
        for (i, param) in func.params.iter().enumerate() {
            let mut value = if param.rest {
                Val::array(args.get(i..).map(<[_]>::to_vec).unwrap_or_default())
            } else {
                arg(&args, i)
            };
            if let (Val::Undefined, Some(default)) = (&value, &param.default) {
                value = self.eval_expr(default, &env)?;
            }
            self.bind(&param.pattern, value, &env, DeclKind::Let)?;
        }
        match &func.body {
            FuncBody::Expr(e) => self.eval_expr(e, &env),
            FuncBody::Block(stmts) => match self.exec_block(stmts, &env)? {
                Flow::Return(v) => Ok(v),
                _ => Ok(Val::Undefined),
            },
        }
    }

    /// Call method `name` on receiver
    pub fn call_method(&mut self, recv: &Val<T>, name: &str, args: Vec<Val<T>>) -> Result<Val<T>> {
        match recv {
            Val::Array(a) => builtin::array::call(self, a, name, args),
            Val::Str(s) => builtin::string::call(self, s, name, args),
            Val::Num(n) => builtin::number::call(self, *n, name, args),
            Val::Promise(p) => builtin::promise::call(self, p, name, args),
            Val::Date(d) => builtin::date::call(self, d, name, args),
            Val::Error(_) if name == "toString" => Ok(Val::Str(recv.to_js_string())),
            Val::Extern(e) => e.call_method(self, name, args),
            Val::Object(o) => {
                let f = o.lock().unwrap().get(name).cloned();
                match f {
                    Some(f) if f.is_callable() => self.call(&f, args),
                    _ => Err(Error::Type(format!("{name} is not a function"))),
                }
            }
            _ => Err(Error::Type(format!("{name} is not a function"))),
        }
    }

    /// Construct a value as with `new`
    pub fn construct(&mut self, f: &Val<T>, args: Vec<Val<T>>) -> Result<Val<T>> {
        match f {
            Val::Native(n) => (n.func)(self, &args),
            Val::Func(_) => match self.call(f, args)? {
                v @ (Val::Object(_) | Val::Array(_)) => Ok(v),
                _ => Ok(Val::object([])),
            },
            Val::Extern(e) if e.is_callable() => e.call(self, args),
            _ => Err(Error::Type(format!("{} is not a constructor", f.inspect()))),
        }
    }

    /// Read property `key` of value
    pub fn get_member(&mut self, obj: &Val<T>, key: &str) -> Result<Val<T>> {
        let val = match obj {
            Val::Undefined | Val::Null => {
                return Err(Error::Type(format!(
                    "Cannot read properties of {obj} (reading '{key}')"
                )))
            }
            Val::Object(o) => o.lock().unwrap().get(key).cloned().unwrap_or(Val::Undefined),
            Val::Array(a) => builtin::array::get(obj, a, key),
            Val::Str(s) => builtin::string::get(obj, s, key),
            Val::Num(_) if builtin::number::METHODS.contains(&key) => bind(obj, key),
            Val::Promise(_) if builtin::promise::METHODS.contains(&key) => bind(obj, key),
            Val::Date(_) if builtin::date::METHODS.contains(&key) => bind(obj, key),
            Val::Error(e) => match key {
                "message" => Val::Str(e.message.clone()),
                "name" => Val::Str(e.name.clone()),
                "toString" => bind(obj, key),
                _ => Val::Undefined,
            },
            Val::Native(n) => match key {
                "name" => Val::string(n.name),
                _ => builtin::native_static(n.name, key).unwrap_or(Val::Undefined),
            },
            Val::Func(c) => match key {
                "name" => Val::Str(c.func.name.clone().unwrap_or_default()),
                "length" => Val::Num(c.func.params.len() as f64),
                _ => Val::Undefined,
            },
            Val::Extern(e) => match e.get(key) {
                Some(v) => v,
                None if e.has_method(key) => bind(obj, key),
                None => Val::Undefined,
            },
            _ => Val::Undefined,
        };
        Ok(val)
    }

    /// Assign property `key` of value
    pub fn set_member(&mut self, obj: &Val<T>, key: &str, val: Val<T>) -> Result<()> {
        match obj {
            Val::Undefined | Val::Null => Err(Error::Type(format!(
                "Cannot set properties of {obj} (setting '{key}')"
            ))),
            Val::Object(o) => {
                o.lock().unwrap().insert(key.to_string(), val);
                Ok(())
            }
            Val::Array(a) => {
                let mut items = a.lock().unwrap();
                if key == "length" {
                    let len = val.to_number();
                    if !(0.0..=builtin::array::MAX_LENGTH as f64).contains(&len) || len.fract() != 0.0 {
                        return Err(Error::Range("Invalid array length".to_string()));
                    }
                    items.resize(len as usize, Val::Undefined);
                } else if let Ok(idx) = key.parse::<usize>() {
                    if idx >= builtin::array::MAX_LENGTH {
                        return Err(Error::Range("Invalid array length".to_string()));
                    }
                    if idx >= items.len() {
                        items.resize(idx + 1, Val::Undefined);
                    }
                    items[idx] = val;
                }
                Ok(())
            }
            Val::Extern(e) => e.set(key, val),
            _ => Ok(()),
        }
    }

    /// Elements of an iterable value
    pub fn iterate(&mut self, value: &Val<T>) -> Result<Vec<Val<T>>> {
        match value {
            Val::Array(a) => Ok(a.lock().unwrap().clone()),
            Val::Str(s) => Ok(s.chars().map(|c| Val::Str(c.to_string())).collect()),
            _ => Err(Error::Type(format!("{} is not iterable", value.inspect()))),
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt], env: &EnvRef<T>) -> Result<Flow<T>> {
        // function declarations are visible throughout their block
        for stmt in stmts {
            if let Stmt::Func(func) = stmt {
                if let Some(name) = &func.name {
                    let closure = Val::Func(Closure {
                        func: Arc::clone(func),
                        env: Arc::clone(env),
                    });
                    env.lock().unwrap().define(name, closure);
                }
            }
        }

        for stmt in stmts {
            match self.exec(stmt, env)? {
                Flow::Normal => (),
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt, env: &EnvRef<T>) -> Result<Flow<T>> {
        self.tick()?;
        match stmt {
            Stmt::Decl(kind, decls) => {
                for (pattern, init) in decls {
                    let value = match init {
                        Some(e) => self.eval_expr(e, env)?,
                        None => Val::Undefined,
                    };
                    self.bind(pattern, value, env, *kind)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::Func(_) | Stmt::Empty => Ok(Flow::Normal),
            Stmt::Return(e) => {
                let value = match e {
                    Some(e) => self.eval_expr(e, env)?,
                    None => Val::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Throw(e) => {
                let value = self.eval_expr(e, env)?;
                Err(self.throw(value))
            }
            Stmt::If(test, then, alt) => {
                if self.eval_expr(test, env)?.truthy() {
                    self.exec(then, env)
                } else if let Some(alt) = alt {
                    self.exec(alt, env)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While(test, body) => {
                while self.eval_expr(test, env)?.truthy() {
                    match self.exec(body, env)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => (),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let loop_env = Env::extend(env).into_ref();
                if let Some(init) = init {
                    self.exec(init, &loop_env)?;
                }
                loop {
                    if let Some(test) = test {
                        if !self.eval_expr(test, &loop_env)?.truthy() {
                            break;
                        }
                    }
                    match self.exec(body, &loop_env)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => (),
                    }
                    if let Some(update) = update {
                        self.eval_expr(update, &loop_env)?;
                    }
                    self.tick()?;
                }
                Ok(Flow::Normal)
            }
            Stmt::ForOf {
                kind,
                pattern,
                iter,
                body,
            } => {
                let iterable = self.eval_expr(iter, env)?;
                for item in self.iterate(&iterable)? {
                    let iter_env = Env::extend(env).into_ref();
                    self.bind(pattern, item, &iter_env, *kind)?;
                    match self.exec(body, &iter_env)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => (),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Block(stmts) => self.exec_block(stmts, &Env::extend(env).into_ref()),
            Stmt::Try {
                body,
                param,
                handler,
                finalizer,
            } => {
                let mut result = self.exec_block(body, &Env::extend(env).into_ref());
                if let Some(handler) = handler {
                    if let Err(e) = result {
                        result = if e.is_fatal() {
                            Err(e)
                        } else {
                            let caught = self.error_to_val(e);
                            let handler_env = Env::extend(env).into_ref();
                            match param {
                                Some(p) => self
                                    .bind(p, caught, &handler_env, DeclKind::Let)
                                    .and_then(|_| self.exec_block(handler, &handler_env)),
                                None => self.exec_block(handler, &handler_env),
                            }
                        };
                    }
                }
                if let Some(finalizer) = finalizer {
                    match self.exec_block(finalizer, &Env::extend(env).into_ref())? {
                        Flow::Normal => (),
                        flow => return Ok(flow),
                    }
                }
                result
            }
            Stmt::Expr(e) => {
                self.eval_expr(e, env)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Bind names in pattern to parts of value
    fn bind(
        &mut self,
        pattern: &Pattern,
        value: Val<T>,
        env: &EnvRef<T>,
        kind: DeclKind,
    ) -> Result<()> {
        match pattern {
            Pattern::Ident(name) => {
                let mut scope = env.lock().unwrap();
                match kind {
                    DeclKind::Var => {
                        scope.define(name, value);
                        Ok(())
                    }
                    DeclKind::Let => scope.declare(name, value, true),
                    DeclKind::Const => scope.declare(name, value, false),
                }
            }
            Pattern::Object(props) => {
                if value.is_nullish() {
                    return Err(Error::Type(format!(
                        "Cannot destructure '{value}' as it is {value}."
                    )));
                }
                for prop in props {
                    let mut v = self.get_member(&value, &prop.key)?;
                    if let (Val::Undefined, Some(default)) = (&v, &prop.default) {
                        v = self.eval_expr(default, env)?;
                    }
                    self.bind(&prop.target, v, env, kind)?;
                }
                Ok(())
            }
            Pattern::Array(elems) => {
                let items = self.iterate(&value)?;
                for (i, elem) in elems.iter().enumerate() {
                    let Some(elem) = elem else { continue };
                    let mut v = items.get(i).cloned().unwrap_or(Val::Undefined);
                    if let (Val::Undefined, Some(default)) = (&v, &elem.default) {
                        v = self.eval_expr(default, env)?;
                    }
                    self.bind(&elem.target, v, env, kind)?;
                }
                Ok(())
            }
        }
    }

    fn eval_expr(&mut self, expr: &Expr, env: &EnvRef<T>) -> Result<Val<T>> {
        match expr {
            Expr::Undefined => Ok(Val::Undefined),
            Expr::Null => Ok(Val::Null),
            Expr::Bool(b) => Ok(Val::Bool(*b)),
            Expr::Num(n) => Ok(Val::Num(*n)),
            Expr::Str(s) => Ok(Val::Str(s.clone())),
            Expr::Template(parts) => {
                let mut s = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Str(text) => s.push_str(text),
                        TemplatePart::Expr(e) => s.push_str(&self.eval_expr(e, env)?.to_js_string()),
                    }
                }
                Ok(Val::Str(s))
            }
            Expr::Array(items) => Ok(Val::array(self.eval_items(items, env)?)),
            Expr::Object(props) => self.eval_object(props, env),
            Expr::Ident(name) => lookup(env, name),
            Expr::Member {
                object,
                prop,
                optional,
            } => {
                let obj = self.eval_expr(object, env)?;
                if *optional && obj.is_nullish() {
                    return Ok(Val::Undefined);
                }
                let key = self.prop_key(prop, env)?;
                self.get_member(&obj, &key)
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => {
                let f = match &**callee {
                    Expr::Member {
                        object,
                        prop,
                        optional: optional_member,
                    } => {
                        let recv = self.eval_expr(object, env)?;
                        if *optional_member && recv.is_nullish() {
                            return Ok(Val::Undefined);
                        }
                        let key = self.prop_key(prop, env)?;
                        self.get_member(&recv, &key)?
                    }
                    callee => self.eval_expr(callee, env)?,
                };
                if *optional && f.is_nullish() {
                    return Ok(Val::Undefined);
                }
                if !f.is_callable() {
                    return Err(Error::Type(format!("{} is not a function", describe(callee))));
                }
                let args = self.eval_items(args, env)?;
                self.call(&f, args)
            }
            Expr::New { callee, args } => {
                let f = self.eval_expr(callee, env)?;
                let args = self.eval_items(args, env)?;
                match f {
                    Val::Native(_) | Val::Func(_) | Val::Extern(_) => self.construct(&f, args),
                    _ => Err(Error::Type(format!(
                        "{} is not a constructor",
                        describe(callee)
                    ))),
                }
            }
            Expr::Function(func) => Ok(Val::Func(Closure {
                func: Arc::clone(func),
                env: Arc::clone(env),
            })),
            Expr::Unary(UnaryOp::Typeof, operand) => {
                let value = match &**operand {
                    Expr::Ident(name) => env.lock().unwrap().get(name).unwrap_or(Val::Undefined),
                    e => self.eval_expr(e, env)?,
                };
                Ok(Val::string(value.type_of()))
            }
            Expr::Unary(op, operand) => {
                let value = self.eval_expr(operand, env)?;
                Ok(match op {
                    UnaryOp::Not => Val::Bool(!value.truthy()),
                    UnaryOp::Neg => Val::Num(-value.to_number()),
                    UnaryOp::Plus | UnaryOp::Typeof => Val::Num(value.to_number()),
                })
            }
            Expr::Update { op, prefix, target } => {
                let target = self.target(target, env)?;
                let old = self.read(&target, env)?.to_number();
                let new = match op {
                    UpdateOp::Inc => old + 1.0,
                    UpdateOp::Dec => old - 1.0,
                };
                self.write(&target, Val::Num(new), env)?;
                Ok(Val::Num(if *prefix { new } else { old }))
            }
            Expr::Binary(op, lhs, rhs) => {
                let a = self.eval_expr(lhs, env)?;
                let b = self.eval_expr(rhs, env)?;
                Ok(binary_op(*op, &a, &b))
            }
            Expr::Logical(op, lhs, rhs) => {
                let a = self.eval_expr(lhs, env)?;
                let short_circuit = match op {
                    LogicalOp::And => !a.truthy(),
                    LogicalOp::Or => a.truthy(),
                    LogicalOp::Nullish => !a.is_nullish(),
                };
                if short_circuit {
                    Ok(a)
                } else {
                    self.eval_expr(rhs, env)
                }
            }
            Expr::Conditional(test, cons, alt) => {
                if self.eval_expr(test, env)?.truthy() {
                    self.eval_expr(cons, env)
                } else {
                    self.eval_expr(alt, env)
                }
            }
            Expr::Assign { op, target, value } => {
                let target = self.target(target, env)?;
                let value = match op.binary() {
                    None => self.eval_expr(value, env)?,
                    Some(bin) => {
                        let current = self.read(&target, env)?;
                        let rhs = self.eval_expr(value, env)?;
                        binary_op(bin, &current, &rhs)
                    }
                };
                self.write(&target, value.clone(), env)?;
                Ok(value)
            }
        }
    }

    fn eval_items(&mut self, items: &[Item], env: &EnvRef<T>) -> Result<Vec<Val<T>>> {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Item::Expr(e) => values.push(self.eval_expr(e, env)?),
                Item::Spread(e) => {
                    let spread = self.eval_expr(e, env)?;
                    values.extend(self.iterate(&spread)?);
                }
            }
        }
        Ok(values)
    }

    fn eval_object(&mut self, props: &[Prop], env: &EnvRef<T>) -> Result<Val<T>> {
        let mut map = IndexMap::new();
        for prop in props {
            match prop {
                Prop::KeyValue(key, value) => {
                    let key = match key {
                        PropKey::Named(name) => name.clone(),
                        PropKey::Computed(e) => self.eval_expr(e, env)?.to_property_key(),
                    };
                    let value = self.eval_expr(value, env)?;
                    map.insert(key, value);
                }
                Prop::Spread(e) => match self.eval_expr(e, env)? {
                    Val::Object(o) => {
                        let entries = o.lock().unwrap().clone();
                        map.extend(entries);
                    }
                    Val::Array(a) => {
                        let items = a.lock().unwrap().clone();
                        map.extend(items.into_iter().enumerate().map(|(i, v)| (i.to_string(), v)));
                    }
                    _ => (),
                },
            }
        }
        Ok(Val::Object(Arc::new(Mutex::new(map))))
    }

    fn prop_key(&mut self, prop: &MemberProp, env: &EnvRef<T>) -> Result<String> {
        match prop {
            MemberProp::Named(name) => Ok(name.clone()),
            MemberProp::Computed(e) => Ok(self.eval_expr(e, env)?.to_property_key()),
        }
    }

    fn target(&mut self, expr: &Expr, env: &EnvRef<T>) -> Result<Target<T>> {
        match expr {
            Expr::Ident(name) => Ok(Target::Binding(name.clone())),
            Expr::Member { object, prop, .. } => {
                let obj = self.eval_expr(object, env)?;
                let key = self.prop_key(prop, env)?;
                Ok(Target::Member(obj, key))
            }
            _ => Err(Error::Syntax("Invalid left-hand side in assignment".to_string())),
        }
    }

    fn read(&mut self, target: &Target<T>, env: &EnvRef<T>) -> Result<Val<T>> {
        match target {
            Target::Binding(name) => lookup(env, name),
            Target::Member(obj, key) => self.get_member(obj, key),
        }
    }

    fn write(&mut self, target: &Target<T>, value: Val<T>, env: &EnvRef<T>) -> Result<()> {
        match target {
            Target::Binding(name) => env.lock().unwrap().set(name, value),
            Target::Member(obj, key) => self.set_member(obj, key, value),
        }
    }
}

impl<T: Extern> Default for Interp<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<T: Extern>(env: &EnvRef<T>, name: &str) -> Result<Val<T>> {
    env.lock()
        .unwrap()
        .get(name)
        .ok_or_else(|| Error::Undefined(name.to_string()))
}

/// Method value bound to its receiver
pub(crate) fn bind<T: Extern>(recv: &Val<T>, name: &str) -> Val<T> {
    Val::Method(Arc::new(BoundMethod {
        recv: recv.clone(),
        name: name.to_string(),
    }))
}

/// Message carried by a thrown value: `message` for error objects, string form otherwise
pub fn message_of<T: Extern>(value: &Val<T>) -> String {
    match value {
        Val::Error(e) => e.message.clone(),
        v => v.to_js_string(),
    }
}

/// Readable name of a callee for error messages
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member {
            object,
            prop: MemberProp::Named(name),
            ..
        } => format!("{}.{name}", describe(object)),
        Expr::Member { object, .. } => format!("{}[...]", describe(object)),
        Expr::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}

/// Whether `+` concatenates when value is an operand
fn concatenates<T: Extern>(value: &Val<T>) -> bool {
    !matches!(
        value,
        Val::Undefined | Val::Null | Val::Bool(_) | Val::Num(_)
    )
}

fn compare<T: Extern>(a: &Val<T>, b: &Val<T>) -> Option<Ordering> {
    match (a, b) {
        (Val::Str(x), Val::Str(y)) => Some(x.cmp(y)),
        _ => a.to_number().partial_cmp(&b.to_number()),
    }
}

/// Apply a binary operator to evaluated operands
pub fn binary_op<T: Extern>(op: BinaryOp, a: &Val<T>, b: &Val<T>) -> Val<T> {
    match op {
        BinaryOp::Add => match (a, b) {
            (Val::Num(x), Val::Num(y)) => Val::Num(x + y),
            _ if concatenates(a) || concatenates(b) => {
                Val::Str(a.to_js_string() + &b.to_js_string())
            }
            _ => Val::Num(a.to_number() + b.to_number()),
        },
        BinaryOp::Sub => Val::Num(a.to_number() - b.to_number()),
        BinaryOp::Mul => Val::Num(a.to_number() * b.to_number()),
        BinaryOp::Div => Val::Num(a.to_number() / b.to_number()),
        BinaryOp::Rem => Val::Num(a.to_number() % b.to_number()),
        BinaryOp::Pow => Val::Num(a.to_number().powf(b.to_number())),
        BinaryOp::Lt => Val::Bool(compare(a, b) == Some(Ordering::Less)),
        BinaryOp::Gt => Val::Bool(compare(a, b) == Some(Ordering::Greater)),
        BinaryOp::Le => Val::Bool(matches!(
            compare(a, b),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Ge => Val::Bool(matches!(
            compare(a, b),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Eq => Val::Bool(loose_eq(a, b)),
        BinaryOp::NotEq => Val::Bool(!loose_eq(a, b)),
        BinaryOp::StrictEq => Val::Bool(strict_eq(a, b)),
        BinaryOp::StrictNotEq => Val::Bool(!strict_eq(a, b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use void::Void;

    type Interp = super::Interp<Void>;
    type Val = super::Val<Void>;

    fn eval(text: &str) -> Result<Val> {
        Interp::new().eval(text)
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval("return 1 + 1").unwrap(), Val::Num(2.0));
        assert_eq!(eval("return 7 % 3 * 2 ** 2").unwrap(), Val::Num(4.0));
        assert_eq!(eval("return '1' + 1").unwrap(), Val::string("11"));
        assert_eq!(eval("return '3' * '4'").unwrap(), Val::Num(12.0));
    }

    #[test]
    fn call_depth_limit() {
        let prog = "const down = n => n == 0 ? 0 : 1 + down(n - 1); return down(N)";
        let mut interp = Interp::new();
        interp.set_call_depth_limit(20);
        assert_eq!(interp.eval(&prog.replace('N', "10")).unwrap(), Val::Num(10.0));
        assert_eq!(
            interp.eval(&prog.replace('N', "30")),
            Err(Error::Range("Maximum call stack size exceeded".to_string()))
        );
        assert_eq!(interp.eval(&prog.replace('N', "19")).unwrap(), Val::Num(19.0));
    }

    #[test]
    fn no_return_is_undefined() {
        assert_eq!(eval("1 + 1").unwrap(), Val::Undefined);
        assert_eq!(eval("").unwrap(), Val::Undefined);
    }

    #[test]
    fn undefined_name() {
        assert_eq!(
            eval("return missingThing + 1"),
            Err(Error::Undefined("missingThing".to_string()))
        );
        assert_eq!(eval("return typeof missingThing").unwrap(), Val::string("undefined"));
    }

    #[test]
    fn throw_error_message() {
        assert_eq!(
            eval("throw new Error('boom')"),
            Err(Error::Thrown("boom".to_string()))
        );
        assert_eq!(eval("throw 42"), Err(Error::Thrown("42".to_string())));
    }

    #[test]
    fn catch_thrown_value() {
        let prog = r#"
            try {
                throw {code: 7}
            } catch (e) {
                return e.code
            }
        "#;
        assert_eq!(eval(prog).unwrap(), Val::Num(7.0));
    }

    #[test]
    fn catch_native_error() {
        let prog = r#"
            try {
                null.foo
            } catch (e) {
                return e.name + ': ' + e.message
            }
        "#;
        assert_eq!(
            eval(prog).unwrap(),
            Val::string("TypeError: Cannot read properties of null (reading 'foo')")
        );
    }

    #[test]
    fn finally_runs() {
        let prog = r#"
            let log = []
            try {
                try { throw new Error('x') } finally { log.push('finally') }
            } catch (e) { log.push(e.message) }
            return log.join(',')
        "#;
        assert_eq!(eval(prog).unwrap(), Val::string("finally,x"));
    }

    #[test]
    fn step_limit_not_catchable() {
        let mut interp = Interp::new().with_step_limit(10_000);
        assert_eq!(
            interp.eval("try { while (true) {} } catch (e) { return 1 }"),
            Err(Error::StepLimit)
        );
    }

    #[test]
    fn const_assignment() {
        assert_eq!(
            eval("const x = 1; x = 2"),
            Err(Error::ConstAssign("x".to_string()))
        );
    }

    #[test]
    fn closures_capture_scope() {
        let prog = r#"
            function counter() {
                let n = 0
                return () => ++n
            }
            const next = counter()
            next(); next()
            return next()
        "#;
        assert_eq!(eval(prog).unwrap(), Val::Num(3.0));
    }

    #[test]
    fn hoisted_function() {
        assert_eq!(
            eval("return twice(4); function twice(x) { return x * 2 }").unwrap(),
            Val::Num(8.0)
        );
    }

    #[test]
    fn loops() {
        let prog = r#"
            let total = 0
            for (let i = 0; i < 10; i++) {
                if (i % 2) continue
                if (i > 6) break
                total += i
            }
            for (const x of [1, 2, 3]) total += x
            let j = 0
            while (j < 3) j++
            return total + j
        "#;
        assert_eq!(eval(prog).unwrap(), Val::Num(21.0));
    }

    #[test]
    fn destructuring_and_defaults() {
        let prog = r#"
            const {a, b: [first, , third = 9], c = 'dflt'} = {a: 1, b: [2, 3]}
            const f = ({x, y} = {}, scale = 2) => (x + y) * scale
            return [a, first, third, c, f({x: 1, y: 2})].join(' ')
        "#;
        assert_eq!(eval(prog).unwrap(), Val::string("1 2 9 dflt 6"));
    }

    #[test]
    fn spread_and_rest() {
        let prog = r#"
            const sum = (...xs) => xs.reduce((a, b) => a + b, 0)
            const base = {top: 1, left: 2}
            const margin = {...base, left: 5}
            return sum(...[1, 2, 3], margin.top, margin.left)
        "#;
        assert_eq!(eval(prog).unwrap(), Val::Num(12.0));
    }

    #[test]
    fn optional_chaining_and_nullish() {
        assert_eq!(eval("const o = null; return o?.x ?? 'none'").unwrap(), Val::string("none"));
        assert_eq!(eval("const o = {}; return o.f?.()").unwrap(), Val::Undefined);
    }

    #[test]
    fn not_a_function() {
        assert_matches!(
            eval("const o = {}; o.missing()"),
            Err(Error::Type(msg)) if msg == "o.missing is not a function"
        );
    }

    #[test]
    fn member_assignment() {
        let prog = r#"
            const o = {n: 1, list: []}
            o.n += 2
            o['k'] = 'v'
            o.list[2] = 'x'
            return [o.n, o.k, o.list.length].join()
        "#;
        assert_eq!(eval(prog).unwrap(), Val::string("3,v,3"));
    }

    #[test]
    fn template_literals() {
        assert_eq!(
            eval("const m = {left: 40, top: 20}; return `translate(${m.left},${m.top})`").unwrap(),
            Val::string("translate(40,20)")
        );
    }

    #[test]
    fn reset_budget() {
        let mut interp = Interp::new().with_step_limit(1_000);
        interp.eval("let i = 0; while (i < 50) i++").unwrap();
        assert!(interp.steps() > 0);
        interp.reset_budget();
        assert_eq!(interp.steps(), 0);
    }
}
