//! Driver - runs programs to quiescence
//!
//! The driver owns an [`Engine`], installs the host's natives into a global
//! scope and runs a program. While the program is suspended it drains the
//! scheduler's ready queue and moves the clock forward to the next timer.
//! `run` skips ahead on a virtual clock; `run_realtime` sleeps until each
//! timer is due.

use super::env::{Env, Scope};
use super::errors::ErrorInfo;
use super::host::{Host, Origin};
use super::types::{Completion, Node, NodeRef, Outcome, RootId, Val};
use super::vm::Engine;
use crate::config::Config;
use crate::error::{Result, StrataError};
use serde::Serialize;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Final state of a program run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed(Val),
    /// Uncaught throw, or a control signal that escaped the program
    Threw(ErrorInfo),
    /// Still waiting, with no timer or task left that could wake it
    Suspended,
}

enum Started {
    Finished(RunOutcome),
    Suspended(RootId),
}

/// What to do after draining the ready queue
enum Progress {
    Finished(RunOutcome),
    /// Nothing is ready; the next timer is due at this time
    WaitUntil(u64),
}

pub struct Driver {
    engine: Engine,
    globals: Scope,
    max_tasks: usize,
    tasks_run: usize,
    run_id: Uuid,
}

impl Driver {
    pub fn new(host: Box<dyn Host>, config: &Config) -> Self {
        let engine = Engine::new(host, config);
        let globals = Scope::root();
        for name in engine.host().natives() {
            globals.define(&name, Val::Native(name.clone()));
        }
        Driver {
            engine,
            globals,
            max_tasks: config.max_tasks_per_run,
            tasks_run: 0,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn globals(&self) -> &Scope {
        &self.globals
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Fresh top-level environment for a program from `file`
    pub fn root_env(&self, file: &str) -> Rc<Env> {
        Rc::new(Env::new(self.globals.child(), file))
    }

    /// Run `program` on the virtual clock.
    pub fn run(&mut self, program: &NodeRef, file: &str) -> Result<RunOutcome> {
        let span = info_span!("run", run_id = %self.run_id, file);
        let _enter = span.enter();

        let root = match self.start(program, file)? {
            Started::Finished(outcome) => return Ok(outcome),
            Started::Suspended(root) => root,
        };
        loop {
            match self.settle(root)? {
                Progress::Finished(outcome) => return Ok(outcome),
                Progress::WaitUntil(due) => self.engine.scheduler().advance_to(due),
            }
        }
    }

    /// Run `program`, waiting for timers in real time.
    pub async fn run_realtime(&mut self, program: &NodeRef, file: &str) -> Result<RunOutcome> {
        let span = info_span!("run", run_id = %self.run_id, file, realtime = true);
        self.run_realtime_inner(program, file).instrument(span).await
    }

    async fn run_realtime_inner(&mut self, program: &NodeRef, file: &str) -> Result<RunOutcome> {
        let root = match self.start(program, file)? {
            Started::Finished(outcome) => return Ok(outcome),
            Started::Suspended(root) => root,
        };
        loop {
            match self.settle(root)? {
                Progress::Finished(outcome) => return Ok(outcome),
                Progress::WaitUntil(due) => {
                    let now = self.engine.scheduler().now();
                    if due > now {
                        tokio::time::sleep(Duration::from_millis(due - now)).await;
                    }
                    self.engine.scheduler().advance_to(due);
                }
            }
        }
    }

    /// Execute the program; a suspended program is attached as a root.
    fn start(&mut self, program: &NodeRef, file: &str) -> Result<Started> {
        let env = self.root_env(file);
        match self.engine.execute(program, env) {
            Outcome::Done(c) => {
                self.drain()?;
                Ok(Started::Finished(self.conclude(c)))
            }
            Outcome::Pending(id) => {
                debug!(frame = %id, "program suspended");
                Ok(Started::Suspended(self.engine.attach_root(id)))
            }
            Outcome::Delivered => Ok(Started::Finished(self.conclude(Completion::internal(
                "program delivered its result to a parent",
            )))),
        }
    }

    fn settle(&mut self, root: RootId) -> Result<Progress> {
        self.drain()?;
        if let Some(c) = self.engine.take_root(root) {
            // Let strata that finished with the program report
            self.drain()?;
            return Ok(Progress::Finished(self.conclude(c)));
        }
        match self.engine.scheduler().next_due() {
            Some(due) => Ok(Progress::WaitUntil(due)),
            None => {
                warn!(
                    live_frames = self.engine.live_frames(),
                    "program suspended with nothing left to wake it"
                );
                Ok(Progress::Finished(RunOutcome::Suspended))
            }
        }
    }

    /// Run ready tasks until the queue is empty.
    fn drain(&mut self) -> Result<()> {
        while let Some(task) = self.engine.scheduler().pop_ready() {
            self.tasks_run += 1;
            if self.tasks_run > self.max_tasks {
                return Err(StrataError::TaskBudgetExceeded(self.max_tasks));
            }
            self.engine.run_task(task);
        }
        Ok(())
    }

    fn conclude(&mut self, completion: Completion) -> RunOutcome {
        match completion {
            Completion::Value(v) => {
                info!(tasks = self.tasks_run, "program completed");
                RunOutcome::Completed(v)
            }
            Completion::Signal(signal) => {
                self.engine.report(Origin::Program, &signal);
                let error = signal.escaped();
                info!(tasks = self.tasks_run, error = %error, "program threw");
                RunOutcome::Threw(error)
            }
        }
    }
}

/// Read a JSON program from `path`
pub fn load_program(path: &Path) -> Result<NodeRef> {
    let source = std::fs::read_to_string(path).map_err(|source| StrataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_program(&source)
}

pub fn parse_program(source: &str) -> Result<NodeRef> {
    let node: Node = serde_json::from_str(source)?;
    Ok(Rc::new(node))
}
