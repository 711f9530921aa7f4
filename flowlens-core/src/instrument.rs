//! Instrumentation of state-mutating engine operations
//!
//! [`Instrumentor::wrap`] is a wrap-and-delegate middleware: it emits a
//! `start` record, runs the operation, and emits the matching terminal
//! record (`finish` on success, `error` on failure), all three sharing one
//! freshly generated [`CallId`]. The wrapped operation's return value and
//! error pass through unchanged; the adapter is a pure side channel and adds
//! only queue-enqueue latency.
//!
//! An operation may self-report through [`CallContext::record_manual`]. A
//! manual record registers its call id, and the adapter then suppresses its
//! own `finish` for that call, so a logical action is never counted twice.

use crate::engine::{self, TaskEngine};
use crate::recorder::sanitize;
use crate::recorder::ActionSink;
use crate::types::{ActionRecord, CallId, ErrorInfo, Flow, Plan, Task, TaskStatus};
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Wraps named operations so they emit start/finish/error records.
pub struct Instrumentor {
    sink: Arc<dyn ActionSink>,
    /// Call ids the operation itself already reported; consumed by the
    /// finish-path dedup check, so this holds in-flight calls only.
    manual_calls: Mutex<HashSet<CallId>>,
    payload_cap_bytes: usize,
}

impl Instrumentor {
    pub fn new(sink: Arc<dyn ActionSink>, payload_cap_bytes: usize) -> Self {
        Self {
            sink,
            manual_calls: Mutex::new(HashSet::new()),
            payload_cap_bytes,
        }
    }

    /// Run `op` under instrumentation.
    ///
    /// Emits a `start` record with the sanitized `args`, then the terminal
    /// record for the outcome. Success values must be serializable so the
    /// `finish` payload can carry them; errors only need a display form.
    pub fn wrap<T, E, F>(
        &self,
        flow_id: &str,
        task_id: Option<&str>,
        action_type: &str,
        args: serde_json::Value,
        op: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize,
        E: std::fmt::Display,
        F: FnOnce(&CallContext<'_>) -> std::result::Result<T, E>,
    {
        let call_id = CallId::new();
        let args = sanitize::sanitize_value(args, self.payload_cap_bytes);
        self.sink.record(ActionRecord::start(
            call_id.clone(),
            flow_id,
            task_id,
            action_type,
            args,
        ));

        let ctx = CallContext {
            instrumentor: self,
            call_id: call_id.clone(),
            flow_id: flow_id.to_string(),
            task_id: task_id.map(str::to_string),
            action_type: action_type.to_string(),
        };

        match op(&ctx) {
            Ok(value) => {
                if !self.take_manual(&call_id) {
                    let payload = sanitize::to_recorded_value(&value, self.payload_cap_bytes);
                    self.sink.record(ActionRecord::finish(
                        call_id,
                        flow_id,
                        task_id,
                        action_type,
                        payload,
                    ));
                }
                Ok(value)
            }
            Err(err) => {
                // a failed call may have self-reported before failing;
                // clear the marker so it cannot leak onto a later call
                self.take_manual(&call_id);
                let info = ErrorInfo {
                    kind: error_kind::<E>(),
                    message: err.to_string(),
                };
                self.sink.record(ActionRecord::error(
                    call_id,
                    flow_id,
                    task_id,
                    action_type,
                    info,
                ));
                Err(err)
            }
        }
    }

    fn note_manual(&self, call_id: &CallId) {
        self.manual_lock().insert(call_id.clone());
    }

    fn take_manual(&self, call_id: &CallId) -> bool {
        self.manual_lock().remove(call_id)
    }

    fn manual_lock(&self) -> MutexGuard<'_, HashSet<CallId>> {
        self.manual_calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handed to a wrapped operation so it can self-report.
pub struct CallContext<'a> {
    instrumentor: &'a Instrumentor,
    call_id: CallId,
    flow_id: String,
    task_id: Option<String>,
    action_type: String,
}

impl CallContext<'_> {
    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    /// Emit a `manual` finish record for this call.
    ///
    /// Registers the call id so the adapter skips its own `finish`.
    pub fn record_manual(&self, payload: serde_json::Value) {
        self.instrumentor.note_manual(&self.call_id);
        let payload =
            sanitize::sanitize_value(payload, self.instrumentor.payload_cap_bytes);
        self.instrumentor.sink.record(ActionRecord::manual_finish(
            self.call_id.clone(),
            &self.flow_id,
            self.task_id.as_deref(),
            &self.action_type,
            payload,
        ));
    }
}

/// Last path segment of a type name, e.g. "Error" for crate::error::Error.
fn error_kind<E>() -> String {
    let name = std::any::type_name::<E>();
    name.rsplit("::").next().unwrap_or(name).to_string()
}

// ============================================
// Instrumented engine surface
// ============================================

/// The instrumented face of the task engine.
///
/// Every state-mutating operation runs under [`Instrumentor::wrap`] with its
/// operation name; read accessors pass through uninstrumented. Ids for new
/// entities are generated before the wrap so the `start` record already
/// carries the scope it is creating.
pub struct InstrumentedEngine {
    engine: Mutex<TaskEngine>,
    instrumentor: Instrumentor,
}

impl InstrumentedEngine {
    pub fn new(sink: Arc<dyn ActionSink>, payload_cap_bytes: usize) -> Self {
        Self {
            engine: Mutex::new(TaskEngine::new()),
            instrumentor: Instrumentor::new(sink, payload_cap_bytes),
        }
    }

    fn lock_engine(&self) -> MutexGuard<'_, TaskEngine> {
        self.engine.lock().unwrap_or_else(|e| e.into_inner())
    }

    // Flows

    pub fn create_flow(&self, name: &str) -> crate::error::Result<Flow> {
        let flow_id = engine::generate_id();
        self.instrumentor
            .wrap(&flow_id, None, "create_flow", json!({ "name": name }), |_| {
                Ok(self.lock_engine().create_flow_with_id(flow_id.clone(), name))
            })
    }

    pub fn rename_flow(&self, flow_id: &str, name: &str) -> crate::error::Result<Flow> {
        self.instrumentor
            .wrap(flow_id, None, "rename_flow", json!({ "name": name }), |_| {
                self.lock_engine().rename_flow(flow_id, name)
            })
    }

    pub fn delete_flow(&self, flow_id: &str) -> crate::error::Result<()> {
        self.instrumentor
            .wrap(flow_id, None, "delete_flow", json!({}), |_| {
                self.lock_engine().delete_flow(flow_id)
            })
    }

    // Plans

    pub fn create_plan(&self, flow_id: &str, title: &str) -> crate::error::Result<Plan> {
        let plan_id = engine::generate_id();
        self.instrumentor.wrap(
            flow_id,
            None,
            "create_plan",
            json!({ "title": title, "plan_id": plan_id }),
            |_| {
                self.lock_engine()
                    .create_plan_with_id(plan_id.clone(), flow_id, title)
            },
        )
    }

    pub fn delete_plan(&self, flow_id: &str, plan_id: &str) -> crate::error::Result<()> {
        self.instrumentor.wrap(
            flow_id,
            None,
            "delete_plan",
            json!({ "plan_id": plan_id }),
            |_| self.lock_engine().delete_plan(flow_id, plan_id),
        )
    }

    // Tasks

    pub fn create_task(
        &self,
        flow_id: &str,
        plan_id: Option<&str>,
        title: &str,
    ) -> crate::error::Result<Task> {
        let task_id = engine::generate_id();
        self.instrumentor.wrap(
            flow_id,
            Some(&task_id),
            "create_task",
            json!({ "title": title, "plan_id": plan_id }),
            |_| {
                self.lock_engine()
                    .create_task_with_id(task_id.clone(), flow_id, plan_id, title)
            },
        )
    }

    /// Change a task's status.
    ///
    /// The engine self-reports the applied transition, which carries more
    /// than the generic wrapper would capture from the return value alone.
    pub fn update_task_status(
        &self,
        flow_id: &str,
        task_id: &str,
        status: TaskStatus,
    ) -> crate::error::Result<Task> {
        self.instrumentor.wrap(
            flow_id,
            Some(task_id),
            "update_task_status",
            json!({ "status": status.as_str() }),
            |ctx| {
                let task = self.lock_engine().update_task_status(flow_id, task_id, status)?;
                ctx.record_manual(json!({
                    "task_id": task.id,
                    "status": task.status.as_str(),
                    "updated_at": task.updated_at.to_rfc3339(),
                }));
                Ok(task)
            },
        )
    }

    pub fn rename_task(
        &self,
        flow_id: &str,
        task_id: &str,
        title: &str,
    ) -> crate::error::Result<Task> {
        self.instrumentor.wrap(
            flow_id,
            Some(task_id),
            "rename_task",
            json!({ "title": title }),
            |_| self.lock_engine().rename_task(flow_id, task_id, title),
        )
    }

    pub fn delete_task(&self, flow_id: &str, task_id: &str) -> crate::error::Result<()> {
        self.instrumentor.wrap(
            flow_id,
            Some(task_id),
            "delete_task",
            json!({}),
            |_| self.lock_engine().delete_task(flow_id, task_id),
        )
    }

    // Read accessors (not state-mutating, not instrumented)

    pub fn get_flow(&self, flow_id: &str) -> Option<Flow> {
        self.lock_engine().get_flow(flow_id).cloned()
    }

    pub fn list_flows(&self) -> Vec<Flow> {
        self.lock_engine().list_flows().into_iter().cloned().collect()
    }

    pub fn get_plan(&self, plan_id: &str) -> Option<Plan> {
        self.lock_engine().get_plan(plan_id).cloned()
    }

    pub fn list_plans(&self, flow_id: &str) -> Vec<Plan> {
        self.lock_engine()
            .list_plans(flow_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn get_task(&self, task_id: &str) -> Option<Task> {
        self.lock_engine().get_task(task_id).cloned()
    }

    pub fn list_tasks(&self, flow_id: &str) -> Vec<Task> {
        self.lock_engine()
            .list_tasks(flow_id)
            .into_iter()
            .cloned()
            .collect()
    }
}
