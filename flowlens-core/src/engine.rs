//! In-memory Flow/Plan/Task engine
//!
//! The tracking engine itself is a plain entity store; flowlens cares about
//! it only as the surface whose state-mutating operations get instrumented
//! (see [`crate::instrument`]). Deleting a flow cascades to its plans and
//! tasks; deleting a plan detaches its tasks.

use crate::error::{Error, Result};
use crate::types::{Flow, Plan, Task, TaskStatus};
use chrono::Utc;
use std::collections::HashMap;

/// Generate a fresh entity id (UUIDv4).
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Entity store for flows, plans, and tasks.
#[derive(Debug, Default)]
pub struct TaskEngine {
    flows: HashMap<String, Flow>,
    plans: HashMap<String, Plan>,
    tasks: HashMap<String, Task>,
}

impl TaskEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================
    // Flows
    // ============================================

    pub fn create_flow(&mut self, name: &str) -> Flow {
        self.create_flow_with_id(generate_id(), name)
    }

    /// Create a flow under a caller-chosen id.
    pub fn create_flow_with_id(&mut self, id: String, name: &str) -> Flow {
        let flow = Flow {
            id: id.clone(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.flows.insert(id, flow.clone());
        flow
    }

    pub fn rename_flow(&mut self, flow_id: &str, name: &str) -> Result<Flow> {
        let flow = self
            .flows
            .get_mut(flow_id)
            .ok_or_else(|| Error::FlowNotFound(flow_id.to_string()))?;
        flow.name = name.to_string();
        Ok(flow.clone())
    }

    pub fn delete_flow(&mut self, flow_id: &str) -> Result<()> {
        self.flows
            .remove(flow_id)
            .ok_or_else(|| Error::FlowNotFound(flow_id.to_string()))?;
        self.plans.retain(|_, p| p.flow_id != flow_id);
        self.tasks.retain(|_, t| t.flow_id != flow_id);
        Ok(())
    }

    pub fn get_flow(&self, flow_id: &str) -> Option<&Flow> {
        self.flows.get(flow_id)
    }

    pub fn list_flows(&self) -> Vec<&Flow> {
        let mut flows: Vec<&Flow> = self.flows.values().collect();
        flows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        flows
    }

    // ============================================
    // Plans
    // ============================================

    pub fn create_plan(&mut self, flow_id: &str, title: &str) -> Result<Plan> {
        self.create_plan_with_id(generate_id(), flow_id, title)
    }

    pub fn create_plan_with_id(&mut self, id: String, flow_id: &str, title: &str) -> Result<Plan> {
        if !self.flows.contains_key(flow_id) {
            return Err(Error::FlowNotFound(flow_id.to_string()));
        }
        let plan = Plan {
            id: id.clone(),
            flow_id: flow_id.to_string(),
            title: title.to_string(),
            created_at: Utc::now(),
        };
        self.plans.insert(id, plan.clone());
        Ok(plan)
    }

    pub fn delete_plan(&mut self, flow_id: &str, plan_id: &str) -> Result<()> {
        match self.plans.get(plan_id) {
            Some(plan) if plan.flow_id == flow_id => {}
            _ => return Err(Error::PlanNotFound(plan_id.to_string())),
        }
        self.plans.remove(plan_id);
        // tasks survive their plan, detached
        for task in self.tasks.values_mut() {
            if task.plan_id.as_deref() == Some(plan_id) {
                task.plan_id = None;
                task.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    pub fn get_plan(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.get(plan_id)
    }

    pub fn list_plans(&self, flow_id: &str) -> Vec<&Plan> {
        let mut plans: Vec<&Plan> = self
            .plans
            .values()
            .filter(|p| p.flow_id == flow_id)
            .collect();
        plans.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        plans
    }

    // ============================================
    // Tasks
    // ============================================

    pub fn create_task(
        &mut self,
        flow_id: &str,
        plan_id: Option<&str>,
        title: &str,
    ) -> Result<Task> {
        self.create_task_with_id(generate_id(), flow_id, plan_id, title)
    }

    pub fn create_task_with_id(
        &mut self,
        id: String,
        flow_id: &str,
        plan_id: Option<&str>,
        title: &str,
    ) -> Result<Task> {
        if !self.flows.contains_key(flow_id) {
            return Err(Error::FlowNotFound(flow_id.to_string()));
        }
        if let Some(plan_id) = plan_id {
            match self.plans.get(plan_id) {
                Some(plan) if plan.flow_id == flow_id => {}
                _ => return Err(Error::PlanNotFound(plan_id.to_string())),
            }
        }
        let now = Utc::now();
        let task = Task {
            id: id.clone(),
            flow_id: flow_id.to_string(),
            plan_id: plan_id.map(str::to_string),
            title: title.to_string(),
            status: TaskStatus::Todo,
            created_at: now,
            updated_at: now,
        };
        self.tasks.insert(id, task.clone());
        Ok(task)
    }

    pub fn update_task_status(
        &mut self,
        flow_id: &str,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<Task> {
        let task = self.flow_task_mut(flow_id, task_id)?;
        task.status = status;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    pub fn rename_task(&mut self, flow_id: &str, task_id: &str, title: &str) -> Result<Task> {
        let task = self.flow_task_mut(flow_id, task_id)?;
        task.title = title.to_string();
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    pub fn delete_task(&mut self, flow_id: &str, task_id: &str) -> Result<()> {
        match self.tasks.get(task_id) {
            Some(task) if task.flow_id == flow_id => {}
            _ => return Err(Error::TaskNotFound(task_id.to_string())),
        }
        self.tasks.remove(task_id);
        Ok(())
    }

    pub fn get_task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    pub fn list_tasks(&self, flow_id: &str) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .values()
            .filter(|t| t.flow_id == flow_id)
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        tasks
    }

    fn flow_task_mut(&mut self, flow_id: &str, task_id: &str) -> Result<&mut Task> {
        match self.tasks.get_mut(task_id) {
            Some(task) if task.flow_id == flow_id => Ok(task),
            _ => Err(Error::TaskNotFound(task_id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_task_lifecycle() {
        let mut engine = TaskEngine::new();
        let flow = engine.create_flow("demo");
        let plan = engine.create_plan(&flow.id, "milestone 1").unwrap();
        let task = engine
            .create_task(&flow.id, Some(&plan.id), "write parser")
            .unwrap();
        assert_eq!(task.status, TaskStatus::Todo);

        let task = engine
            .update_task_status(&flow.id, &task.id, TaskStatus::Done)
            .unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(engine.list_tasks(&flow.id).len(), 1);

        engine.delete_task(&flow.id, &task.id).unwrap();
        assert!(engine.list_tasks(&flow.id).is_empty());
    }

    #[test]
    fn test_unknown_ids_error() {
        let mut engine = TaskEngine::new();
        assert!(matches!(
            engine.create_task("nope", None, "t"),
            Err(Error::FlowNotFound(_))
        ));

        let flow = engine.create_flow("demo");
        assert!(matches!(
            engine.update_task_status(&flow.id, "nope", TaskStatus::Done),
            Err(Error::TaskNotFound(_))
        ));
        assert!(matches!(
            engine.create_task(&flow.id, Some("nope"), "t"),
            Err(Error::PlanNotFound(_))
        ));
    }

    #[test]
    fn test_task_must_belong_to_flow() {
        let mut engine = TaskEngine::new();
        let flow_a = engine.create_flow("a");
        let flow_b = engine.create_flow("b");
        let task = engine.create_task(&flow_a.id, None, "t").unwrap();

        assert!(matches!(
            engine.update_task_status(&flow_b.id, &task.id, TaskStatus::Done),
            Err(Error::TaskNotFound(_))
        ));
    }

    #[test]
    fn test_delete_flow_cascades() {
        let mut engine = TaskEngine::new();
        let flow = engine.create_flow("demo");
        let plan = engine.create_plan(&flow.id, "p").unwrap();
        engine.create_task(&flow.id, Some(&plan.id), "t").unwrap();

        engine.delete_flow(&flow.id).unwrap();
        assert!(engine.get_flow(&flow.id).is_none());
        assert!(engine.list_plans(&flow.id).is_empty());
        assert!(engine.list_tasks(&flow.id).is_empty());
    }

    #[test]
    fn test_delete_plan_detaches_tasks() {
        let mut engine = TaskEngine::new();
        let flow = engine.create_flow("demo");
        let plan = engine.create_plan(&flow.id, "p").unwrap();
        let task = engine.create_task(&flow.id, Some(&plan.id), "t").unwrap();

        engine.delete_plan(&flow.id, &plan.id).unwrap();
        let task = engine.get_task(&task.id).unwrap();
        assert!(task.plan_id.is_none());
    }
}
