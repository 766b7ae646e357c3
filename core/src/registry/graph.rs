use std::collections::{HashMap, HashSet};

use crate::error::ConfigError;

use super::spec::{StepKind, TaskSpec};

/// Process-wide catalogue of task specifications, validated at construction.
///
/// # Validation
///
/// 1. Every id is non-empty, unique, and has a command
/// 2. Every dependency id exists in the catalogue
/// 3. The dependency graph is acyclic (DFS with a recursion stack)
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    /// task_id -> spec
    nodes: HashMap<String, TaskSpec>,

    /// task_id -> de-duplicated dependency ids, declaration order
    edges: HashMap<String, Vec<String>>,

    /// Original registration order (for stable listings)
    insertion_order: Vec<String>,
}

impl TaskRegistry {
    pub fn new(tasks: Vec<TaskSpec>) -> Result<Self, ConfigError> {
        let mut nodes = HashMap::new();
        let mut edges = HashMap::new();
        let mut insertion_order = Vec::new();

        for task in tasks {
            if task.id.trim().is_empty() {
                return Err(ConfigError::InvalidTask {
                    task_id: task.id,
                    reason: "id must not be empty".into(),
                });
            }
            if task.command.trim().is_empty() {
                return Err(ConfigError::InvalidTask {
                    task_id: task.id,
                    reason: "command must not be empty".into(),
                });
            }
            if nodes.contains_key(&task.id) {
                return Err(ConfigError::DuplicateTaskId(task.id));
            }

            let mut seen = HashSet::new();
            let deps: Vec<String> = task
                .dependencies
                .iter()
                .filter(|d| seen.insert(d.as_str()))
                .cloned()
                .collect();

            insertion_order.push(task.id.clone());
            edges.insert(task.id.clone(), deps);
            nodes.insert(task.id.clone(), task);
        }

        let registry = Self {
            nodes,
            edges,
            insertion_order,
        };
        registry.validate()?;
        Ok(registry)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for task_id in &self.insertion_order {
            for dep in &self.edges[task_id] {
                if !self.nodes.contains_key(dep) {
                    return Err(ConfigError::DependencyNotFound {
                        task_id: task_id.clone(),
                        missing_dep: dep.clone(),
                    });
                }
            }
        }

        if let Some(cycle) = self.detect_cycle() {
            return Err(ConfigError::CircularDependency(cycle));
        }

        Ok(())
    }

    pub fn resolve(&self, id: &str) -> Result<&TaskSpec, ConfigError> {
        self.nodes
            .get(id)
            .ok_or_else(|| ConfigError::TaskNotFound(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<&TaskSpec> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn dependencies_of(&self, id: &str) -> Result<&[String], ConfigError> {
        self.edges
            .get(id)
            .map(Vec::as_slice)
            .ok_or_else(|| ConfigError::TaskNotFound(id.to_string()))
    }

    /// Ids in registration order.
    pub fn ids(&self) -> &[String] {
        &self.insertion_order
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskSpec> {
        self.insertion_order.iter().map(move |id| &self.nodes[id])
    }

    pub fn tasks_of_kind(&self, kind: StepKind) -> Vec<&TaskSpec> {
        self.iter().filter(|t| t.kind == kind).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Full topological order (Kahn), ties broken by registration order.
    pub fn topological_order(&self) -> Vec<String> {
        let mut remaining: HashMap<&str, usize> = self
            .insertion_order
            .iter()
            .map(|id| (id.as_str(), self.edges[id].len()))
            .collect();
        let mut order = Vec::with_capacity(self.len());
        let mut done: HashSet<&str> = HashSet::new();

        while order.len() < self.len() {
            let Some(next) = self
                .insertion_order
                .iter()
                .find(|id| !done.contains(id.as_str()) && remaining[id.as_str()] == 0)
            else {
                // validated acyclic at construction
                break;
            };
            done.insert(next.as_str());
            order.push(next.clone());
            for id in &self.insertion_order {
                if self.edges[id].iter().any(|d| d == next) {
                    if let Some(r) = remaining.get_mut(id.as_str()) {
                        *r -= 1;
                    }
                }
            }
        }

        order
    }

    /// Detect circular dependencies using DFS
    ///
    /// # Time Complexity
    ///
    /// O(V + E) where V = number of tasks, E = number of dependencies
    fn detect_cycle(&self) -> Option<String> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for task_id in &self.insertion_order {
            if !visited.contains(task_id) && self.dfs_cycle(task_id, &mut visited, &mut stack) {
                return Some(format_cycle_path(&stack));
            }
        }

        None
    }

    fn dfs_cycle(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        stack: &mut Vec<String>,
    ) -> bool {
        visited.insert(node.to_string());
        stack.push(node.to_string());

        if let Some(dependencies) = self.edges.get(node) {
            for dep in dependencies {
                // dependency already on the current path: cycle
                if let Some(pos) = stack.iter().position(|x| x == dep) {
                    stack.push(dep.clone());
                    *stack = stack[pos..].to_vec();
                    return true;
                }

                if !visited.contains(dep) && self.dfs_cycle(dep, visited, stack) {
                    return true;
                }
            }
        }

        stack.pop();
        false
    }
}

fn format_cycle_path(stack: &[String]) -> String {
    stack.join(" -> ")
}
