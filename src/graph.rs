// src/graph.rs

//! Arena of task nodes plus the dependency edges between them.
//!
//! Acyclicity is enforced at edge-insertion time: an edge is rejected, and
//! the graph left untouched, if the would-be dependent is already reachable
//! from the would-be dependency. A parallel `petgraph` graph (node index ==
//! arena index) carries the adjacency used for that reachability check; the
//! per-node `dependencies` lists are the mutable scheduling state and shrink
//! as ancestors finish.

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::errors::{Error, Result};
use crate::task::{Task, TaskId};

pub(crate) struct TaskGraph {
    tasks: Vec<Task>,
    /// Edge `a -> b` means "a depends on b". Edges are never removed.
    edges: DiGraph<(), ()>,
}

impl TaskGraph {
    pub(crate) fn new() -> Self {
        Self {
            tasks: Vec::new(),
            edges: DiGraph::new(),
        }
    }

    pub(crate) fn add_task(&mut self, task: Task) -> TaskId {
        let id = TaskId(self.tasks.len());
        self.tasks.push(task);
        let index = self.edges.add_node(());
        debug_assert_eq!(index.index(), id.0);
        id
    }

    pub(crate) fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id.0]
    }

    pub(crate) fn task_mut(&mut self, id: TaskId) -> &mut Task {
        &mut self.tasks[id.0]
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Insert the edge "`task` depends on `dependency`".
    ///
    /// Rejects self-edges, duplicate edges, and any edge that would close a
    /// cycle; in every rejection case the graph is unchanged.
    pub(crate) fn add_dependency(&mut self, task: TaskId, dependency: TaskId) -> Result<()> {
        if task == dependency
            || has_path_connecting(&self.edges, nx(dependency), nx(task), None)
        {
            return Err(Error::CyclicDependency {
                task: self.task(task).name().to_string(),
                dependency: self.task(dependency).name().to_string(),
            });
        }
        if self.tasks[task.0].dependencies.contains(&dependency) {
            return Err(Error::DuplicateDependency {
                task: self.task(task).name().to_string(),
                dependency: self.task(dependency).name().to_string(),
            });
        }

        self.edges.add_edge(nx(task), nx(dependency), ());
        self.tasks[task.0].dependencies.push(dependency);
        self.tasks[dependency.0].dependents.push(task);
        debug!(
            task = %self.task(task).name(),
            dependency = %self.task(dependency).name(),
            "dependency edge added"
        );
        Ok(())
    }

    pub(crate) fn find(&self, name: &str) -> Option<TaskId> {
        self.tasks
            .iter()
            .position(|t| t.name() == name)
            .map(TaskId)
    }
}

fn nx(id: TaskId) -> NodeIndex {
    NodeIndex::new(id.0)
}
