//! Scatter/gather phases over a [`TaskEngine`]
//!
//! A [`Scatter`] submits one task per item and returns a [`ScatterHandle`];
//! a [`Gather`] depends on whole handles, so it starts only once every
//! scattered task succeeded and is skipped otherwise.

use crate::engine::{Task, TaskEngine, TaskId};

/// The tasks of one scatter, as a single dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScatterHandle {
    name: String,
    ids: Vec<TaskId>,
}

impl ScatterHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ids(&self) -> &[TaskId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Fan-out of one task per item
pub struct Scatter<'a, T> {
    name: String,
    items: &'a [T],
    after: Vec<TaskId>,
}

impl<'a, T> Scatter<'a, T> {
    pub fn new(name: impl Into<String>, items: &'a [T]) -> Self {
        Self {
            name: name.into(),
            items,
            after: Vec::new(),
        }
    }

    /// Every scattered task also waits for `id`
    pub fn after(mut self, id: TaskId) -> Self {
        self.after.push(id);
        self
    }

    pub fn submit<E, F>(self, engine: &mut E, template: F) -> ScatterHandle
    where
        E: TaskEngine,
        F: Fn(&T) -> Task,
    {
        let ids = if self.after.is_empty() {
            engine.expand_parallel(template, self.items)
        } else {
            self.items
                .iter()
                .map(|item| engine.submit(template(item), &self.after))
                .collect()
        };
        tracing::debug!(phase = %self.name, tasks = ids.len(), "Scattered tasks");
        ScatterHandle {
            name: self.name,
            ids,
        }
    }
}

/// Fan-in task depending on whole scatters
pub struct Gather {
    task: Task,
    after: Vec<TaskId>,
}

impl Gather {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            after: Vec::new(),
        }
    }

    pub fn after(mut self, handle: &ScatterHandle) -> Self {
        self.after.extend_from_slice(handle.ids());
        self
    }

    pub fn after_task(mut self, id: TaskId) -> Self {
        self.after.push(id);
        self
    }

    pub fn submit<E: TaskEngine>(self, engine: &mut E) -> TaskId {
        engine.submit(self.task, &self.after)
    }
}
