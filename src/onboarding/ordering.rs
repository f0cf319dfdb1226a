//! Session-scoped display order for a user's checklist.
//!
//! Each week bucket keeps its active (incomplete) tasks in rank order and its
//! completed tasks in fetch order. Ranks are positions in the active list, so
//! they are always contiguous `0..n`. Nothing here is written to the ledger: a
//! new session starts again from the order the tasks were fetched in.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::types::{Task, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderingError {
    #[error("task {0} is not on this checklist")]
    UnknownTask(TaskId),
    #[error("week {0} is not on this checklist")]
    UnknownWeek(i32),
    #[error("task {0} is already completed")]
    AlreadyCompleted(TaskId),
    #[error("task {0} is not completed")]
    NotCompleted(TaskId),
    #[error("index {index} out of range for {len} active tasks")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct WeekBucket {
    active: Vec<TaskId>,
    completed: Vec<TaskId>,
}

#[derive(Debug, Clone, Default)]
pub struct ChecklistSession {
    weeks: BTreeMap<i32, WeekBucket>,
    week_of: HashMap<TaskId, i32>,
    fetch_pos: HashMap<TaskId, usize>,
}

impl ChecklistSession {
    /// Builds the session from tasks in the order the server returned them.
    pub fn from_fetch(tasks: &[Task], completed: &HashSet<TaskId>) -> Self {
        let mut session = Self::default();
        for (pos, task) in tasks.iter().enumerate() {
            if session.fetch_pos.contains_key(&task.id) {
                continue;
            }
            session.fetch_pos.insert(task.id, pos);
            session.week_of.insert(task.id, task.week_num);
            let bucket = session.weeks.entry(task.week_num).or_default();
            if completed.contains(&task.id) {
                bucket.completed.push(task.id);
            } else {
                bucket.active.push(task.id);
            }
        }
        session
    }

    fn week_of(&self, task_id: TaskId) -> Result<i32, OrderingError> {
        self.week_of
            .get(&task_id)
            .copied()
            .ok_or(OrderingError::UnknownTask(task_id))
    }

    pub fn complete(&mut self, task_id: TaskId) -> Result<(), OrderingError> {
        let week = self.week_of(task_id)?;
        let bucket = self
            .weeks
            .get_mut(&week)
            .ok_or(OrderingError::UnknownWeek(week))?;
        let idx = bucket
            .active
            .iter()
            .position(|id| *id == task_id)
            .ok_or(OrderingError::AlreadyCompleted(task_id))?;
        bucket.active.remove(idx);

        let fetch_pos = &self.fetch_pos;
        let pos_of = |id: &TaskId| fetch_pos.get(id).copied().unwrap_or(usize::MAX);
        let pos = pos_of(&task_id);
        let insert_at = bucket
            .completed
            .iter()
            .position(|id| pos_of(id) > pos)
            .unwrap_or(bucket.completed.len());
        bucket.completed.insert(insert_at, task_id);
        Ok(())
    }

    /// Re-activated tasks go to the back of the active order.
    pub fn uncomplete(&mut self, task_id: TaskId) -> Result<(), OrderingError> {
        let week = self.week_of(task_id)?;
        let bucket = self
            .weeks
            .get_mut(&week)
            .ok_or(OrderingError::UnknownWeek(week))?;
        let idx = bucket
            .completed
            .iter()
            .position(|id| *id == task_id)
            .ok_or(OrderingError::NotCompleted(task_id))?;
        bucket.completed.remove(idx);
        bucket.active.push(task_id);
        Ok(())
    }

    pub fn reorder(&mut self, week: i32, from: usize, to: usize) -> Result<(), OrderingError> {
        let bucket = self
            .weeks
            .get_mut(&week)
            .ok_or(OrderingError::UnknownWeek(week))?;
        let len = bucket.active.len();
        for index in [from, to] {
            if index >= len {
                return Err(OrderingError::IndexOutOfRange { index, len });
            }
        }
        let moved = bucket.active.remove(from);
        bucket.active.insert(to, moved);
        Ok(())
    }

    /// Rank among the active tasks of its week; `None` once completed.
    pub fn rank(&self, task_id: TaskId) -> Option<usize> {
        let week = self.week_of.get(&task_id)?;
        self.weeks
            .get(week)?
            .active
            .iter()
            .position(|id| *id == task_id)
    }

    pub fn is_completed(&self, task_id: TaskId) -> bool {
        self.week_of
            .get(&task_id)
            .and_then(|week| self.weeks.get(week))
            .map_or(false, |bucket| bucket.completed.contains(&task_id))
    }

    pub fn weeks(&self) -> impl Iterator<Item = i32> + '_ {
        self.weeks.keys().copied()
    }

    pub fn active(&self, week: i32) -> &[TaskId] {
        self.weeks.get(&week).map_or(&[], |b| b.active.as_slice())
    }

    pub fn completed(&self, week: i32) -> &[TaskId] {
        self.weeks.get(&week).map_or(&[], |b| b.completed.as_slice())
    }

    /// Active tasks in rank order followed by completed tasks.
    pub fn display_order(&self, week: i32) -> Vec<TaskId> {
        self.active(week)
            .iter()
            .chain(self.completed(week))
            .copied()
            .collect()
    }

    pub fn total(&self) -> usize {
        self.week_of.len()
    }

    pub fn completed_count(&self) -> usize {
        self.weeks.values().map(|b| b.completed.len()).sum()
    }

    /// The first `limit` active tasks, earliest week first.
    pub fn up_next(&self, limit: usize) -> Vec<TaskId> {
        self.weeks
            .values()
            .flat_map(|b| b.active.iter().copied())
            .take(limit)
            .collect()
    }
}
