//! Which tasks a role can see.
//!
//! A task with no `role_tasks` rows is global and visible to everyone. Once a
//! task has at least one row it is visible only to the roles listed there.
//! Unknown role ids, and the `0` sentinel used by clients without a role, see
//! the global tasks only.

use std::collections::{BTreeSet, HashMap};

use super::types::{Role, RoleId, RoleTaskAssignment, Task, TaskId, TaskWithRoles};

pub const GLOBAL_LABEL: &str = "Global";

#[derive(Debug, Clone, Default)]
pub struct VisibilityIndex {
    roles_by_task: HashMap<TaskId, BTreeSet<RoleId>>,
}

impl VisibilityIndex {
    pub fn new(assignments: &[RoleTaskAssignment]) -> Self {
        let mut roles_by_task: HashMap<TaskId, BTreeSet<RoleId>> = HashMap::new();
        for assignment in assignments {
            roles_by_task
                .entry(assignment.task_id)
                .or_default()
                .insert(assignment.role_id);
        }
        Self { roles_by_task }
    }

    pub fn is_global(&self, task_id: TaskId) -> bool {
        self.roles_by_task
            .get(&task_id)
            .map_or(true, |roles| roles.is_empty())
    }

    pub fn is_visible(&self, task_id: TaskId, role_id: Option<RoleId>) -> bool {
        match self.roles_by_task.get(&task_id) {
            None => true,
            Some(roles) if roles.is_empty() => true,
            Some(roles) => role_id.map_or(false, |role| roles.contains(&role)),
        }
    }

    pub fn roles_for(&self, task_id: TaskId) -> impl Iterator<Item = RoleId> + '_ {
        self.roles_by_task
            .get(&task_id)
            .into_iter()
            .flat_map(|roles| roles.iter().copied())
    }
}

/// Clients send `0` for "no role"; treat it like an absent role.
pub fn normalize_role(role_id: Option<RoleId>) -> Option<RoleId> {
    role_id.filter(|id| *id != 0)
}

pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| (t.week_num, t.id));
}

/// Tasks visible to `role_id`, ordered by `(week_num, id)`, each task at most once.
pub fn tasks_for_role(
    tasks: &[Task],
    index: &VisibilityIndex,
    role_id: Option<RoleId>,
) -> Vec<Task> {
    let role_id = normalize_role(role_id);
    let mut seen = BTreeSet::new();
    let mut visible: Vec<Task> = tasks
        .iter()
        .filter(|task| index.is_visible(task.id, role_id))
        .filter(|task| seen.insert(task.id))
        .cloned()
        .collect();
    sort_tasks(&mut visible);
    visible
}

/// Admin listing: every task with its role names sorted and joined, or `"Global"`.
pub fn tasks_with_roles(
    tasks: &[Task],
    roles: &[Role],
    index: &VisibilityIndex,
) -> Vec<TaskWithRoles> {
    let names: HashMap<RoleId, &str> = roles.iter().map(|r| (r.id, r.name.as_str())).collect();

    let mut ordered = tasks.to_vec();
    sort_tasks(&mut ordered);

    ordered
        .into_iter()
        .map(|task| {
            let mut role_names: Vec<&str> = index
                .roles_for(task.id)
                .filter_map(|id| names.get(&id).copied())
                .collect();
            role_names.sort_unstable();
            let roles = if role_names.is_empty() {
                GLOBAL_LABEL.to_string()
            } else {
                role_names.join(", ")
            };
            TaskWithRoles { task, roles }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::types::{TaskCategory, TaskFormat, TaskOwner};

    fn task(id: TaskId, week_num: i32) -> Task {
        Task {
            id,
            title: format!("Task {id}"),
            week_num,
            category: TaskCategory::Resource,
            format: TaskFormat::SelfLed,
            assigned_to: TaskOwner::Myself,
            resource_url: None,
        }
    }

    fn assign(role_id: RoleId, task_id: TaskId) -> RoleTaskAssignment {
        RoleTaskAssignment { role_id, task_id }
    }

    fn ids(tasks: &[Task]) -> Vec<TaskId> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_global_tasks_visible_to_every_role() {
        let tasks = vec![task(1, 1), task(2, 1)];
        let index = VisibilityIndex::new(&[assign(7, 2)]);

        for role in [Some(1), Some(7), Some(999), Some(0), None] {
            assert!(ids(&tasks_for_role(&tasks, &index, role)).contains(&1));
        }
    }

    #[test]
    fn test_assigned_task_only_visible_to_its_roles() {
        let tasks = vec![task(1, 1)];
        let index = VisibilityIndex::new(&[assign(2, 1), assign(3, 1)]);

        assert_eq!(ids(&tasks_for_role(&tasks, &index, Some(2))), vec![1]);
        assert_eq!(ids(&tasks_for_role(&tasks, &index, Some(3))), vec![1]);
        assert!(tasks_for_role(&tasks, &index, Some(1)).is_empty());
        assert!(tasks_for_role(&tasks, &index, None).is_empty());
        assert!(tasks_for_role(&tasks, &index, Some(0)).is_empty());
    }

    #[test]
    fn test_first_assignment_removes_global_visibility() {
        let tasks = vec![task(1, 1)];
        let before = VisibilityIndex::new(&[]);
        assert_eq!(ids(&tasks_for_role(&tasks, &before, Some(5))), vec![1]);

        let after = VisibilityIndex::new(&[assign(4, 1)]);
        assert!(tasks_for_role(&tasks, &after, Some(5)).is_empty());
    }

    #[test]
    fn test_ordering_and_no_duplicates() {
        let tasks = vec![task(5, 2), task(3, 1), task(4, 1), task(1, 3), task(3, 1)];
        let index = VisibilityIndex::new(&[assign(1, 4), assign(1, 4), assign(2, 4)]);

        let visible = tasks_for_role(&tasks, &index, Some(1));
        assert_eq!(ids(&visible), vec![3, 4, 5, 1]);
    }

    #[test]
    fn test_example_scenario() {
        let a = task(1, 1);
        let b = task(2, 1);
        let tasks = vec![a, b];
        let index = VisibilityIndex::new(&[assign(2, 2)]);

        assert_eq!(ids(&tasks_for_role(&tasks, &index, Some(1))), vec![1]);
        assert_eq!(ids(&tasks_for_role(&tasks, &index, Some(2))), vec![1, 2]);
    }

    #[test]
    fn test_tasks_with_roles_labels() {
        let tasks = vec![task(2, 1), task(1, 1)];
        let roles = vec![
            Role { id: 1, name: "Leasing".into() },
            Role { id: 2, name: "Assistant Manager".into() },
        ];
        let index = VisibilityIndex::new(&[assign(1, 2), assign(2, 2)]);

        let listed = tasks_with_roles(&tasks, &roles, &index);
        assert_eq!(listed[0].task.id, 1);
        assert_eq!(listed[0].roles, GLOBAL_LABEL);
        assert_eq!(listed[1].roles, "Assistant Manager, Leasing");
    }
}
