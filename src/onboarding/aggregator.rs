//! Rollups computed on demand from a [`CatalogSnapshot`].

use std::collections::{BTreeMap, HashMap, HashSet};

use super::error::{OnboardingError, OnboardingResult};
use super::ordering::ChecklistSession;
use super::types::{
    CatalogSnapshot, MentorBrief, ProgressEntry, ProgressSummary, RoleRollup, SystemOverview,
    TaskId, TaskProgressRow, UserId, WeekRollup,
};
use super::visibility::{sort_tasks, tasks_for_role, VisibilityIndex};

pub const MENTOR_BRIEF_NEXT: usize = 3;

/// Rounded percentage; a zero denominator gives `0`.
pub fn completion_percent(done: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u32
}

fn completed_by_user(progress: &[ProgressEntry]) -> HashMap<UserId, HashMap<TaskId, &ProgressEntry>> {
    let mut by_user: HashMap<UserId, HashMap<TaskId, &ProgressEntry>> = HashMap::new();
    for entry in progress.iter().filter(|e| e.completed) {
        by_user
            .entry(entry.user_id)
            .or_default()
            .insert(entry.task_id, entry);
    }
    by_user
}

pub fn user_summary(snapshot: &CatalogSnapshot, user_id: UserId) -> OnboardingResult<ProgressSummary> {
    if !snapshot.users.iter().any(|u| u.id == user_id) {
        return Err(OnboardingError::not_found("user", user_id));
    }

    let mine: HashMap<TaskId, &ProgressEntry> = snapshot
        .progress
        .iter()
        .filter(|e| e.user_id == user_id)
        .map(|e| (e.task_id, e))
        .collect();

    let mut tasks = snapshot.tasks.clone();
    sort_tasks(&mut tasks);

    let mut weeks: BTreeMap<i32, WeekRollup> = BTreeMap::new();
    let mut rows = Vec::with_capacity(tasks.len());
    let mut completed_tasks = 0u64;

    for task in tasks {
        let entry = mine.get(&task.id).filter(|e| e.completed);
        let week = weeks.entry(task.week_num).or_insert(WeekRollup {
            week_num: task.week_num,
            total: 0,
            done: 0,
        });
        week.total += 1;
        if entry.is_some() {
            week.done += 1;
            completed_tasks += 1;
        }
        rows.push(TaskProgressRow {
            id: task.id,
            title: task.title,
            week_num: task.week_num,
            completed: entry.is_some(),
            completed_at: entry.and_then(|e| e.completed_at),
        });
    }

    let total_tasks = rows.len() as u64;
    Ok(ProgressSummary {
        total_tasks,
        completed_tasks,
        percent_complete: completion_percent(completed_tasks, total_tasks),
        weeks: weeks.into_values().collect(),
        tasks: rows,
    })
}

pub fn overview(snapshot: &CatalogSnapshot) -> SystemOverview {
    let index = VisibilityIndex::new(&snapshot.assignments);
    let completed = completed_by_user(&snapshot.progress);

    let mut week_stats: BTreeMap<i32, WeekRollup> = snapshot
        .tasks
        .iter()
        .map(|t| {
            (
                t.week_num,
                WeekRollup {
                    week_num: t.week_num,
                    total: 0,
                    done: 0,
                },
            )
        })
        .collect();

    let mut per_role: HashMap<i32, (u64, u64)> = HashMap::new();

    for user in &snapshot.users {
        let done = completed.get(&user.id);
        let visible = tasks_for_role(&snapshot.tasks, &index, user.role_id);
        let mut user_total = 0u64;
        let mut user_done = 0u64;
        for task in &visible {
            let is_done = done.map_or(false, |d| d.contains_key(&task.id));
            user_total += 1;
            if let Some(week) = week_stats.get_mut(&task.week_num) {
                week.total += 1;
                if is_done {
                    week.done += 1;
                }
            }
            if is_done {
                user_done += 1;
            }
        }
        if let Some(role_id) = user.role_id {
            let slot = per_role.entry(role_id).or_default();
            slot.0 += user_total;
            slot.1 += user_done;
        }
    }

    let mut roles = snapshot.roles.clone();
    roles.sort_by_key(|r| r.id);
    let role_stats = roles
        .into_iter()
        .map(|role| {
            let (total, done) = per_role.get(&role.id).copied().unwrap_or_default();
            RoleRollup {
                role_id: role.id,
                role: role.name,
                total,
                done,
            }
        })
        .collect();

    let task_count = snapshot.tasks.len() as u64;
    let comp_count = snapshot.progress.iter().filter(|e| e.completed).count() as u64;

    SystemOverview {
        user_count: snapshot.users.len() as u64,
        task_count,
        comp_count,
        completion_pct: completion_percent(comp_count, task_count),
        role_stats,
        week_stats: week_stats.into_values().collect(),
    }
}

/// Progress over the tasks the user's role can see, plus what to pick up next.
pub fn mentor_brief(snapshot: &CatalogSnapshot, user_id: UserId) -> OnboardingResult<MentorBrief> {
    let user = snapshot
        .users
        .iter()
        .find(|u| u.id == user_id)
        .ok_or_else(|| OnboardingError::not_found("user", user_id))?;

    let index = VisibilityIndex::new(&snapshot.assignments);
    let visible = tasks_for_role(&snapshot.tasks, &index, user.role_id);
    let done: HashSet<TaskId> = snapshot
        .progress
        .iter()
        .filter(|e| e.user_id == user_id && e.completed)
        .map(|e| e.task_id)
        .collect();

    let session = ChecklistSession::from_fetch(&visible, &done);
    let titles: HashMap<TaskId, &str> = visible.iter().map(|t| (t.id, t.title.as_str())).collect();
    let next_tasks = session
        .up_next(MENTOR_BRIEF_NEXT)
        .into_iter()
        .filter_map(|id| titles.get(&id).map(|t| t.to_string()))
        .collect();

    let completed = session.completed_count() as u64;
    let total = session.total() as u64;
    Ok(MentorBrief {
        user_id,
        completed,
        total,
        percent_complete: completion_percent(completed, total),
        next_tasks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::types::{
        Role, RoleTaskAssignment, Task, TaskCategory, TaskFormat, TaskOwner, User,
    };

    fn task(id: TaskId, week_num: i32) -> Task {
        Task {
            id,
            title: format!("Task {id}"),
            week_num,
            category: TaskCategory::KpiTaskBased,
            format: TaskFormat::WithMentor,
            assigned_to: TaskOwner::Mentor,
            resource_url: None,
        }
    }

    fn user(id: UserId, role_id: Option<i32>) -> User {
        User {
            id,
            name: format!("User {id}"),
            email: format!("u{id}@example.com"),
            role_id,
            is_admin: false,
            password_hash: None,
        }
    }

    fn done(user_id: UserId, task_id: TaskId) -> ProgressEntry {
        ProgressEntry {
            user_id,
            task_id,
            completed: true,
            completed_at: None,
        }
    }

    /// A global week 1, B week 1 for role 2; user 1 has role 1, user 2 has role 2.
    fn scenario() -> CatalogSnapshot {
        CatalogSnapshot {
            roles: vec![
                Role { id: 2, name: "R2".into() },
                Role { id: 1, name: "R1".into() },
            ],
            tasks: vec![task(1, 1), task(2, 1)],
            assignments: vec![RoleTaskAssignment { role_id: 2, task_id: 2 }],
            users: vec![user(1, Some(1)), user(2, Some(2))],
            progress: vec![],
        }
    }

    #[test]
    fn test_completion_percent() {
        assert_eq!(completion_percent(0, 0), 0);
        assert_eq!(completion_percent(1, 3), 33);
        assert_eq!(completion_percent(2, 3), 67);
        assert_eq!(completion_percent(4, 4), 100);
    }

    #[test]
    fn test_week_grouping() {
        let snapshot = CatalogSnapshot {
            tasks: vec![task(1, 1), task(2, 1), task(3, 2)],
            users: vec![user(9, None)],
            progress: vec![done(9, 1)],
            ..Default::default()
        };

        let summary = user_summary(&snapshot, 9).unwrap();
        assert_eq!(
            summary.weeks,
            vec![
                WeekRollup { week_num: 1, total: 2, done: 1 },
                WeekRollup { week_num: 2, total: 1, done: 0 },
            ]
        );
        assert_eq!(summary.total_tasks, 3);
        assert_eq!(summary.completed_tasks, 1);
        assert_eq!(summary.percent_complete, 33);
    }

    #[test]
    fn test_summary_rows_default_to_incomplete() {
        let mut snapshot = scenario();
        snapshot.progress.push(ProgressEntry {
            user_id: 1,
            task_id: 2,
            completed: false,
            completed_at: None,
        });

        let summary = user_summary(&snapshot, 1).unwrap();
        assert!(summary.tasks.iter().all(|t| !t.completed && t.completed_at.is_none()));
        assert_eq!(summary.completed_tasks, 0);
    }

    #[test]
    fn test_summary_unknown_user() {
        let err = user_summary(&scenario(), 77).unwrap_err();
        assert!(matches!(err, OnboardingError::NotFound { .. }));
    }

    #[test]
    fn test_scenario_completion() {
        let mut snapshot = scenario();
        snapshot.progress.push(done(1, 1));

        let summary = user_summary(&snapshot, 1).unwrap();
        assert_eq!(summary.completed_tasks, 1);
        assert_eq!(summary.weeks, vec![WeekRollup { week_num: 1, total: 2, done: 1 }]);
    }

    #[test]
    fn test_empty_overview() {
        let o = overview(&CatalogSnapshot::default());
        assert_eq!(o.task_count, 0);
        assert_eq!(o.comp_count, 0);
        assert_eq!(o.completion_pct, 0);
        assert!(o.role_stats.is_empty());
        assert!(o.week_stats.is_empty());
    }

    #[test]
    fn test_overview_rollups() {
        let mut snapshot = scenario();
        snapshot.progress.push(done(1, 1));
        snapshot.progress.push(done(2, 2));

        let o = overview(&snapshot);
        assert_eq!(o.user_count, 2);
        assert_eq!(o.task_count, 2);
        assert_eq!(o.comp_count, 2);
        assert_eq!(o.completion_pct, 100);
        assert_eq!(
            o.role_stats,
            vec![
                RoleRollup { role_id: 1, role: "R1".into(), total: 1, done: 1 },
                RoleRollup { role_id: 2, role: "R2".into(), total: 2, done: 1 },
            ]
        );
        assert_eq!(o.week_stats, vec![WeekRollup { week_num: 1, total: 3, done: 2 }]);
    }

    #[test]
    fn test_week_stats_listed_without_users() {
        let snapshot = CatalogSnapshot {
            tasks: vec![task(1, 4)],
            ..Default::default()
        };
        assert_eq!(
            overview(&snapshot).week_stats,
            vec![WeekRollup { week_num: 4, total: 0, done: 0 }]
        );
    }

    #[test]
    fn test_mentor_brief_uses_visible_tasks() {
        let mut snapshot = scenario();
        snapshot.tasks.push(task(3, 2));
        snapshot.tasks.push(task(4, 1));
        snapshot.tasks.push(task(5, 3));
        snapshot.progress.push(done(2, 1));

        let brief = mentor_brief(&snapshot, 2).unwrap();
        assert_eq!(brief.total, 5);
        assert_eq!(brief.completed, 1);
        assert_eq!(brief.percent_complete, 20);
        assert_eq!(brief.next_tasks, vec!["Task 2", "Task 4", "Task 3"]);

        let other = mentor_brief(&snapshot, 1).unwrap();
        assert_eq!(other.total, 4);
        assert_eq!(other.completed, 0);
    }
}
