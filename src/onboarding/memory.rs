//! In-process store used when no database is configured, and by tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::{OnboardingError, OnboardingResult};
use super::store::OnboardingStore;
use super::types::{
    CatalogSnapshot, ProgressEntry, Role, RoleId, RoleTaskAssignment, Task, TaskDraft, TaskId,
    User, UserDraft, UserId,
};

#[derive(Debug, Default)]
struct MemoryState {
    next_role: RoleId,
    next_task: TaskId,
    next_user: UserId,
    roles: BTreeMap<RoleId, Role>,
    tasks: BTreeMap<TaskId, Task>,
    assignments: BTreeSet<(TaskId, RoleId)>,
    users: BTreeMap<UserId, User>,
    progress: HashMap<(UserId, TaskId), ProgressEntry>,
}

impl MemoryState {
    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != except)
    }

    fn role_name_taken(&self, name: &str, except: Option<RoleId>) -> bool {
        let wanted = name.to_lowercase();
        self.roles
            .values()
            .any(|r| r.name.to_lowercase() == wanted && Some(r.id) != except)
    }

    fn check_role(&self, role_id: Option<RoleId>) -> OnboardingResult<()> {
        match role_id {
            Some(id) if !self.roles.contains_key(&id) => Err(OnboardingError::validation(
                format!("role {id} does not exist"),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

#[async_trait]
impl OnboardingStore for MemoryStore {
    async fn list_roles(&self) -> OnboardingResult<Vec<Role>> {
        Ok(self.state.read().await.roles.values().cloned().collect())
    }

    async fn create_role(&self, name: &str) -> OnboardingResult<Role> {
        let mut state = self.state.write().await;
        if state.role_name_taken(name, None) {
            return Err(OnboardingError::Conflict(format!("role {name} already exists")));
        }
        let role = Role {
            id: next_id(&mut state.next_role),
            name: name.to_string(),
        };
        state.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn rename_role(&self, id: RoleId, name: &str) -> OnboardingResult<bool> {
        let mut state = self.state.write().await;
        if state.roles.contains_key(&id) && state.role_name_taken(name, Some(id)) {
            return Err(OnboardingError::Conflict(format!("role {name} already exists")));
        }
        Ok(match state.roles.get_mut(&id) {
            Some(role) => {
                role.name = name.to_string();
                true
            }
            None => false,
        })
    }

    async fn delete_role(&self, id: RoleId) -> OnboardingResult<bool> {
        let mut state = self.state.write().await;
        if state.roles.remove(&id).is_none() {
            return Ok(false);
        }
        state.assignments.retain(|(_, role_id)| *role_id != id);
        for user in state.users.values_mut() {
            if user.role_id == Some(id) {
                user.role_id = None;
            }
        }
        Ok(true)
    }

    async fn list_tasks(&self) -> OnboardingResult<Vec<Task>> {
        Ok(self.state.read().await.tasks.values().cloned().collect())
    }

    async fn create_task(&self, draft: &TaskDraft) -> OnboardingResult<TaskId> {
        let mut state = self.state.write().await;
        let id = next_id(&mut state.next_task);
        state.tasks.insert(id, draft.clone().into_task(id));
        Ok(id)
    }

    async fn update_task(&self, id: TaskId, draft: &TaskDraft) -> OnboardingResult<bool> {
        let mut state = self.state.write().await;
        Ok(match state.tasks.get_mut(&id) {
            Some(task) => {
                *task = draft.clone().into_task(id);
                true
            }
            None => false,
        })
    }

    async fn delete_task(&self, id: TaskId) -> OnboardingResult<bool> {
        let mut state = self.state.write().await;
        if state.tasks.remove(&id).is_none() {
            return Ok(false);
        }
        state.assignments.retain(|(task_id, _)| *task_id != id);
        state.progress.retain(|(_, task_id), _| *task_id != id);
        Ok(true)
    }

    async fn list_assignments(&self) -> OnboardingResult<Vec<RoleTaskAssignment>> {
        Ok(self
            .state
            .read()
            .await
            .assignments
            .iter()
            .map(|(task_id, role_id)| RoleTaskAssignment {
                role_id: *role_id,
                task_id: *task_id,
            })
            .collect())
    }

    async fn assign_roles(&self, task_id: TaskId, role_ids: &[RoleId]) -> OnboardingResult<usize> {
        let mut state = self.state.write().await;
        if !state.tasks.contains_key(&task_id) {
            return Err(OnboardingError::not_found("task", task_id));
        }
        if let Some(missing) = role_ids.iter().find(|id| !state.roles.contains_key(*id)) {
            return Err(OnboardingError::not_found("role", *missing));
        }
        for role_id in role_ids {
            state.assignments.insert((task_id, *role_id));
        }
        Ok(role_ids.len())
    }

    async fn list_users(&self) -> OnboardingResult<Vec<User>> {
        Ok(self.state.read().await.users.values().cloned().collect())
    }

    async fn get_user(&self, id: UserId) -> OnboardingResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> OnboardingResult<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn count_users(&self) -> OnboardingResult<u64> {
        Ok(self.state.read().await.users.len() as u64)
    }

    async fn create_user(&self, draft: &UserDraft) -> OnboardingResult<User> {
        let mut state = self.state.write().await;
        if state.email_taken(&draft.email, None) {
            return Err(OnboardingError::Conflict(format!(
                "email {} already registered",
                draft.email
            )));
        }
        state.check_role(draft.role_id)?;
        let user = User {
            id: next_id(&mut state.next_user),
            name: draft.name.clone(),
            email: draft.email.clone(),
            role_id: draft.role_id,
            is_admin: draft.is_admin,
            password_hash: draft.password_hash.clone(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: UserId, draft: &UserDraft) -> OnboardingResult<bool> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&id) {
            return Ok(false);
        }
        if state.email_taken(&draft.email, Some(id)) {
            return Err(OnboardingError::Conflict(format!(
                "email {} already registered",
                draft.email
            )));
        }
        state.check_role(draft.role_id)?;
        if let Some(user) = state.users.get_mut(&id) {
            user.name = draft.name.clone();
            user.email = draft.email.clone();
            user.role_id = draft.role_id;
            user.is_admin = draft.is_admin;
            if let Some(hash) = &draft.password_hash {
                user.password_hash = Some(hash.clone());
            }
        }
        Ok(true)
    }

    async fn delete_user(&self, id: UserId) -> OnboardingResult<bool> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }
        state.progress.retain(|(user_id, _), _| *user_id != id);
        Ok(true)
    }

    async fn progress_for_user(&self, user_id: UserId) -> OnboardingResult<Vec<ProgressEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<ProgressEntry> = state
            .progress
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.task_id);
        Ok(entries)
    }

    async fn upsert_progress(&self, entry: &ProgressEntry) -> OnboardingResult<ProgressEntry> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&entry.user_id) {
            return Err(OnboardingError::not_found("user", entry.user_id));
        }
        if !state.tasks.contains_key(&entry.task_id) {
            return Err(OnboardingError::not_found("task", entry.task_id));
        }
        state
            .progress
            .insert((entry.user_id, entry.task_id), entry.clone());
        Ok(entry.clone())
    }

    async fn snapshot(&self) -> OnboardingResult<CatalogSnapshot> {
        let state = self.state.read().await;
        let mut progress: Vec<ProgressEntry> = state.progress.values().cloned().collect();
        progress.sort_by_key(|e| (e.user_id, e.task_id));
        Ok(CatalogSnapshot {
            roles: state.roles.values().cloned().collect(),
            tasks: state.tasks.values().cloned().collect(),
            assignments: state
                .assignments
                .iter()
                .map(|(task_id, role_id)| RoleTaskAssignment {
                    role_id: *role_id,
                    task_id: *task_id,
                })
                .collect(),
            users: state.users.values().cloned().collect(),
            progress,
        })
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::types::{TaskCategory, TaskFormat, TaskOwner};

    fn draft(title: &str, week_num: i32) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            week_num,
            category: TaskCategory::Resource,
            format: TaskFormat::SelfLed,
            assigned_to: TaskOwner::Myself,
            resource_url: None,
        }
    }

    fn person(email: &str, role_id: Option<RoleId>) -> UserDraft {
        UserDraft {
            name: "Ada".to_string(),
            email: email.to_string(),
            role_id,
            is_admin: false,
            password_hash: None,
        }
    }

    fn mark(user_id: UserId, task_id: TaskId, completed: bool) -> ProgressEntry {
        ProgressEntry {
            user_id,
            task_id,
            completed,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn test_progress_upsert_keeps_one_row() {
        let store = MemoryStore::new();
        let task = store.create_task(&draft("Badge", 1)).await.unwrap();
        let user = store.create_user(&person("a@x.io", None)).await.unwrap();

        store.upsert_progress(&mark(user.id, task, true)).await.unwrap();
        store.upsert_progress(&mark(user.id, task, true)).await.unwrap();
        store.upsert_progress(&mark(user.id, task, false)).await.unwrap();

        let rows = store.progress_for_user(user.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].completed);
    }

    #[tokio::test]
    async fn test_progress_requires_known_ids() {
        let store = MemoryStore::new();
        let task = store.create_task(&draft("Badge", 1)).await.unwrap();

        let err = store.upsert_progress(&mark(99, task, true)).await.unwrap_err();
        assert_eq!(err, OnboardingError::not_found("user", 99));
        assert!(store.progress_for_user(99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_task_cascades() {
        let store = MemoryStore::new();
        let role = store.create_role("Leasing").await.unwrap();
        let keep = store.create_task(&draft("Keep", 1)).await.unwrap();
        let gone = store.create_task(&draft("Gone", 1)).await.unwrap();
        let user = store.create_user(&person("a@x.io", Some(role.id))).await.unwrap();
        store.assign_roles(gone, &[role.id]).await.unwrap();
        store.assign_roles(keep, &[role.id]).await.unwrap();
        store.upsert_progress(&mark(user.id, gone, true)).await.unwrap();
        store.upsert_progress(&mark(user.id, keep, true)).await.unwrap();

        assert!(store.delete_task(gone).await.unwrap());
        assert!(!store.delete_task(gone).await.unwrap());

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.assignments, vec![RoleTaskAssignment { role_id: role.id, task_id: keep }]);
        assert_eq!(snapshot.progress.len(), 1);
        assert_eq!(snapshot.progress[0].task_id, keep);
        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.roles.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_role_nulls_users() {
        let store = MemoryStore::new();
        let role = store.create_role("Porter").await.unwrap();
        let task = store.create_task(&draft("Keys", 2)).await.unwrap();
        let user = store.create_user(&person("p@x.io", Some(role.id))).await.unwrap();
        store.assign_roles(task, &[role.id]).await.unwrap();

        assert!(store.delete_role(role.id).await.unwrap());

        let reloaded = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.role_id, None);
        assert!(store.list_assignments().await.unwrap().is_empty());
        assert_eq!(store.list_tasks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_assign_roles_idempotent() {
        let store = MemoryStore::new();
        let r1 = store.create_role("R1").await.unwrap();
        let r2 = store.create_role("R2").await.unwrap();
        let task = store.create_task(&draft("Tour", 1)).await.unwrap();

        assert_eq!(store.assign_roles(task, &[r1.id, r2.id]).await.unwrap(), 2);
        assert_eq!(store.assign_roles(task, &[r1.id, r2.id]).await.unwrap(), 2);
        assert_eq!(store.list_assignments().await.unwrap().len(), 2);

        let err = store.assign_roles(task, &[42]).await.unwrap_err();
        assert_eq!(err, OnboardingError::not_found("role", 42));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(&person("dup@x.io", None)).await.unwrap();

        let err = store.create_user(&person("DUP@x.io", None)).await.unwrap_err();
        assert!(matches!(err, OnboardingError::Conflict(_)));
        assert_eq!(store.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_role_name_conflicts() {
        let store = MemoryStore::new();
        let leasing = store.create_role("Leasing").await.unwrap();
        let porter = store.create_role("Porter").await.unwrap();

        let err = store.create_role("leasing").await.unwrap_err();
        assert!(matches!(err, OnboardingError::Conflict(_)));

        let err = store.rename_role(porter.id, "LEASING").await.unwrap_err();
        assert!(matches!(err, OnboardingError::Conflict(_)));

        assert!(store.rename_role(leasing.id, "leasing").await.unwrap());
        assert!(!store.rename_role(404, "Leasing").await.unwrap());

        let names: Vec<String> = store
            .list_roles()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["leasing", "Porter"]);
    }

    #[tokio::test]
    async fn test_delete_user_cascades_progress() {
        let store = MemoryStore::new();
        let task = store.create_task(&draft("Badge", 1)).await.unwrap();
        let gone = store.create_user(&person("gone@x.io", None)).await.unwrap();
        let kept = store.create_user(&person("kept@x.io", None)).await.unwrap();
        store.upsert_progress(&mark(gone.id, task, true)).await.unwrap();
        store.upsert_progress(&mark(kept.id, task, true)).await.unwrap();

        assert!(store.delete_user(gone.id).await.unwrap());
        assert!(!store.delete_user(gone.id).await.unwrap());

        assert!(store.progress_for_user(gone.id).await.unwrap().is_empty());
        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.progress.len(), 1);
        assert_eq!(snapshot.progress[0].user_id, kept.id);
        assert_eq!(snapshot.tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_update_user_keeps_password_when_absent() {
        let store = MemoryStore::new();
        let mut initial = person("k@x.io", None);
        initial.password_hash = Some("hash".into());
        let user = store.create_user(&initial).await.unwrap();

        let mut changed = person("k@x.io", None);
        changed.name = "Grace".into();
        assert!(store.update_user(user.id, &changed).await.unwrap());
        assert!(!store.update_user(404, &changed).await.unwrap());

        let reloaded = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.name, "Grace");
        assert_eq!(reloaded.password_hash.as_deref(), Some("hash"));
    }
}
