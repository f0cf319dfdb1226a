use async_trait::async_trait;

use super::error::OnboardingResult;
use super::types::{
    CatalogSnapshot, ProgressEntry, Role, RoleId, RoleTaskAssignment, Task, TaskDraft, TaskId,
    User, UserDraft, UserId,
};

/// Persistence seam for the catalog and the progress ledger.
///
/// Deletes return `false` when nothing matched and cascade to dependents in a
/// single unit of work. Updates return `false` when the id is unknown.
#[async_trait]
pub trait OnboardingStore: Send + Sync {
    async fn list_roles(&self) -> OnboardingResult<Vec<Role>>;
    async fn create_role(&self, name: &str) -> OnboardingResult<Role>;
    async fn rename_role(&self, id: RoleId, name: &str) -> OnboardingResult<bool>;
    /// Clears `role_id` on the role's users and drops its assignments.
    async fn delete_role(&self, id: RoleId) -> OnboardingResult<bool>;

    async fn list_tasks(&self) -> OnboardingResult<Vec<Task>>;
    async fn create_task(&self, draft: &TaskDraft) -> OnboardingResult<TaskId>;
    async fn update_task(&self, id: TaskId, draft: &TaskDraft) -> OnboardingResult<bool>;
    /// Removes the task's assignments and progress rows, then the task.
    async fn delete_task(&self, id: TaskId) -> OnboardingResult<bool>;

    async fn list_assignments(&self) -> OnboardingResult<Vec<RoleTaskAssignment>>;
    /// Inserts missing pairs only; returns how many pairs the request named.
    async fn assign_roles(&self, task_id: TaskId, role_ids: &[RoleId]) -> OnboardingResult<usize>;

    async fn list_users(&self) -> OnboardingResult<Vec<User>>;
    async fn get_user(&self, id: UserId) -> OnboardingResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> OnboardingResult<Option<User>>;
    async fn count_users(&self) -> OnboardingResult<u64>;
    async fn create_user(&self, draft: &UserDraft) -> OnboardingResult<User>;
    async fn update_user(&self, id: UserId, draft: &UserDraft) -> OnboardingResult<bool>;
    async fn delete_user(&self, id: UserId) -> OnboardingResult<bool>;

    async fn progress_for_user(&self, user_id: UserId) -> OnboardingResult<Vec<ProgressEntry>>;
    /// Insert or overwrite the single row for `(user_id, task_id)`.
    async fn upsert_progress(&self, entry: &ProgressEntry) -> OnboardingResult<ProgressEntry>;

    async fn snapshot(&self) -> OnboardingResult<CatalogSnapshot>;
    async fn ping(&self) -> bool;
}
