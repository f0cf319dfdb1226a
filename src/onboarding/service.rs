use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};

use super::aggregator;
use super::error::{OnboardingError, OnboardingResult};
use super::ledger;
use super::store::OnboardingStore;
use super::types::*;
use super::visibility::{self, VisibilityIndex};
use crate::security::password::{hash_password, verify_password, MIN_PASSWORD_LEN};

pub const DEFAULT_MAX_WEEK_NUM: i32 = 12;

const BAD_CREDENTIALS: &str = "invalid email or password";

/// Validation and authorization in front of an [`OnboardingStore`].
///
/// Every protected write takes the caller's [`Identity`] explicitly and checks
/// it before anything is read from or written to storage.
pub struct OnboardingService {
    store: Arc<dyn OnboardingStore>,
    max_week_num: i32,
}

pub fn require_admin(identity: Option<&Identity>) -> OnboardingResult<&Identity> {
    let identity =
        identity.ok_or_else(|| OnboardingError::unauthorized("authentication required"))?;
    if !identity.is_admin {
        return Err(OnboardingError::Forbidden(
            "admin privileges required".to_string(),
        ));
    }
    Ok(identity)
}

fn required(field: Option<String>) -> OnboardingResult<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OnboardingError::validation("missing required fields"))
}

fn optional(field: Option<String>) -> Option<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_email(raw: Option<String>) -> OnboardingResult<String> {
    let email = required(raw)?.to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(OnboardingError::validation(format!(
            "invalid email '{email}'"
        ))),
    }
}

async fn hash_in_background(password: String) -> OnboardingResult<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(OnboardingError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await?
        .map_err(|e| OnboardingError::storage(e.to_string()))
}

impl OnboardingService {
    pub fn new(store: Arc<dyn OnboardingStore>, max_week_num: i32) -> Self {
        Self {
            store,
            max_week_num: max_week_num.max(1),
        }
    }

    pub fn max_week_num(&self) -> i32 {
        self.max_week_num
    }

    pub async fn storage_healthy(&self) -> bool {
        self.store.ping().await
    }

    pub fn parse_week(&self, raw: Option<WeekInput>) -> OnboardingResult<i32> {
        let out_of_range = || {
            OnboardingError::validation(format!("week_num must be 1-{}", self.max_week_num))
        };
        let week = match raw {
            None => return Err(OnboardingError::validation("missing required fields")),
            Some(WeekInput::Number(n)) => n
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(out_of_range)?,
            Some(WeekInput::Text(s)) if s.trim().is_empty() => {
                return Err(OnboardingError::validation("missing required fields"))
            }
            Some(WeekInput::Text(s)) => s.trim().parse::<i32>().map_err(|_| out_of_range())?,
        };
        if !(1..=self.max_week_num).contains(&week) {
            return Err(out_of_range());
        }
        Ok(week)
    }

    pub fn task_draft(&self, request: TaskRequest) -> OnboardingResult<TaskDraft> {
        let title = required(request.title)?;
        let week_num = self.parse_week(request.week_num)?;
        let category: TaskCategory = required(request.category)?.parse()?;
        let format: TaskFormat = required(request.format)?.parse()?;
        let assigned_to: TaskOwner = required(request.assigned_to)?.parse()?;
        Ok(TaskDraft {
            title,
            week_num,
            category,
            format,
            assigned_to,
            resource_url: optional(request.resource_url),
        })
    }

    // ===== Roles =====

    pub async fn list_roles(&self) -> OnboardingResult<Vec<Role>> {
        self.store.list_roles().await
    }

    pub async fn create_role(
        &self,
        identity: Option<&Identity>,
        request: RoleRequest,
    ) -> OnboardingResult<Role> {
        let caller = require_admin(identity)?;
        let name = required(request.name)?;
        let role = self.store.create_role(&name).await?;
        info!("[ROLE_CREATE] user={} role={} name={}", caller.user_id, role.id, role.name);
        Ok(role)
    }

    pub async fn rename_role(
        &self,
        identity: Option<&Identity>,
        id: RoleId,
        request: RoleRequest,
    ) -> OnboardingResult<()> {
        require_admin(identity)?;
        let name = required(request.name)?;
        if !self.store.rename_role(id, &name).await? {
            return Err(OnboardingError::not_found("role", id));
        }
        info!("[ROLE_RENAME] role={id} name={name}");
        Ok(())
    }

    pub async fn delete_role(&self, identity: Option<&Identity>, id: RoleId) -> OnboardingResult<()> {
        let caller = require_admin(identity)?;
        if self.store.delete_role(id).await? {
            info!("[ROLE_DELETE] user={} role={id}", caller.user_id);
        }
        Ok(())
    }

    pub async fn tasks_for_role(&self, role_id: RoleId) -> OnboardingResult<Vec<Task>> {
        let tasks = self.store.list_tasks().await?;
        let index = VisibilityIndex::new(&self.store.list_assignments().await?);
        Ok(visibility::tasks_for_role(&tasks, &index, Some(role_id)))
    }

    // ===== Tasks =====

    pub async fn all_tasks(&self) -> OnboardingResult<Vec<TaskWithRoles>> {
        let snapshot = self.store.snapshot().await?;
        let index = VisibilityIndex::new(&snapshot.assignments);
        Ok(visibility::tasks_with_roles(&snapshot.tasks, &snapshot.roles, &index))
    }

    pub async fn create_task(
        &self,
        identity: Option<&Identity>,
        request: TaskRequest,
    ) -> OnboardingResult<TaskCreated> {
        let caller = require_admin(identity)?;
        let draft = self.task_draft(request)?;
        let task_id = self.store.create_task(&draft).await?;
        info!(
            "[TASK_CREATE] user={} task={task_id} week={} title={}",
            caller.user_id, draft.week_num, draft.title
        );
        Ok(TaskCreated { task_id })
    }

    pub async fn update_task(
        &self,
        identity: Option<&Identity>,
        id: TaskId,
        request: TaskRequest,
    ) -> OnboardingResult<()> {
        require_admin(identity)?;
        let draft = self.task_draft(request)?;
        if !self.store.update_task(id, &draft).await? {
            return Err(OnboardingError::not_found("task", id));
        }
        info!("[TASK_UPDATE] task={id}");
        Ok(())
    }

    pub async fn delete_task(&self, identity: Option<&Identity>, id: TaskId) -> OnboardingResult<()> {
        let caller = require_admin(identity)?;
        if self.store.delete_task(id).await? {
            info!("[TASK_DELETE] user={} task={id}", caller.user_id);
        }
        Ok(())
    }

    pub async fn assign_roles(
        &self,
        identity: Option<&Identity>,
        request: AssignRolesRequest,
    ) -> OnboardingResult<AssignRolesResponse> {
        require_admin(identity)?;
        let (task_id, role_ids) = match (request.task_id, request.role_ids) {
            (Some(task_id), Some(role_ids)) if task_id > 0 && !role_ids.is_empty() => {
                (task_id, role_ids)
            }
            _ => {
                return Err(OnboardingError::validation(
                    "task_id and role_ids[] required",
                ))
            }
        };
        let rows = self.store.assign_roles(task_id, &role_ids).await?;
        info!("[ROLE_TASKS] task={task_id} roles={role_ids:?}");
        Ok(AssignRolesResponse { ok: true, rows })
    }

    // ===== Progress =====

    pub async fn progress_for_user(
        &self,
        user_id: Option<UserId>,
    ) -> OnboardingResult<Vec<ProgressState>> {
        let user_id =
            user_id.ok_or_else(|| OnboardingError::validation("user_id query param required"))?;
        let entries = self.store.progress_for_user(user_id).await?;
        Ok(entries.iter().map(ProgressState::from).collect())
    }

    pub async fn set_progress(
        &self,
        task_id: TaskId,
        request: ProgressRequest,
    ) -> OnboardingResult<ProgressEntry> {
        let user_id = request
            .user_id
            .ok_or_else(|| OnboardingError::validation("user_id required"))?;
        let completed = request
            .completed
            .ok_or_else(|| OnboardingError::validation("completed required"))?;
        let completed_at =
            ledger::resolve_completed_at(completed, request.completed_at.as_deref(), Utc::now())?;

        let stored = self
            .store
            .upsert_progress(&ledger::entry(user_id, task_id, completed, completed_at))
            .await?;
        info!("[PROGRESS] user={user_id} task={task_id} completed={completed}");
        Ok(stored)
    }

    // ===== Users =====

    pub async fn list_users(&self) -> OnboardingResult<Vec<UserView>> {
        let roles: HashMap<RoleId, String> = self
            .store
            .list_roles()
            .await?
            .into_iter()
            .map(|r| (r.id, r.name))
            .collect();
        Ok(self
            .store
            .list_users()
            .await?
            .into_iter()
            .map(|u| UserView {
                role: u.role_id.and_then(|id| roles.get(&id).cloned()),
                id: u.id,
                name: u.name,
                email: u.email,
                role_id: u.role_id,
                is_admin: u.is_admin,
            })
            .collect())
    }

    async fn user_draft(&self, request: UserRequest) -> OnboardingResult<UserDraft> {
        let name = required(request.name)?;
        let email = normalize_email(request.email)?;
        let password_hash = match optional(request.password) {
            Some(password) => Some(hash_in_background(password).await?),
            None => None,
        };
        Ok(UserDraft {
            name,
            email,
            role_id: visibility::normalize_role(request.role_id),
            is_admin: request.is_admin.unwrap_or(false),
            password_hash,
        })
    }

    pub async fn create_user(
        &self,
        identity: Option<&Identity>,
        request: UserRequest,
    ) -> OnboardingResult<UserView> {
        let caller = require_admin(identity)?;
        let draft = self.user_draft(request).await?;
        let user = self.store.create_user(&draft).await?;
        info!("[USER_CREATE] by={} user={} email={}", caller.user_id, user.id, user.email);

        let role = match user.role_id {
            Some(role_id) => self
                .store
                .list_roles()
                .await?
                .into_iter()
                .find(|r| r.id == role_id)
                .map(|r| r.name),
            None => None,
        };
        Ok(UserView {
            id: user.id,
            name: user.name,
            email: user.email,
            role_id: user.role_id,
            role,
            is_admin: user.is_admin,
        })
    }

    pub async fn update_user(
        &self,
        identity: Option<&Identity>,
        id: UserId,
        request: UserRequest,
    ) -> OnboardingResult<()> {
        require_admin(identity)?;
        let draft = self.user_draft(request).await?;
        if !self.store.update_user(id, &draft).await? {
            return Err(OnboardingError::not_found("user", id));
        }
        info!("[USER_UPDATE] user={id}");
        Ok(())
    }

    pub async fn delete_user(&self, identity: Option<&Identity>, id: UserId) -> OnboardingResult<()> {
        let caller = require_admin(identity)?;
        if caller.user_id == id {
            warn!("[USER_DELETE] admin {id} is deleting their own account");
        }
        if self.store.delete_user(id).await? {
            info!("[USER_DELETE] by={} user={id}", caller.user_id);
        }
        Ok(())
    }

    // ===== Rollups =====

    pub async fn progress_summary(&self, user_id: UserId) -> OnboardingResult<ProgressSummary> {
        let snapshot = self.store.snapshot().await?;
        aggregator::user_summary(&snapshot, user_id)
    }

    pub async fn overview(&self) -> OnboardingResult<SystemOverview> {
        let snapshot = self.store.snapshot().await?;
        Ok(aggregator::overview(&snapshot))
    }

    pub async fn mentor_brief(&self, user_id: UserId) -> OnboardingResult<MentorBrief> {
        let snapshot = self.store.snapshot().await?;
        aggregator::mentor_brief(&snapshot, user_id)
    }

    // ===== Identity =====

    /// Same error for an unknown email and a wrong password.
    pub async fn authenticate(&self, request: LoginRequest) -> OnboardingResult<User> {
        let email = required(request.email)?.to_lowercase();
        let password = request
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| OnboardingError::validation("missing required fields"))?;

        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| OnboardingError::unauthorized(BAD_CREDENTIALS))?;
        let hash = user
            .password_hash
            .clone()
            .ok_or_else(|| OnboardingError::unauthorized(BAD_CREDENTIALS))?;

        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await?
            .map_err(|e| OnboardingError::storage(e.to_string()))?;
        if !matches {
            warn!("[AUTH] failed login for {email}");
            return Err(OnboardingError::unauthorized(BAD_CREDENTIALS));
        }
        info!("[AUTH] login user={}", user.id);
        Ok(user)
    }

    pub async fn current_user(&self, identity: Option<&Identity>) -> OnboardingResult<SessionUser> {
        let identity =
            identity.ok_or_else(|| OnboardingError::unauthorized("authentication required"))?;
        self.store
            .get_user(identity.user_id)
            .await?
            .map(|u| SessionUser::from(&u))
            .ok_or_else(|| OnboardingError::unauthorized("account no longer exists"))
    }

    /// Creates the configured admin when the user table is empty. Returns whether one was created.
    pub async fn ensure_bootstrap_admin(&self, email: &str, password: &str) -> OnboardingResult<bool> {
        if self.store.count_users().await? > 0 {
            return Ok(false);
        }
        let request = UserRequest {
            name: Some("Administrator".to_string()),
            email: Some(email.to_string()),
            role_id: None,
            is_admin: Some(true),
            password: Some(password.to_string()),
        };
        let draft = self.user_draft(request).await?;
        let user = self.store.create_user(&draft).await?;
        info!("[BOOTSTRAP] created admin user={} email={}", user.id, user.email);
        Ok(true)
    }
}
