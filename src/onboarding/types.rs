use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::OnboardingError;

pub type RoleId = i32;
pub type TaskId = i32;
pub type UserId = i32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskCategory {
    #[serde(rename = "Resource")]
    Resource,
    #[serde(rename = "KPI & Task-Based", alias = "KPI&Task-Based")]
    KpiTaskBased,
    #[serde(rename = "Redstone Moment")]
    RedstoneMoment,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "Resource",
            Self::KpiTaskBased => "KPI & Task-Based",
            Self::RedstoneMoment => "Redstone Moment",
        }
    }
}

impl FromStr for TaskCategory {
    type Err = OnboardingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Resource" => Ok(Self::Resource),
            "KPI & Task-Based" | "KPI&Task-Based" => Ok(Self::KpiTaskBased),
            "Redstone Moment" => Ok(Self::RedstoneMoment),
            other => Err(OnboardingError::validation(format!(
                "unknown category '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskFormat {
    #[serde(rename = "Self-Led")]
    SelfLed,
    #[serde(rename = "With Mentor")]
    WithMentor,
    #[serde(
        rename = "With Regional",
        alias = "With Leader",
        alias = "With Regional/Leader"
    )]
    WithRegional,
    #[serde(rename = "With Home Base")]
    WithHomeBase,
}

impl TaskFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfLed => "Self-Led",
            Self::WithMentor => "With Mentor",
            Self::WithRegional => "With Regional",
            Self::WithHomeBase => "With Home Base",
        }
    }
}

impl FromStr for TaskFormat {
    type Err = OnboardingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Self-Led" => Ok(Self::SelfLed),
            "With Mentor" => Ok(Self::WithMentor),
            "With Regional" | "With Leader" | "With Regional/Leader" => Ok(Self::WithRegional),
            "With Home Base" => Ok(Self::WithHomeBase),
            other => Err(OnboardingError::validation(format!(
                "unknown format '{other}'"
            ))),
        }
    }
}

/// Who carries out a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskOwner {
    #[serde(rename = "Self")]
    Myself,
    #[serde(rename = "Mentor")]
    Mentor,
    #[serde(rename = "Leader")]
    Leader,
    #[serde(rename = "Home Base")]
    HomeBase,
}

impl TaskOwner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Myself => "Self",
            Self::Mentor => "Mentor",
            Self::Leader => "Leader",
            Self::HomeBase => "Home Base",
        }
    }
}

impl FromStr for TaskOwner {
    type Err = OnboardingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Self" => Ok(Self::Myself),
            "Mentor" => Ok(Self::Mentor),
            "Leader" => Ok(Self::Leader),
            "Home Base" => Ok(Self::HomeBase),
            other => Err(OnboardingError::validation(format!(
                "unknown assigned_to '{other}'"
            ))),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(TaskCategory, TaskFormat, TaskOwner);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub week_num: i32,
    pub category: TaskCategory,
    pub format: TaskFormat,
    pub assigned_to: TaskOwner,
    pub resource_url: Option<String>,
}

/// Validated task fields, shared by create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub week_num: i32,
    pub category: TaskCategory,
    pub format: TaskFormat,
    pub assigned_to: TaskOwner,
    pub resource_url: Option<String>,
}

impl TaskDraft {
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            week_num: self.week_num,
            category: self.category,
            format: self.format,
            assigned_to: self.assigned_to,
            resource_url: self.resource_url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleTaskAssignment {
    pub role_id: RoleId,
    pub task_id: TaskId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role_id: Option<RoleId>,
    pub is_admin: bool,
    pub password_hash: Option<String>,
}

/// Validated user fields. `password_hash` of `None` on update keeps the stored credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub role_id: Option<RoleId>,
    pub is_admin: bool,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role_id: Option<RoleId>,
    pub role: Option<String>,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub user_id: UserId,
    pub task_id: TaskId,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub task_id: TaskId,
    pub completed: bool,
}

impl From<&ProgressEntry> for ProgressState {
    fn from(entry: &ProgressEntry) -> Self {
        Self {
            task_id: entry.task_id,
            completed: entry.completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskWithRoles {
    #[serde(flatten)]
    pub task: Task,
    pub roles: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRollup {
    pub week_num: i32,
    pub total: u64,
    pub done: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRollup {
    pub role_id: RoleId,
    pub role: String,
    pub total: u64,
    pub done: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgressRow {
    pub id: TaskId,
    pub title: String,
    pub week_num: i32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub percent_complete: u32,
    pub weeks: Vec<WeekRollup>,
    pub tasks: Vec<TaskProgressRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemOverview {
    pub user_count: u64,
    pub task_count: u64,
    pub comp_count: u64,
    pub completion_pct: u32,
    pub role_stats: Vec<RoleRollup>,
    pub week_stats: Vec<WeekRollup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorBrief {
    pub user_id: UserId,
    pub completed: u64,
    pub total: u64,
    pub percent_complete: u32,
    pub next_tasks: Vec<String>,
}

/// Everything the aggregator joins, read in one consistent pass.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub roles: Vec<Role>,
    pub tasks: Vec<Task>,
    pub assignments: Vec<RoleTaskAssignment>,
    pub users: Vec<User>,
    pub progress: Vec<ProgressEntry>,
}

// ===== Request bodies =====

/// `week_num` arrives as a number from JSON clients and as a string from form posts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WeekInput {
    Number(serde_json::Number),
    Text(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskRequest {
    pub title: Option<String>,
    pub week_num: Option<WeekInput>,
    pub category: Option<String>,
    pub format: Option<String>,
    pub assigned_to: Option<String>,
    pub resource_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCreated {
    pub task_id: TaskId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleRequest {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignRolesRequest {
    pub task_id: Option<TaskId>,
    pub role_ids: Option<Vec<RoleId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRolesResponse {
    pub ok: bool,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub role_id: Option<RoleId>,
    pub is_admin: Option<bool>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressRequest {
    pub user_id: Option<UserId>,
    pub completed: Option<bool>,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressQuery {
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Select boxes post ids as strings and "no selection" as `""`.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid id {n}"))),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid id '{s}'"))),
        Some(other) => Err(D::Error::custom(format!("invalid id {other}"))),
    }
}

/// Caller identity decoded from the bearer token, passed into every protected call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role_id: Option<RoleId>,
    pub is_admin: bool,
}

/// The `user` object returned by login and `/auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(rename = "roleId")]
    pub role_id: Option<RoleId>,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role_id: user.role_id,
            is_admin: user.is_admin,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: SessionUser,
}
