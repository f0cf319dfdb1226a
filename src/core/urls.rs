#[derive(Debug)]
pub struct ApiUrls;

impl ApiUrls {
    pub const ROOT: &'static str = "/api";
    pub const HEALTH: &'static str = "/health";

    // Auth
    pub const AUTH_LOGIN: &'static str = "/api/auth/login";
    pub const AUTH_ME: &'static str = "/api/auth/me";

    // Roles
    pub const ROLES: &'static str = "/api/roles";
    pub const ROLE_BY_ID: &'static str = "/api/roles/:id";
    pub const ROLE_TASKS: &'static str = "/api/roles/:id/tasks";

    // Tasks
    pub const TASKS: &'static str = "/api/tasks";
    pub const TASKS_ALL: &'static str = "/api/tasks/all";
    pub const TASK_BY_ID: &'static str = "/api/tasks/:id";
    pub const TASKS_PROGRESS: &'static str = "/api/tasks/progress";
    pub const TASK_PROGRESS: &'static str = "/api/tasks/:id/progress";
    pub const ROLE_TASK_ASSIGN: &'static str = "/api/role_tasks";

    // Users
    pub const USERS: &'static str = "/api/users";
    pub const USER_BY_ID: &'static str = "/api/users/:id";
    pub const USER_PROGRESS_SUMMARY: &'static str = "/api/users/:id/progress_summary";
    pub const USER_MENTOR_BRIEF: &'static str = "/api/users/:id/mentor_brief";

    // Rollups
    pub const OVERVIEW: &'static str = "/api/overview";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_live_under_api() {
        for url in [
            ApiUrls::AUTH_LOGIN,
            ApiUrls::ROLE_TASKS,
            ApiUrls::TASK_PROGRESS,
            ApiUrls::ROLE_TASK_ASSIGN,
            ApiUrls::USER_MENTOR_BRIEF,
            ApiUrls::OVERVIEW,
        ] {
            assert!(url.starts_with(ApiUrls::ROOT));
        }
    }
}
