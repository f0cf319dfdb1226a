use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;

use super::error::OnboardingResult;
use super::types::*;
use crate::core::urls::ApiUrls;
use crate::shared::state::AppState;
use crate::web::auth::OptionalAuth;

type Body<T> = Result<Json<T>, JsonRejection>;
type IdPath = Result<Path<i32>, PathRejection>;

pub fn onboarding_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::ROLES, get(list_roles_handler).post(create_role_handler))
        .route(ApiUrls::ROLE_BY_ID, put(rename_role_handler).delete(delete_role_handler))
        .route(ApiUrls::ROLE_TASKS, get(role_tasks_handler))
        .route(ApiUrls::TASKS, post(create_task_handler))
        .route(ApiUrls::TASKS_ALL, get(all_tasks_handler))
        .route(ApiUrls::TASKS_PROGRESS, get(progress_list_handler))
        .route(ApiUrls::TASK_BY_ID, put(update_task_handler).delete(delete_task_handler))
        .route(ApiUrls::TASK_PROGRESS, post(set_progress_handler))
        .route(ApiUrls::ROLE_TASK_ASSIGN, post(assign_roles_handler))
        .route(ApiUrls::USERS, get(list_users_handler).post(create_user_handler))
        .route(ApiUrls::USER_BY_ID, put(update_user_handler).delete(delete_user_handler))
        .route(ApiUrls::USER_PROGRESS_SUMMARY, get(progress_summary_handler))
        .route(ApiUrls::USER_MENTOR_BRIEF, get(mentor_brief_handler))
        .route(ApiUrls::OVERVIEW, get(overview_handler))
}

pub async fn list_roles_handler(
    State(state): State<Arc<AppState>>,
) -> OnboardingResult<Json<Vec<Role>>> {
    Ok(Json(state.service.list_roles().await?))
}

pub async fn create_role_handler(
    State(state): State<Arc<AppState>>,
    OptionalAuth(identity): OptionalAuth,
    body: Body<RoleRequest>,
) -> OnboardingResult<(StatusCode, Json<Role>)> {
    let role = state
        .service
        .create_role(identity.as_ref(), body?.0)
        .await?;
    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn rename_role_handler(
    State(state): State<Arc<AppState>>,
    OptionalAuth(identity): OptionalAuth,
    path: IdPath,
    body: Body<RoleRequest>,
) -> OnboardingResult<Json<OkResponse>> {
    state
        .service
        .rename_role(identity.as_ref(), path?.0, body?.0)
        .await?;
    Ok(Json(OkResponse::ok()))
}

pub async fn delete_role_handler(
    State(state): State<Arc<AppState>>,
    OptionalAuth(identity): OptionalAuth,
    path: IdPath,
) -> OnboardingResult<Json<OkResponse>> {
    state.service.delete_role(identity.as_ref(), path?.0).await?;
    Ok(Json(OkResponse::ok()))
}

pub async fn role_tasks_handler(
    State(state): State<Arc<AppState>>,
    path: IdPath,
) -> OnboardingResult<Json<Vec<Task>>> {
    Ok(Json(state.service.tasks_for_role(path?.0).await?))
}

pub async fn all_tasks_handler(
    State(state): State<Arc<AppState>>,
) -> OnboardingResult<Json<Vec<TaskWithRoles>>> {
    Ok(Json(state.service.all_tasks().await?))
}

pub async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    OptionalAuth(identity): OptionalAuth,
    body: Body<TaskRequest>,
) -> OnboardingResult<(StatusCode, Json<TaskCreated>)> {
    let created = state
        .service
        .create_task(identity.as_ref(), body?.0)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_task_handler(
    State(state): State<Arc<AppState>>,
    OptionalAuth(identity): OptionalAuth,
    path: IdPath,
    body: Body<TaskRequest>,
) -> OnboardingResult<Json<OkResponse>> {
    state
        .service
        .update_task(identity.as_ref(), path?.0, body?.0)
        .await?;
    Ok(Json(OkResponse::ok()))
}

pub async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    OptionalAuth(identity): OptionalAuth,
    path: IdPath,
) -> OnboardingResult<Json<OkResponse>> {
    state.service.delete_task(identity.as_ref(), path?.0).await?;
    Ok(Json(OkResponse::ok()))
}

pub async fn assign_roles_handler(
    State(state): State<Arc<AppState>>,
    OptionalAuth(identity): OptionalAuth,
    body: Body<AssignRolesRequest>,
) -> OnboardingResult<(StatusCode, Json<AssignRolesResponse>)> {
    let response = state
        .service
        .assign_roles(identity.as_ref(), body?.0)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn progress_list_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ProgressQuery>, QueryRejection>,
) -> OnboardingResult<Json<Vec<ProgressState>>> {
    let Query(query) = query?;
    Ok(Json(state.service.progress_for_user(query.user_id).await?))
}

pub async fn set_progress_handler(
    State(state): State<Arc<AppState>>,
    path: IdPath,
    body: Body<ProgressRequest>,
) -> OnboardingResult<Json<ProgressEntry>> {
    Ok(Json(state.service.set_progress(path?.0, body?.0).await?))
}

pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> OnboardingResult<Json<Vec<UserView>>> {
    Ok(Json(state.service.list_users().await?))
}

pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    OptionalAuth(identity): OptionalAuth,
    body: Body<UserRequest>,
) -> OnboardingResult<(StatusCode, Json<UserView>)> {
    let user = state
        .service
        .create_user(identity.as_ref(), body?.0)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    OptionalAuth(identity): OptionalAuth,
    path: IdPath,
    body: Body<UserRequest>,
) -> OnboardingResult<Json<OkResponse>> {
    state
        .service
        .update_user(identity.as_ref(), path?.0, body?.0)
        .await?;
    Ok(Json(OkResponse::ok()))
}

pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    OptionalAuth(identity): OptionalAuth,
    path: IdPath,
) -> OnboardingResult<Json<OkResponse>> {
    state.service.delete_user(identity.as_ref(), path?.0).await?;
    Ok(Json(OkResponse::ok()))
}

pub async fn progress_summary_handler(
    State(state): State<Arc<AppState>>,
    path: IdPath,
) -> OnboardingResult<Json<ProgressSummary>> {
    Ok(Json(state.service.progress_summary(path?.0).await?))
}

pub async fn mentor_brief_handler(
    State(state): State<Arc<AppState>>,
    path: IdPath,
) -> OnboardingResult<Json<MentorBrief>> {
    Ok(Json(state.service.mentor_brief(path?.0).await?))
}

pub async fn overview_handler(
    State(state): State<Arc<AppState>>,
) -> OnboardingResult<Json<SystemOverview>> {
    Ok(Json(state.service.overview().await?))
}
