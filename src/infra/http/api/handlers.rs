use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::banners::AdminBannerError;
use crate::application::repos::RepoError;
use crate::application::resolution::ResolutionError;
use crate::domain::patch::BannerPatch;

use super::error::{ApiError, codes};
use super::models::*;
use super::state::ApiState;

pub async fn get_user_banner(
    State(state): State<ApiState>,
    query: Result<Query<UserBannerQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(query_to_api)?;

    let feature_id = query
        .feature_id
        .ok_or_else(|| ApiError::bad_request("feature_id is required", None))?;
    let tag_id = query
        .tag_id
        .ok_or_else(|| ApiError::bad_request("tag_id is required", None))?;
    let use_last_revision = parse_flag(query.use_last_revision.as_deref());

    let content = state
        .resolution
        .resolve(feature_id, tag_id, use_last_revision)
        .await
        .map_err(resolution_to_api)?;

    Ok(Json(content))
}

pub async fn list_banners(
    State(state): State<ApiState>,
    query: Result<Query<BannerListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(query_to_api)?;

    if query.offset.is_some_and(|offset| offset < 0) {
        return Err(ApiError::bad_request("offset must not be negative", None));
    }

    let banners = state
        .banners
        .list_banners(
            query.feature_id.unwrap_or(0),
            query.tag_id.unwrap_or(0),
            query.limit.unwrap_or(0),
            query.offset.unwrap_or(0),
        )
        .await
        .map_err(banner_to_api)?;

    Ok(Json(banners))
}

pub async fn create_banner(
    State(state): State<ApiState>,
    payload: Result<Json<BannerCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(json_to_api)?;

    let banner = state
        .banners
        .create_banner(payload.into())
        .await
        .map_err(create_to_api)?;

    Ok((StatusCode::CREATED, Json(banner)))
}

pub async fn update_banner(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<BannerPatchRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(path_to_api)?;
    let Json(payload) = payload.map_err(json_to_api)?;

    let patch = BannerPatch::from(payload);
    if patch.is_empty() {
        return Err(ApiError::bad_request("update carries no fields", None));
    }

    state
        .banners
        .update_banner(id, patch)
        .await
        .map_err(banner_to_api)?;

    Ok(StatusCode::OK)
}

pub async fn delete_banner(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(path_to_api)?;

    state
        .banners
        .delete_banner(id)
        .await
        .map_err(banner_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}

fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(msg) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(msg),
        ),
    }
}

fn banner_to_api(err: AdminBannerError) -> ApiError {
    match err {
        AdminBannerError::Invalid(domain) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid banner",
            Some(domain.to_string()),
        ),
        AdminBannerError::NotFound => ApiError::not_found("banner not found"),
        AdminBannerError::WriteFailed(repo) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::WRITE_FAILED,
            "Banner update could not be written",
            Some(repo.to_string()),
        ),
        AdminBannerError::Repo(repo) => repo_to_api(repo),
    }
}

/// End users only ever learn whether a banner is available; store failures
/// are reported as absent and surface in the response log.
fn resolution_to_api(err: ResolutionError) -> ApiError {
    match err {
        ResolutionError::NotFound { .. } => ApiError::not_found("banner not found"),
        ResolutionError::Repo(repo) => {
            ApiError::not_found("banner not found").with_detail(repo.to_string())
        }
    }
}

/// Creation failures other than timeouts are reported as bad requests.
fn create_to_api(err: AdminBannerError) -> ApiError {
    match err {
        AdminBannerError::Repo(RepoError::Timeout) => repo_to_api(RepoError::Timeout),
        AdminBannerError::Repo(RepoError::Duplicate { constraint }) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::DUPLICATE,
            "Banner already bound to a feature and tag pair",
            Some(constraint),
        ),
        AdminBannerError::Repo(RepoError::InvalidInput { message })
        | AdminBannerError::Repo(RepoError::Integrity { message }) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid banner",
            Some(message),
        ),
        AdminBannerError::Repo(other) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::REPO,
            "Banner could not be created",
            Some(other.to_string()),
        ),
        other => banner_to_api(other),
    }
}

fn query_to_api(rejection: QueryRejection) -> ApiError {
    ApiError::bad_request("invalid query parameters", Some(rejection.body_text()))
}

fn path_to_api(rejection: PathRejection) -> ApiError {
    ApiError::bad_request("invalid banner id", Some(rejection.body_text()))
}

fn json_to_api(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request("invalid request body", Some(rejection.body_text()))
}
