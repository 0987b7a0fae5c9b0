use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::models::{ProjectRecord, ProjectSummary},
    error::{AppError, Result},
    forms::{ProjectFields, Upload},
    middleware::auth::AuthUser,
    services::images,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_projects)
                .post(create_project)
                .delete(delete_project),
        )
        .route("/recent", get(recent_projects))
        .route("/:id", get(get_project).put(update_project))
        .route("/:id/images/:kind", get(get_image))
}

#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectRecord>,
}

#[derive(Debug, Serialize)]
pub struct RecentProjectsResponse {
    pub first_name: String,
    pub projects: Vec<ProjectSummary>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub name: String,
}

async fn read_project_fields(mut multipart: Multipart) -> Result<ProjectFields> {
    let mut fields = ProjectFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart field: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if field.file_name().is_some() {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read upload {name}: {e}")))?;
            fields.insert_upload(
                name,
                Upload {
                    bytes: bytes.to_vec(),
                    content_type,
                },
            );
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read field {name}: {e}")))?;
            fields.insert_text(name, value);
        }
    }

    Ok(fields)
}

// Projects owned by someone else are reported as missing.
async fn owned_project(state: &AppState, user: &AuthUser, id: i64) -> Result<ProjectRecord> {
    let project = state.db.projects().get_one(id).await?;
    if project.user_id != user.id {
        return Err(AppError::NotFound("Project not found".to_string()));
    }
    Ok(project)
}

async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ProjectListResponse>> {
    let projects = state.db.projects().list_all(user.id).await?;
    Ok(Json(ProjectListResponse { projects }))
}

async fn recent_projects(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<RecentProjectsResponse>> {
    let account = state.db.users().find_by_id(user.id).await?;
    let projects = state
        .db
        .projects()
        .list_recent(user.id, state.config.recent_limit)
        .await?;

    Ok(Json(RecentProjectsResponse {
        first_name: account.first_name,
        projects,
    }))
}

async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Json<CreatedResponse>> {
    let project = read_project_fields(multipart).await?.new_project()?;

    let store = state.db.projects();
    if store.name_in_use(&project.name, user.id).await? {
        return Err(AppError::Conflict(
            "You have already used that project name. Please try another name.".to_string(),
        ));
    }

    let id = store.create(user.id, &project).await?;
    tracing::info!(project_id = id, user_id = user.id, name = %project.name, "project added");

    Ok(Json(CreatedResponse { id }))
}

async fn get_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ProjectRecord>> {
    let project = owned_project(&state, &user, id).await?;
    Ok(Json(project))
}

async fn update_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<ProjectRecord>> {
    owned_project(&state, &user, id).await?;

    let update = read_project_fields(multipart).await?.project_update()?;
    state.db.projects().update(id, &update).await?;
    tracing::info!(project_id = id, user_id = user.id, "project updated");

    let project = state.db.projects().get_one(id).await?;
    Ok(Json(project))
}

async fn delete_project(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<()>> {
    // Names are stored trimmed.
    let name = query.name.trim();
    state.db.projects().delete(name, user.id).await?;
    tracing::info!(user_id = user.id, name, "project removed");
    Ok(Json(()))
}

async fn get_image(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, kind)): Path<(i64, String)>,
) -> Result<Response> {
    let project = owned_project(&state, &user, id).await?;

    let image = match kind.as_str() {
        "mold" => project.mold_image(),
        "result" => project.result_image(),
        _ => return Err(AppError::NotFound(format!("Unknown image kind: {kind}"))),
    }
    .ok_or_else(|| AppError::NotFound("No image uploaded".to_string()))?;

    let (bytes, content_type) = images::decode_stored(&image)?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
