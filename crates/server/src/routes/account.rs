use axum::{extract::State, routing::get, Json, Router};

use crate::{
    db::models::User, error::Result, forms::AccountUpdateRequest,
    middleware::auth::AuthUser, services::accounts, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_account).put(update_account))
}

async fn get_account(State(state): State<AppState>, user: AuthUser) -> Result<Json<User>> {
    let account = state.db.users().find_by_id(user.id).await?;
    Ok(Json(account))
}

async fn update_account(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<AccountUpdateRequest>,
) -> Result<Json<User>> {
    let changes = body.validate(&user.username)?;
    let account = accounts::update_account(&state.db, user.id, changes).await?;
    Ok(Json(account))
}
