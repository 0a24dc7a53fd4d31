//! Login, logout, current user and password change

use axum::{extract::State, Json};
use patentdesk_common::{
    auth::AuthUser,
    db::models::User,
    errors::Result,
    services::{ChangePasswordRequest, LoginRequest, LoginResponse},
};

use super::{ok, ApiResponse, ClientIp, Message};
use crate::AppState;

pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    let response = state.services.auth.login(request, ip).await?;
    Ok(ok(response))
}

pub async fn logout(State(state): State<AppState>, user: AuthUser) -> Json<ApiResponse<Message>> {
    state.services.auth.logout(&user).await;
    ok(Message::new("logged out"))
}

pub async fn me(user: AuthUser) -> Json<ApiResponse<User>> {
    ok(user.user)
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<Message>>> {
    state.services.auth.change_password(&user, request).await?;
    Ok(ok(Message::new("password changed")))
}
