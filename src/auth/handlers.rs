// HTTP handlers for the /usuarios endpoints

use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::auth::{
    error::AuthError,
    middleware::AuthenticatedUser,
    models::{
        AccessTokenResponse, AuthResponse, ChangePasswordRequest, ForgotPasswordRequest,
        ForgotPasswordResponse, LoginRequest, MessageResponse, RefreshRequest, RegisterRequest,
        ResetPasswordRequest, TokenValidResponse, UpdateUserRequest, UserMessageResponse,
        UserResponse, ValidateTokenRequest,
    },
    service::AuthService,
};
use crate::error::ErrorResponse;

const FORGOT_PASSWORD_MESSAGE: &str =
    "Se o e-mail estiver cadastrado, você receberá um link de recuperação";

/// Routes mounted under `/usuarios`
pub fn routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    Arc<AuthService>: FromRef<S>,
{
    Router::new()
        .route("/", get(list_users_handler))
        .route("/cadastro", post(register_handler))
        .route("/login", post(login_handler))
        .route("/refresh", post(refresh_handler))
        .route("/perfil", get(profile_handler))
        .route("/esqueci-senha", post(forgot_password_handler))
        .route("/validar-token", post(validate_token_handler))
        .route("/redefinir-senha", post(reset_password_handler))
        .route(
            "/:id",
            get(get_user_handler)
                .patch(update_user_handler)
                .delete(delete_user_handler),
        )
        .route("/:id/alterar-senha", post(change_password_handler))
}

/// List all users ordered by name
#[utoipa::path(
    get,
    path = "/usuarios",
    responses((status = 200, description = "All users", body = Vec<UserResponse>)),
    tag = "usuarios"
)]
pub async fn list_users_handler(
    State(service): State<Arc<AuthService>>,
) -> Result<Json<Vec<UserResponse>>, AuthError> {
    let users = service.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/usuarios/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "usuarios"
)]
pub async fn get_user_handler(
    State(service): State<Arc<AuthService>>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, AuthError> {
    let user = service.get_user(id).await?;
    Ok(Json(user.into()))
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/usuarios/cadastro",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = UserMessageResponse),
        (status = 400, description = "Invalid input or email taken", body = ErrorResponse)
    ),
    tag = "usuarios"
)]
pub async fn register_handler(
    State(service): State<Arc<AuthService>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserMessageResponse>), AuthError> {
    let user = service.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserMessageResponse {
            message: "Usuário cadastrado com sucesso".to_string(),
            user: user.into(),
        }),
    ))
}

/// Login a user
#[utoipa::path(
    post,
    path = "/usuarios/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse)
    ),
    tag = "usuarios"
)]
pub async fn login_handler(
    State(service): State<Arc<AuthService>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let (user, tokens) = service.login(request).await?;
    Ok(Json(AuthResponse {
        message: "Login realizado com sucesso".to_string(),
        user: user.into(),
        access: tokens.access,
        refresh: tokens.refresh,
    }))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/usuarios/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 400, description = "Refresh token missing", body = ErrorResponse),
        (status = 401, description = "Refresh token invalid, expired or user gone", body = ErrorResponse)
    ),
    tag = "usuarios"
)]
pub async fn refresh_handler(
    State(service): State<Arc<AuthService>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, AuthError> {
    let access = service.refresh(request.refresh.as_deref()).await?;
    Ok(Json(AccessTokenResponse { access }))
}

/// Profile of the authenticated caller
#[utoipa::path(
    get,
    path = "/usuarios/perfil",
    responses(
        (status = 200, description = "Caller profile", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "usuarios"
)]
pub async fn profile_handler(
    AuthenticatedUser(user): AuthenticatedUser,
) -> Json<UserResponse> {
    Json(user.into())
}

#[utoipa::path(
    post,
    path = "/usuarios/esqueci-senha",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Same answer whether or not the email is registered", body = ForgotPasswordResponse),
        (status = 400, description = "Malformed email", body = ErrorResponse)
    ),
    tag = "usuarios"
)]
pub async fn forgot_password_handler(
    State(service): State<Arc<AuthService>>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>, AuthError> {
    let token = service.request_reset(request).await?;
    Ok(Json(ForgotPasswordResponse {
        message: FORGOT_PASSWORD_MESSAGE.to_string(),
        token,
    }))
}

#[utoipa::path(
    post,
    path = "/usuarios/validar-token",
    request_body = ValidateTokenRequest,
    responses(
        (status = 200, description = "Token is valid", body = TokenValidResponse),
        (status = 400, description = "Token invalid or expired", body = ErrorResponse)
    ),
    tag = "usuarios"
)]
pub async fn validate_token_handler(
    State(service): State<Arc<AuthService>>,
    Json(request): Json<ValidateTokenRequest>,
) -> Result<Json<TokenValidResponse>, AuthError> {
    let user = service.validate_recovery_token(request).await?;
    Ok(Json(TokenValidResponse {
        message: "Token válido".to_string(),
        email: user.email,
        name: user.name,
    }))
}

#[utoipa::path(
    post,
    path = "/usuarios/redefinir-senha",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset, new session issued", body = AuthResponse),
        (status = 400, description = "Token invalid or password rejected", body = ErrorResponse)
    ),
    tag = "usuarios"
)]
pub async fn reset_password_handler(
    State(service): State<Arc<AuthService>>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let (user, tokens) = service.reset_password(request).await?;
    Ok(Json(AuthResponse {
        message: "Senha redefinida com sucesso".to_string(),
        user: user.into(),
        access: tokens.access,
        refresh: tokens.refresh,
    }))
}

#[utoipa::path(
    post,
    path = "/usuarios/{id}/alterar-senha",
    params(("id" = i32, Path, description = "User ID")),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = UserMessageResponse),
        (status = 400, description = "Password rejected", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "usuarios"
)]
pub async fn change_password_handler(
    AuthenticatedUser(caller): AuthenticatedUser,
    State(service): State<Arc<AuthService>>,
    Path(id): Path<i32>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<UserMessageResponse>, AuthError> {
    let user = service.change_password(&caller, id, request).await?;
    Ok(Json(UserMessageResponse {
        message: "Senha alterada com sucesso".to_string(),
        user: user.into(),
    }))
}

#[utoipa::path(
    patch,
    path = "/usuarios/{id}",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserMessageResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "usuarios"
)]
pub async fn update_user_handler(
    AuthenticatedUser(caller): AuthenticatedUser,
    State(service): State<Arc<AuthService>>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserMessageResponse>, AuthError> {
    let user = service.update_profile(&caller, id, request).await?;
    Ok(Json(UserMessageResponse {
        message: "Usuário atualizado com sucesso".to_string(),
        user: user.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/usuarios/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "usuarios"
)]
pub async fn delete_user_handler(
    AuthenticatedUser(caller): AuthenticatedUser,
    State(service): State<Arc<AuthService>>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, AuthError> {
    let user = service.delete_user(&caller, id).await?;
    Ok(Json(MessageResponse::new(format!(
        "Usuário {} deletado com sucesso",
        user.name
    ))))
}
