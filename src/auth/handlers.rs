use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, is_valid_email, normalize_email, verify_password, MIN_PASSWORD_LEN},
    },
    error::{ApiError, ApiResult},
    state::AppState,
    store::StoreError,
    users::repo_types::UserRecord,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn issue_tokens(keys: &JwtKeys, user: &UserRecord) -> ApiResult<AuthResponse> {
    Ok(AuthResponse {
        access_token: keys.sign_access(user.id)?,
        refresh_token: keys.sign_refresh(user.id)?,
        token_type: "bearer",
        user: PublicUser::from(user),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::validation("Password too short"));
    }
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Name is required"));
    }

    if UserRecord::find_by_email(state.store.as_ref(), &payload.email)
        .await?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = UserRecord::new(payload.email, hash, name.to_string(), payload.phone);
    // a concurrent registration can still win the unique index
    let user = state.store.save(&user).await.map_err(|e| match e {
        StoreError::Conflict(_) => ApiError::Conflict("Email already registered".into()),
        other => other.into(),
    })?;

    let keys = JwtKeys::from_ref(&state);
    let response = issue_tokens(&keys, &user)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }

    let Some(user) = UserRecord::find_by_email(state.store.as_ref(), &payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let response = issue_tokens(&keys, &user)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        ApiError::Unauthorized("Invalid refresh token".into())
    })?;

    let user = match UserRecord::find_by_id(state.store.as_ref(), claims.sub).await {
        Ok(user) => user,
        Err(StoreError::NotFound { .. }) => {
            return Err(ApiError::Unauthorized("User not found".into()));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(issue_tokens(&keys, &user)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<PublicUser>> {
    match UserRecord::find_by_id(state.store.as_ref(), user_id).await {
        Ok(user) => Ok(Json(PublicUser::from(&user))),
        Err(StoreError::NotFound { .. }) => {
            warn!(user_id = %user_id, "token for deleted user");
            Err(ApiError::Unauthorized("User not found".into()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use crate::test_support::{app, register, send};

    #[tokio::test]
    async fn register_then_login_and_me() {
        let (app, _) = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"email": " Ada@Clinic.org ", "password": "longenough", "name": "Ada"})),
        )
        .await;
        assert_eq!(status, 201);
        assert_eq!(body["user"]["email"], "ada@clinic.org");
        assert_eq!(body["token_type"], "bearer");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "ada@clinic.org", "password": "longenough"})),
        )
        .await;
        assert_eq!(status, 200);
        let token = body["access_token"].as_str().unwrap().to_string();

        let (status, me) = send(&app, Method::GET, "/api/v1/me", Some(&token), None).await;
        assert_eq!(status, 200);
        assert_eq!(me["name"], "Ada");
        assert!(me.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let (app, _) = app();
        register(&app, "dup@x.org").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "DUP@x.org", "password": "longenough", "name": "Dup"})),
        )
        .await;
        assert_eq!(status, 409);
        assert_eq!(body["detail"], "Email already registered");
    }

    #[tokio::test]
    async fn register_validates_input() {
        let (app, _) = app();
        for payload in [
            json!({"email": "not-an-email", "password": "longenough", "name": "A"}),
            json!({"email": "a@b.org", "password": "short", "name": "A"}),
            json!({"email": "a@b.org", "password": "longenough", "name": "  "}),
        ] {
            let (status, _) = send(&app, Method::POST, "/api/v1/auth/register", None, Some(payload)).await;
            assert_eq!(status, 400);
        }
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let (app, _) = app();
        register(&app, "eve@x.org").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "eve@x.org", "password": "not-the-password"})),
        )
        .await;
        assert_eq!(status, 401);
        assert_eq!(body["detail"], "Invalid credentials");
    }

    #[tokio::test]
    async fn refresh_issues_new_pair_and_rejects_access_token() {
        let (app, _) = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "ref@x.org", "password": "longenough", "name": "Ref"})),
        )
        .await;
        assert_eq!(status, 201);
        let refresh_token = body["refresh_token"].as_str().unwrap().to_string();
        let access_token = body["access_token"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh_token })),
        )
        .await;
        assert_eq!(status, 200);
        assert!(body["access_token"].is_string());

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": access_token })),
        )
        .await;
        assert_eq!(status, 401);
    }

    #[tokio::test]
    async fn protected_routes_need_an_access_token() {
        let (app, _) = app();
        let (status, _) = send(&app, Method::GET, "/api/v1/me", None, None).await;
        assert_eq!(status, 401);
        let (status, _) = send(&app, Method::GET, "/api/v1/me", Some("garbage"), None).await;
        assert_eq!(status, 401);
    }
}
