//! Account lifecycle: registration, login, token refresh, identity
//! resolution, authorization and profile/password maintenance.

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    claims::Claims,
    dto::{LoginRequest, RegisterRequest, UpdatePasswordRequest, UpdateProfileRequest},
    jwt::{TokenError, TokenPair},
    password::{decoy_hash, hash_password, verify_password},
};
pub use super::repo_types::{Role, User};
use crate::{
    error::{AppError, AppResult},
    resources::{
        upload::{self, FileKind, Upload},
        validate::{self, is_valid_email, Required},
    },
    state::AppState,
};

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// What the rest of the application knows about the caller.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub name: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            name: user.name.clone(),
        }
    }
}

#[cfg(test)]
impl Identity {
    /// A caller that exists only in the token, for service-level tests.
    pub fn fake(role: Role) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            email: format!("{}@test.dev", id.simple()),
            role,
            name: "Tester".into(),
        }
    }
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn check_password_len(field: &str, password: &str) -> AppResult<()> {
    validate::length(field, password, 6, 128)
}

pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<(User, TokenPair)> {
    Required::new()
        .text("name", &req.name)
        .text("email", &req.email)
        .present("password", &req.password)
        .check()?;
    let (Some(name), Some(email), Some(password)) = (req.name, req.email, req.password) else {
        return Err(AppError::validation("Missing required fields"));
    };

    let name = name.trim().to_string();
    let email = normalize_email(&email);
    if !is_valid_email(&email) {
        return Err(AppError::validation("Please provide a valid email"));
    }
    validate::length("name", &name, 2, 50)?;
    check_password_len("password", &password)?;

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::conflict("User already exists with this email"));
    }

    let hash = hash_password(&password)?;
    let user = state.users.create(User::new(email, hash, name)).await?;
    let tokens = state.keys.issue_pair(user.id)?;

    info!(user_id = %user.id, "user registered");
    Ok((user, tokens))
}

pub async fn login(state: &AppState, req: LoginRequest) -> AppResult<(User, TokenPair)> {
    let (Some(email), Some(password)) = (req.email, req.password) else {
        return Err(AppError::validation("Please provide email and password"));
    };
    let email = normalize_email(&email);

    let Some(user) = state.users.find_by_email(&email).await? else {
        // keep timing in line with the wrong-password path
        let _ = verify_password(&password, decoy_hash());
        warn!("login for unknown email");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }

    let tokens = state.keys.issue_pair(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok((user, tokens))
}

/// Mints a new pair from a refresh token. The presented token stays valid
/// until it expires or is revoked.
pub async fn refresh(state: &AppState, refresh_token: Option<&str>) -> AppResult<TokenPair> {
    let token = refresh_token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::validation("Refresh token is required"))?;

    let claims = state.keys.verify_refresh(token).map_err(|e| {
        debug!(error = %e, "refresh token rejected");
        AppError::unauthorized("Invalid refresh token")
    })?;
    if state.revocations.is_revoked(claims.jti).await? {
        return Err(AppError::unauthorized("Invalid refresh token"));
    }
    if state.users.find_by_id(claims.sub).await?.is_none() {
        return Err(AppError::unauthorized("User not found"));
    }

    Ok(state.keys.issue_pair(claims.sub)?)
}

fn bearer(header: Option<&str>) -> AppResult<&str> {
    let header = header.ok_or_else(|| AppError::unauthorized("Access denied. No token provided."))?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::unauthorized("Access denied. No token provided."))
}

/// Resolves `Authorization: Bearer <access token>` to a live user.
pub async fn resolve_identity(
    state: &AppState,
    header: Option<&str>,
) -> AppResult<(Identity, Claims)> {
    let token = bearer(header)?;
    let claims = state.keys.verify_access(token).map_err(|e| match e {
        TokenError::Expired => AppError::unauthorized("Token expired"),
        TokenError::Invalid | TokenError::WrongKind(_) => AppError::unauthorized("Invalid token"),
    })?;
    if state.revocations.is_revoked(claims.jti).await? {
        return Err(AppError::unauthorized("Token has been revoked"));
    }
    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;
    Ok((Identity::from(&user), claims))
}

/// Same as [`resolve_identity`] but any failure means "anonymous".
pub async fn optional_identity(state: &AppState, header: Option<&str>) -> Option<Identity> {
    header?;
    match resolve_identity(state, header).await {
        Ok((identity, _)) => Some(identity),
        Err(e) => {
            debug!(error = %e, "optional auth ignored");
            None
        }
    }
}

pub fn authorize<'a>(identity: Option<&'a Identity>, allowed: &[Role]) -> AppResult<&'a Identity> {
    let identity = identity.ok_or_else(|| AppError::unauthorized("Authentication required"))?;
    if !allowed.contains(&identity.role) {
        warn!(user_id = %identity.id, role = ?identity.role, "role not permitted");
        return Err(AppError::forbidden("You do not have permission to perform this action"));
    }
    Ok(identity)
}

async fn current_user(state: &AppState, identity: &Identity) -> AppResult<User> {
    state
        .users
        .find_by_id(identity.id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))
}

pub async fn update_password(
    state: &AppState,
    identity: &Identity,
    req: UpdatePasswordRequest,
) -> AppResult<User> {
    let (Some(current), Some(new)) = (req.current_password, req.new_password) else {
        return Err(AppError::validation(
            "Please provide current password and new password",
        ));
    };
    check_password_len("newPassword", &new)?;

    let mut user = current_user(state, identity).await?;
    if !verify_password(&current, &user.password_hash)? {
        warn!(user_id = %user.id, "password change with wrong current password");
        return Err(AppError::unauthorized("Current password is incorrect"));
    }

    user.password_hash = hash_password(&new)?;
    user.updated_at = OffsetDateTime::now_utc();
    let user = state.users.update(user).await?;
    info!(user_id = %user.id, "password updated");
    Ok(user)
}

pub async fn get_profile(state: &AppState, identity: &Identity) -> AppResult<User> {
    current_user(state, identity).await
}

pub async fn update_profile(
    state: &AppState,
    identity: &Identity,
    req: UpdateProfileRequest,
) -> AppResult<User> {
    if let Some(name) = req.name.as_value() {
        validate::length("name", name.trim(), 2, 50)?;
    }
    if let Some(bio) = req.bio.as_value() {
        validate::length("bio", bio, 0, 1000)?;
    }
    if let Some(location) = req.location.as_value() {
        validate::length("location", location, 0, 100)?;
    }
    for (field, value) in [
        ("avatarUrl", &req.avatar_url),
        ("website", &req.website),
        ("linkedin", &req.linkedin),
        ("github", &req.github),
        ("twitter", &req.twitter),
    ] {
        if let Some(url) = value.as_value() {
            validate::url(field, url)?;
        }
    }

    let mut user = current_user(state, identity).await?;
    req.name
        .map(|n| n.trim().to_string())
        .apply_required(&mut user.name, "name")?;
    req.bio.apply(&mut user.bio);
    req.avatar_url.apply(&mut user.avatar_url);
    req.location.apply(&mut user.location);
    req.website.apply(&mut user.website);
    req.linkedin.apply(&mut user.linkedin);
    req.github.apply(&mut user.github);
    req.twitter.apply(&mut user.twitter);
    user.updated_at = OffsetDateTime::now_utc();

    let user = state.users.update(user).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(user)
}

/// Stores a new résumé PDF, then drops the previous file.
pub async fn upload_resume(
    state: &AppState,
    identity: &Identity,
    file: Option<Upload>,
) -> AppResult<User> {
    let file = file.ok_or_else(|| AppError::validation("resume file is required"))?;
    let mut user = current_user(state, identity).await?;

    let url = upload::store(state.storage.as_ref(), "resumes", &file, FileKind::Pdf).await?;
    let previous = user.resume_url.replace(url.clone());
    user.updated_at = OffsetDateTime::now_utc();

    let user = match state.users.update(user).await {
        Ok(user) => user,
        Err(e) => {
            upload::discard(state.storage.as_ref(), Some(&url)).await;
            return Err(e.into());
        }
    };
    upload::discard(state.storage.as_ref(), previous.as_deref()).await;
    info!(user_id = %user.id, "resume uploaded");
    Ok(user)
}

fn expiry_of(claims: &Claims) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(claims.exp as i64).unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Revokes the session's access token and, when given, a refresh token
/// belonging to the same user.
pub async fn logout(state: &AppState, session: &Claims, refresh_token: Option<&str>) -> AppResult<()> {
    state.revocations.revoke(session.jti, expiry_of(session)).await?;

    if let Some(token) = refresh_token.filter(|t| !t.is_empty()) {
        match state.keys.verify_refresh(token) {
            Ok(claims) if claims.sub == session.sub => {
                state.revocations.revoke(claims.jti, expiry_of(&claims)).await?;
            }
            Ok(_) => warn!(user_id = %session.sub, "logout with another user's refresh token"),
            Err(e) => debug!(error = %e, "logout refresh token ignored"),
        }
    }

    info!(user_id = %session.sub, "user logged out");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::{
        claims::TokenKind,
        jwt::tests::{claims_for, forge},
        repo::MemoryUserRepo,
    };
    use crate::resources::Patch;

    fn reg(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some(name.into()),
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    fn creds(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    fn bearer_of(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn register_then_login() {
        let state = AppState::fake();
        let (user, tokens) = register(&state, reg("Ada", " Ada@Example.com ", "secret1"))
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, Role::User);
        assert_ne!(user.password_hash, "secret1");
        assert!(!tokens.access_token.is_empty() && !tokens.refresh_token.is_empty());

        let (again, tokens) = login(&state, creds("ada@example.com", "secret1")).await.unwrap();
        assert_eq!(again.id, user.id);
        assert!(!tokens.access_token.is_empty() && !tokens.refresh_token.is_empty());
    }

    #[tokio::test]
    async fn register_validates_and_rejects_duplicates() {
        let state = AppState::fake();
        let err = register(
            &state,
            RegisterRequest {
                name: None,
                email: Some("x@y.com".into()),
                password: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: name, password");

        let err = register(&state, reg("Ada", "not-an-email", "secret1")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = register(&state, reg("Ada", "a@x.com", "123")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        register(&state, reg("Ada", "a@x.com", "secret1")).await.unwrap();
        let err = register(&state, reg("Bob", "A@X.com", "secret2")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let state = AppState::fake();
        register(&state, reg("Ada", "a@x.com", "secret1")).await.unwrap();

        let wrong_password = login(&state, creds("a@x.com", "nope-nope")).await.unwrap_err();
        let unknown_email = login(&state, creds("who@x.com", "secret1")).await.unwrap_err();
        assert!(matches!(wrong_password, AppError::Unauthorized(_)));
        assert!(matches!(unknown_email, AppError::Unauthorized(_)));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert_eq!(wrong_password.to_string(), INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn refresh_is_reusable_and_rejects_access_tokens() {
        let state = AppState::fake();
        let (_, tokens) = register(&state, reg("Ada", "a@x.com", "secret1")).await.unwrap();

        let first = refresh(&state, Some(&tokens.refresh_token)).await.unwrap();
        let second = refresh(&state, Some(&tokens.refresh_token)).await.unwrap();
        assert!(!first.access_token.is_empty());
        assert!(!second.refresh_token.is_empty());

        let err = refresh(&state, Some(&tokens.access_token)).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        let err = refresh(&state, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = refresh(&state, Some("  ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn identity_resolution_rules() {
        let users = Arc::new(MemoryUserRepo::default());
        let state = AppState::fake().with_users(users.clone());
        let (user, tokens) = register(&state, reg("Ada", "a@x.com", "secret1")).await.unwrap();

        let (identity, _) = resolve_identity(&state, Some(&bearer_of(&tokens.access_token)))
            .await
            .unwrap();
        assert_eq!(
            identity,
            Identity {
                id: user.id,
                email: "a@x.com".into(),
                role: Role::User,
                name: "Ada".into()
            }
        );

        for header in [None, Some("Basic abc"), Some("Bearer ")] {
            let err = resolve_identity(&state, header).await.unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(_)), "{header:?}");
        }

        let refresh_as_access = bearer_of(&tokens.refresh_token);
        assert!(resolve_identity(&state, Some(&refresh_as_access)).await.is_err());

        let expired = forge(&claims_for(user.id, TokenKind::Access, -30), "access-secret");
        let err = resolve_identity(&state, Some(&bearer_of(&expired))).await.unwrap_err();
        assert_eq!(err.to_string(), "Token expired");

        let foreign = forge(&claims_for(user.id, TokenKind::Access, 600), "someone-elses-secret");
        let err = resolve_identity(&state, Some(&bearer_of(&foreign))).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid token");

        users.remove(user.id);
        let err = resolve_identity(&state, Some(&bearer_of(&tokens.access_token)))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User not found");
        assert!(refresh(&state, Some(&tokens.refresh_token)).await.is_err());
    }

    #[tokio::test]
    async fn optional_identity_degrades_to_anonymous() {
        let state = AppState::fake();
        assert_eq!(optional_identity(&state, None).await, None);
        assert_eq!(optional_identity(&state, Some("Bearer garbage")).await, None);

        let (user, tokens) = register(&state, reg("Ada", "a@x.com", "secret1")).await.unwrap();
        let found = optional_identity(&state, Some(&bearer_of(&tokens.access_token))).await;
        assert_eq!(found.map(|i| i.id), Some(user.id));
    }

    #[test]
    fn authorize_checks_presence_then_role() {
        let user = Identity {
            id: Uuid::new_v4(),
            email: "u@x.com".into(),
            role: Role::User,
            name: "U".into(),
        };
        assert!(matches!(
            authorize(None, &[Role::Admin]).unwrap_err(),
            AppError::Unauthorized(_)
        ));
        assert!(matches!(
            authorize(Some(&user), &[Role::Admin]).unwrap_err(),
            AppError::Forbidden(_)
        ));
        assert!(authorize(Some(&user), &[Role::Admin, Role::User]).is_ok());
    }

    #[tokio::test]
    async fn password_change_requires_current_password() {
        let state = AppState::fake();
        let (user, _) = register(&state, reg("Ada", "a@x.com", "secret1")).await.unwrap();
        let identity = Identity::from(&user);

        let err = update_password(
            &state,
            &identity,
            UpdatePasswordRequest {
                current_password: Some("secret1".into()),
                new_password: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = update_password(
            &state,
            &identity,
            UpdatePasswordRequest {
                current_password: Some("wrong!".into()),
                new_password: Some("secret2".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        update_password(
            &state,
            &identity,
            UpdatePasswordRequest {
                current_password: Some("secret1".into()),
                new_password: Some("secret2".into()),
            },
        )
        .await
        .unwrap();
        assert!(login(&state, creds("a@x.com", "secret1")).await.is_err());
        assert!(login(&state, creds("a@x.com", "secret2")).await.is_ok());
    }

    #[tokio::test]
    async fn profile_patch_keeps_absent_and_clears_null() {
        let state = AppState::fake();
        let (user, _) = register(&state, reg("Ada", "a@x.com", "secret1")).await.unwrap();
        let identity = Identity::from(&user);

        let req: UpdateProfileRequest =
            serde_json::from_str(r#"{"bio":"hello","github":"https://github.com/ada"}"#).unwrap();
        let user = update_profile(&state, &identity, req).await.unwrap();
        assert_eq!(user.bio.as_deref(), Some("hello"));

        let req: UpdateProfileRequest = serde_json::from_str(r#"{"bio":null}"#).unwrap();
        let user = update_profile(&state, &identity, req).await.unwrap();
        assert_eq!(user.bio, None);
        assert_eq!(user.github.as_deref(), Some("https://github.com/ada"));
        assert_eq!(user.name, "Ada");

        let req: UpdateProfileRequest = serde_json::from_str(r#"{"name":null}"#).unwrap();
        assert!(update_profile(&state, &identity, req).await.is_err());
        let req: UpdateProfileRequest = serde_json::from_str(r#"{"website":"nope"}"#).unwrap();
        assert!(update_profile(&state, &identity, req).await.is_err());
    }

    #[tokio::test]
    async fn profile_text_limits() {
        let state = AppState::fake();
        let (user, _) = register(&state, reg("Ada", "a@x.com", "secret1")).await.unwrap();
        let identity = Identity::from(&user);

        let req = UpdateProfileRequest {
            bio: Patch::Value("b".repeat(1000)),
            location: Patch::Value("l".repeat(100)),
            ..Default::default()
        };
        let user = update_profile(&state, &identity, req).await.unwrap();
        assert_eq!(user.bio.map(|b| b.len()), Some(1000));

        let req = UpdateProfileRequest {
            bio: Patch::Value("b".repeat(1001)),
            ..Default::default()
        };
        assert_eq!(
            update_profile(&state, &identity, req).await.unwrap_err().to_string(),
            "bio must be between 0 and 1000 characters"
        );
        let req = UpdateProfileRequest {
            location: Patch::Value("l".repeat(101)),
            ..Default::default()
        };
        assert_eq!(
            update_profile(&state, &identity, req).await.unwrap_err().to_string(),
            "location must be between 0 and 100 characters"
        );
    }

    #[tokio::test]
    async fn logout_revokes_both_tokens() {
        let state = AppState::fake();
        let (_, tokens) = register(&state, reg("Ada", "a@x.com", "secret1")).await.unwrap();
        let header = bearer_of(&tokens.access_token);
        let (_, session) = resolve_identity(&state, Some(&header)).await.unwrap();

        logout(&state, &session, Some(&tokens.refresh_token)).await.unwrap();

        let err = resolve_identity(&state, Some(&header)).await.unwrap_err();
        assert_eq!(err.to_string(), "Token has been revoked");
        assert!(refresh(&state, Some(&tokens.refresh_token)).await.is_err());
    }
}
