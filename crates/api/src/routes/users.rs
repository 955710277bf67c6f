//! Account endpoints: registration, login, profile and administration.
//!
//! Request bodies accept the storefront's Spanish field names as aliases
//! (`nombre`, `apellido`, `correo`, `contrasena`, `telefono`, `direccion`,
//! `rol`); they are mapped onto the domain inputs here and nowhere else.
//! None of the request types are `Debug`, since they carry secrets.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use domain::{AccountPatch, Registration};
use serde::{Deserialize, Serialize};
use store::{Account, AccountId, Role, Storefront};

use crate::auth::{AdminUser, AuthUser};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(alias = "nombre")]
    pub name: Option<String>,
    #[serde(alias = "apellido")]
    pub surname: Option<String>,
    #[serde(alias = "correo")]
    pub email: Option<String>,
    #[serde(alias = "contrasena")]
    pub password: Option<String>,
    #[serde(alias = "telefono")]
    pub phone: Option<String>,
    #[serde(alias = "direccion")]
    pub address: Option<String>,
}

impl RegisterRequest {
    /// Self-registration always creates a customer account.
    fn into_registration(self) -> Result<Registration, ApiError> {
        let (Some(name), Some(email), Some(password)) = (self.name, self.email, self.password)
        else {
            return Err(ApiError::BadRequest(
                "Name, email and password are required".to_string(),
            ));
        };
        Ok(Registration {
            name,
            surname: self.surname,
            email,
            password,
            phone: self.phone,
            address: self.address,
            role: Role::Customer,
        })
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "correo")]
    pub email: Option<String>,
    #[serde(alias = "contrasena")]
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateAccountRequest {
    #[serde(alias = "nombre")]
    pub name: Option<String>,
    #[serde(alias = "apellido")]
    pub surname: Option<String>,
    #[serde(alias = "correo")]
    pub email: Option<String>,
    #[serde(alias = "contrasena")]
    pub password: Option<String>,
    #[serde(alias = "telefono")]
    pub phone: Option<String>,
    #[serde(alias = "direccion")]
    pub address: Option<String>,
    #[serde(alias = "rol")]
    pub role: Option<Role>,
}

impl From<UpdateAccountRequest> for AccountPatch {
    fn from(req: UpdateAccountRequest) -> Self {
        AccountPatch {
            name: req.name,
            surname: req.surname,
            email: req.email,
            password: req.password,
            phone: req.phone,
            address: req.address,
            role: req.role,
        }
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct UserEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub user: Account,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl UserEnvelope {
    fn user(user: Account) -> Self {
        Self {
            success: true,
            message: None,
            user,
            token: None,
        }
    }

    fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}

#[derive(Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<Account>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

// -- Handlers --

/// POST /users/register and POST /users: creates a customer and signs
/// a token for it.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserEnvelope>), ApiError> {
    let account = state.accounts.register(req.into_registration()?).await?;
    let token = state.tokens.issue(&account)?;

    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope {
            success: true,
            message: Some("Account registered"),
            user: account,
            token: Some(token),
        }),
    ))
}

/// POST /users/login
#[tracing::instrument(skip(state, req))]
pub async fn login<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let (Some(email), Some(password)) = (req.email, req.password) else {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    };

    let account = state
        .accounts
        .verify_credentials(&email, &password)
        .await?
        .ok_or_else(|| {
            metrics::counter!("login_failed_total").increment(1);
            ApiError::Unauthorized("Invalid credentials".to_string())
        })?;
    let token = state.tokens.issue(&account)?;
    tracing::info!(account_id = %account.id, "login succeeded");

    Ok(Json(UserEnvelope {
        success: true,
        message: Some("Login successful"),
        user: account,
        token: Some(token),
    }))
}

/// GET /users/profile
pub async fn profile<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<UserEnvelope>, ApiError> {
    let account = state.accounts.get(user.account_id).await?;
    Ok(Json(UserEnvelope::user(account)))
}

/// PUT /users/profile: the caller's own account; the role never changes.
#[tracing::instrument(skip(state, user, req), fields(account_id = %user.account_id))]
pub async fn update_profile<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateAccountRequest>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let account = state
        .accounts
        .update(user.account_id, req.into(), false)
        .await?;
    Ok(Json(UserEnvelope::user(account).with_message("Profile updated")))
}

/// PUT /users/{id}: the account itself or an administrator. Only
/// administrators may change the role.
#[tracing::instrument(skip(state, user, req), fields(caller = %user.account_id))]
pub async fn update<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateAccountRequest>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let target = AccountId::new(id);
    let is_admin = user.role.is_admin();
    if target != user.account_id && !is_admin {
        return Err(ApiError::Forbidden(
            "You can only update your own account".to_string(),
        ));
    }

    let account = state.accounts.update(target, req.into(), is_admin).await?;
    Ok(Json(UserEnvelope::user(account).with_message("Account updated")))
}

/// GET /users: administrators only.
pub async fn list<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = state.accounts.list().await?;
    Ok(Json(UserListResponse {
        success: true,
        users,
    }))
}

/// GET /users/{id}: administrators only.
pub async fn get<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let account = state.accounts.get(AccountId::new(id)).await?;
    Ok(Json(UserEnvelope::user(account)))
}

/// DELETE /users/{id}: administrators only. The account's orders go with it.
#[tracing::instrument(skip(state, admin), fields(admin = %admin.0.account_id))]
pub async fn delete<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.accounts.delete(AccountId::new(id)).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Account deleted",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_accepts_storefront_aliases() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"nombre":"Ana","apellido":"Ruiz","correo":"ana@example.com","contrasena":"secret1","rol":"admin"}"#,
        )
        .unwrap();
        let registration = req.into_registration().unwrap();
        assert_eq!(registration.name, "Ana");
        assert_eq!(registration.surname.as_deref(), Some("Ruiz"));
        assert_eq!(registration.email, "ana@example.com");
        assert_eq!(registration.role, Role::Customer);
    }

    #[test]
    fn registration_requires_name_email_and_password() {
        let req: RegisterRequest =
            serde_json::from_str(r#"{"email":"ana@example.com","password":"secret1"}"#).unwrap();
        assert!(matches!(
            req.into_registration(),
            Err(ApiError::BadRequest(ref m)) if m.contains("required")
        ));
    }

    #[test]
    fn update_maps_role_alias() {
        let req: UpdateAccountRequest =
            serde_json::from_str(r#"{"rol":"admin","telefono":"555"}"#).unwrap();
        let patch = AccountPatch::from(req);
        assert_eq!(patch.role, Some(Role::Admin));
        assert_eq!(patch.phone.as_deref(), Some("555"));
    }
}
