//! Account registration, credential verification and profile updates.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use store::{
    Account, AccountChanges, AccountId, AccountRepository, NewAccount, Role, StoreError,
};
use validator::Validate;

use crate::error::{DomainError, Result};

/// Input for creating an account. Not `Debug`: it holds the plaintext secret.
#[derive(Clone, Default, Validate)]
pub struct Registration {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub surname: Option<String>,
    #[validate(email(message = "Email format is invalid"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
}

/// Partial account update. Absent fields keep their current value.
#[derive(Clone, Default, Validate)]
pub struct AccountPatch {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    pub surname: Option<String>,
    #[validate(email(message = "Email format is invalid"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Option<Role>,
}

/// Collapses validator output into one message, first failing field by name.
pub(crate) fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {field}"))
            })
        })
        .next()
        .unwrap_or_else(|| "Invalid input".to_string())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hashes a secret into an Argon2 PHC string on a blocking thread.
pub async fn hash_secret(secret: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StoreError::Backend(format!("secret could not be hashed: {e}")))
    })
    .await
    .map_err(|e| StoreError::Backend(e.to_string()))?
    .map_err(DomainError::Persistence)
}

/// Checks a secret against a stored PHC string. Malformed hashes never match.
pub async fn verify_secret(secret: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || {
        let Ok(parsed) = PasswordHash::new(&hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    })
    .await
    .unwrap_or(false)
}

/// Service for managing accounts.
#[derive(Clone)]
pub struct AccountService<R> {
    repo: R,
}

impl<R: AccountRepository> AccountService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new account.
    ///
    /// The email pre-check only saves a hash computation; the store's unique
    /// index decides races between concurrent registrations.
    #[tracing::instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, mut registration: Registration) -> Result<Account> {
        registration.email = normalize_email(&registration.email);
        registration
            .validate()
            .map_err(|e| DomainError::Validation(validation_message(&e)))?;

        let email = registration.email;
        if self.repo.get_account_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict(
                "Email is already registered".to_string(),
            ));
        }

        let secret_hash = hash_secret(registration.password).await?;
        let account = self
            .repo
            .create_account(NewAccount {
                name: registration.name.trim().to_string(),
                surname: registration.surname,
                email,
                phone: registration.phone,
                address: registration.address,
                role: registration.role,
                secret_hash,
            })
            .await?;

        metrics::counter!("accounts_registered_total").increment(1);
        tracing::info!(account_id = %account.id, "account registered");
        Ok(account)
    }

    /// Returns the account when the secret matches.
    ///
    /// Unknown email and wrong secret both yield `None`.
    #[tracing::instrument(skip(self, secret))]
    pub async fn verify_credentials(&self, email: &str, secret: &str) -> Result<Option<Account>> {
        let Some(credentials) = self.repo.get_credentials(&normalize_email(email)).await? else {
            return Ok(None);
        };

        if verify_secret(secret.to_string(), credentials.secret_hash).await {
            Ok(Some(credentials.account))
        } else {
            Ok(None)
        }
    }

    pub async fn get(&self, id: AccountId) -> Result<Account> {
        self.repo
            .get_account(id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "Account",
                id: id.as_i64(),
            })
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self.repo.get_account_by_email(&normalize_email(email)).await?)
    }

    pub async fn list(&self) -> Result<Vec<Account>> {
        Ok(self.repo.list_accounts().await?)
    }

    /// Applies a partial update. `allow_role_change` is false for self-service.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: AccountId,
        mut patch: AccountPatch,
        allow_role_change: bool,
    ) -> Result<Account> {
        patch.email = patch.email.as_deref().map(normalize_email);
        patch
            .validate()
            .map_err(|e| DomainError::Validation(validation_message(&e)))?;

        let current = self.get(id).await?;

        let email = match patch.email {
            Some(email) if email != current.email => {
                if let Some(other) = self.repo.get_account_by_email(&email).await?
                    && other.id != id
                {
                    return Err(DomainError::Conflict(
                        "Email is already registered".to_string(),
                    ));
                }
                email
            }
            _ => current.email,
        };

        let secret_hash = match patch.password {
            Some(secret) => Some(hash_secret(secret).await?),
            None => None,
        };

        let role = match patch.role {
            Some(role) if allow_role_change => role,
            _ => current.role,
        };

        let updated = self
            .repo
            .update_account(
                id,
                AccountChanges {
                    name: patch.name.unwrap_or(current.name),
                    surname: patch.surname.or(current.surname),
                    email,
                    phone: patch.phone.or(current.phone),
                    address: patch.address.or(current.address),
                    role,
                    secret_hash,
                },
            )
            .await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: AccountId) -> Result<()> {
        if self.repo.delete_account(id).await? {
            Ok(())
        } else {
            Err(DomainError::NotFound {
                entity: "Account",
                id: id.as_i64(),
            })
        }
    }
}
