use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewUser, User},
    helpers::{hash_password, verify_password},
    traits::UserManagement,
    AppError,
    Context,
    UserId,
};

/// `AuthApi` registers new users and authenticates existing ones.
pub struct AuthApi<B> {
    db: B,
}

impl<B: Debug> Debug for AuthApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthApi ({:?})", self.db)
    }
}

impl<B> AuthApi<B>
where B: UserManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Creates a new user. The password is hashed before it goes anywhere near storage.
    pub async fn register(&self, ctx: &Context, username: &str, password: &str) -> Result<User, AppError> {
        let rid = ctx.request_id();
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed. {e}")))??;
        let user = self.db.insert_user(ctx, NewUser { username: username.to_string(), password_hash }).await?;
        info!("🔐️ [{rid}] Registered user #{} ({})", user.id, user.username);
        Ok(user)
    }

    /// Checks a username and password. An unknown username and a wrong password are indistinguishable to the caller:
    /// both give [`AppError::InvalidCredentials`].
    pub async fn login(&self, ctx: &Context, username: &str, password: &str) -> Result<User, AppError> {
        let rid = ctx.request_id();
        let Some(user) = self.db.fetch_user_by_username(ctx, username).await? else {
            debug!("🔐️ [{rid}] Login attempt for unknown user {username}");
            return Err(AppError::InvalidCredentials);
        };
        let password = password.to_string();
        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::internal(format!("Password verification task failed. {e}")))?;
        if !valid {
            debug!("🔐️ [{rid}] Wrong password for user #{}", user.id);
            return Err(AppError::InvalidCredentials);
        }
        debug!("🔐️ [{rid}] User #{} logged in", user.id);
        Ok(user)
    }

    pub async fn user_by_id(&self, ctx: &Context, id: UserId) -> Result<User, AppError> {
        self.db.fetch_user_by_id(ctx, id).await?.ok_or(AppError::UserNotFound)
    }
}
