use crate::{
    db_types::{NewUser, User},
    AppError,
    Context,
    UserId,
};

#[allow(async_fn_in_trait)]
pub trait UserManagement {
    /// Stores a new user. The uniqueness check and the insert are atomic: if the username is already taken, by an
    /// earlier call or by a concurrent one, [`AppError::UserAlreadyExists`] is returned.
    async fn insert_user(&self, ctx: &Context, user: NewUser) -> Result<User, AppError>;

    async fn fetch_user_by_username(&self, ctx: &Context, username: &str) -> Result<Option<User>, AppError>;

    async fn fetch_user_by_id(&self, ctx: &Context, id: UserId) -> Result<Option<User>, AppError>;
}
