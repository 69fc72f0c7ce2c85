use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::models::{Page, PageRequest, User, UserProfileResponse};
use crate::store::UserStore;
use crate::utils::error::AppError;

/// Read access to profiles plus soft deletion. Accounts themselves are
/// written by the external account system that authenticates callers.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    async fn load(&self, user_id: &str) -> Result<User, AppError> {
        self.users
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<UserProfileResponse, AppError> {
        self.load(user_id).await.map(UserProfileResponse::from)
    }

    pub async fn list_users(&self, page: PageRequest) -> Result<Page<UserProfileResponse>, AppError> {
        let users = self.users.find_all(page.normalized()).await?;
        Ok(users.map(UserProfileResponse::from))
    }

    pub async fn deactivate_user(&self, user_id: &str) -> Result<(), AppError> {
        let mut user = self.load(user_id).await?;
        user.active = false;
        user.updated_at = Utc::now();
        self.users.save(&user).await?;

        info!(user_id, "User deactivated");
        Ok(())
    }
}
