//! User Profile Service
//! Mission: Read and edit the caller's own profile

use crate::auth::models::{UpdateProfileRequest, UserResponse};
use crate::auth::service::USER_NOT_FOUND;
use crate::auth::user_store::UserStore;
use crate::error::{AppError, AppResult};
use crate::validation::{has_min_chars, Violations};
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserService {
    users: UserStore,
}

impl UserService {
    pub fn new(users: UserStore) -> Self {
        Self { users }
    }

    pub async fn get_profile(&self, user_id: &Uuid) -> AppResult<UserResponse> {
        let user = self
            .users
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;
        Ok(UserResponse::from_user(&user))
    }

    /// Only the display name is editable. An empty request returns the profile unchanged.
    pub async fn update_profile(
        &self,
        user_id: &Uuid,
        req: UpdateProfileRequest,
    ) -> AppResult<UserResponse> {
        let Some(name) = req.name else {
            return self.get_profile(user_id).await;
        };

        let mut violations = Violations::new();
        violations.check(has_min_chars(&name, 2), "Name must be at least 2 characters");
        violations.finish()?;

        let user = self
            .users
            .update_name(user_id, &name)
            .await?
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

        info!(user_id = %user.id, "Profile updated");
        Ok(UserResponse::from_user(&user))
    }
}
