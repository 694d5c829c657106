use serde::{Deserialize, Serialize};

use super::user_info::UserInfo;

/// Login response from the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Authenticated user information
    pub user: UserInfo,
    /// Short-lived JWT access token
    pub access: String,
    /// Refresh token for obtaining new access tokens
    pub refresh: String,
}
