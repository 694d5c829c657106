use serde::{Deserialize, Serialize};

/// Login request body for `POST auth/login/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email (the server authenticates by email)
    pub email: String,
    pub password: String,
}
