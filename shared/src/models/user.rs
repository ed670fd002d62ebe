//! User Model

use serde::{Deserialize, Serialize};

/// User account. Any user can become a seller by listing a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    /// Argon2 PHC string, never serialized
    #[serde(skip_serializing, default)]
    pub hashed_password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub profile_picture_url: Option<String>,
    pub is_seller: bool,
    pub member_since: i64,
    pub created_at: i64,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            profile_picture_url: self.profile_picture_url.clone(),
        }
    }
}

/// Public user card embedded in products and reviews
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture_url: Option<String>,
}

/// Current user profile with listing count (GET /api/auth/me)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub product_count: i64,
}

/// Create user input (password already hashed)
#[derive(Debug, Clone)]
pub struct UserCreate {
    pub email: String,
    pub hashed_password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Update profile payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub profile_picture_url: Option<String>,
}

/// Registration payload (POST /api/auth/register)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Login payload (POST /api/auth/login)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Issued token plus the signed-in user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "u-1".into(),
            email: "ana@example.com".into(),
            hashed_password: "$argon2id$secret".into(),
            first_name: "Ana".into(),
            last_name: "".into(),
            phone: None,
            profile_picture_url: None,
            is_seller: false,
            member_since: 0,
            created_at: 0,
        }
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(user()).unwrap();
        assert!(json.get("hashedPassword").is_none());
        assert_eq!(json["firstName"], "Ana");
        assert_eq!(json["isSeller"], false);
    }

    #[test]
    fn test_display_name_trims_missing_last_name() {
        assert_eq!(user().display_name(), "Ana");
    }
}
