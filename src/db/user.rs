//! User model for prepboard.
//!
//! This module defines the User struct and Role enum for identity management.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error returned when a role string is not recognised.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

/// User role for permission management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Regular member.
    #[default]
    Member,
    /// Administrator (moderates submissions).
    Admin,
}

impl Role {
    /// Convert role to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }

    /// Whether this role moderates submissions.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Landing page hint for a freshly logged-in user with this role.
    pub fn redirect_path(&self) -> &'static str {
        match self {
            Role::Member => "/user/dashboard",
            Role::Admin => "/admin/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" | "user" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = ParseRoleError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// User entity representing a registered identity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Email address (unique, case-insensitive).
    pub email: String,
    /// Password hash (Argon2).
    pub password: String,
    /// User role.
    #[sqlx(try_from = "String")]
    pub role: Role,
    /// Account creation time (unix seconds).
    pub created_at: i64,
}

impl User {
    /// Check if this user is an administrator.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Password hash (should be pre-hashed with Argon2).
    pub password: String,
    /// User role (defaults to Member).
    pub role: Role,
}

impl NewUser {
    /// Create a new member with the required fields.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role: Role::Member,
        }
    }

    /// Set the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_str() {
        assert_eq!("member".parse::<Role>().unwrap(), Role::Member);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::Member);
        assert_eq!(
            "sysop".parse::<Role>(),
            Err(ParseRoleError("sysop".to_string()))
        );
    }

    #[test]
    fn test_role_as_str() {
        assert_eq!(Role::Member.as_str(), "member");
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn test_role_try_from_string() {
        assert_eq!(Role::try_from("admin".to_string()).unwrap(), Role::Admin);
        assert!(Role::try_from(String::new()).is_err());
    }

    #[test]
    fn test_role_default() {
        assert_eq!(Role::default(), Role::Member);
    }

    #[test]
    fn test_redirect_path() {
        assert_eq!(Role::Admin.redirect_path(), "/admin/dashboard");
        assert_eq!(Role::Member.redirect_path(), "/user/dashboard");
    }

    #[test]
    fn test_new_user_builder() {
        let user = NewUser::new("Alice", "alice@example.com", "hash").with_role(Role::Admin);
        assert_eq!(user.name, "Alice");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.password, "hash");
        assert_eq!(user.role, Role::Admin);

        let user = NewUser::new("Bob", "bob@example.com", "hash");
        assert_eq!(user.role, Role::Member);
    }
}
