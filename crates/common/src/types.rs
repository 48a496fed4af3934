use serde::{Deserialize, Serialize};

/// Storage-assigned identifier of a persisted cart row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartId(i64);

impl CartId {
    /// Creates a cart ID from the raw row identifier.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw row identifier.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for CartId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CartId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Customer identifier. Carts are owned by the customer's username.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(String);

impl CustomerId {
    /// Creates a customer ID from a username.
    pub fn new(username: impl Into<String>) -> Self {
        Self(username.into())
    }

    /// Returns the username as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CustomerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CustomerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Product model, the key of a product record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductModel(String);

impl ProductModel {
    /// Creates a product model from a string.
    pub fn new(model: impl Into<String>) -> Self {
        Self(model.into())
    }

    /// Returns the model as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProductModel {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProductModel {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ProductModel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Manager,
    Admin,
}

impl Role {
    /// Returns the canonical name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "Customer",
            Role::Manager => "Manager",
            Role::Admin => "Admin",
        }
    }

    /// Returns true for roles allowed to run administrative cart operations.
    pub fn is_admin_or_manager(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized role name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl std::fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Customer" => Ok(Role::Customer),
            "Manager" => Ok(Role::Manager),
            "Admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
