use serde::{Deserialize, Serialize};

use crate::error::LenderError;

/// Group id that bypasses every grant lookup.
pub const ADMIN_GROUP: i32 = 1;

/// Authenticated staff member acting on a request.
/// Loaded once per request by the server middleware and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub uid: i32,
    pub name: String,
    pub email: String,
    pub user_group: i32,
    pub branch: i32,
    pub status: i32,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.user_group == ADMIN_GROUP
    }

    pub fn require_admin(&self) -> Result<(), LenderError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(LenderError::Forbidden(format!(
                "user {} is not an administrator",
                self.uid
            )))
        }
    }

    /// `Name(email)(uid)` fragment used in audit messages.
    pub fn audit_label(&self) -> String {
        format!("{}({})({})", self.name, self.email, self.uid)
    }
}

/// JWT claims shape issued by the login service.
/// `scope[0]` names the database the token reads from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub uid: i32,
    #[serde(default)]
    pub scope: Vec<String>,
    pub exp: usize,
}

impl JwtClaims {
    pub fn data_scope(&self) -> DataScope {
        self.scope
            .first()
            .map(|s| DataScope::parse(s))
            .unwrap_or_default()
    }
}

/// Which database a request reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataScope {
    #[default]
    Current,
    Archive,
}

impl DataScope {
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("archive") {
            Self::Archive
        } else {
            Self::Current
        }
    }
}
