//! Role resolver — pick one home route from the caller's role set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::endpoints;
use crate::gateway::{ApiClient, ApiOutcome, GatewayError, Route};

/// Active role for routing purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
    Company,
}

impl Role {
    /// Lower-case name as used by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Company => "company",
        }
    }

    /// Initial screen for this role.
    pub fn home_route(&self) -> Route {
        Route::new(match self {
            Self::Admin => "AdminHome",
            Self::Member => "MemberHome",
            Self::Company => "CompanyHome",
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            "company" => Ok(Self::Company),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Response of the who-am-I endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub roles: Vec<String>,
    /// Everything else the backend returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reduce a role set to one active role.
///
/// Precedence is admin, then member, then company. An empty or unrecognized
/// set falls back to admin.
// TODO: confirm the admin fallback with product; an unknown role set should probably be denied.
pub fn resolve_role<S: AsRef<str>>(roles: &[S]) -> Role {
    let parsed: Vec<Role> = roles
        .iter()
        .filter_map(|r| r.as_ref().parse().ok())
        .collect();

    [Role::Admin, Role::Member, Role::Company]
        .into_iter()
        .find(|candidate| parsed.contains(candidate))
        .unwrap_or_else(|| {
            warn!(?parsed, "no recognized role, falling back to admin");
            Role::Admin
        })
}

/// Ask the backend who the caller is and resolve the active role.
///
/// Runs without a navigator so a `401` here cannot loop back into a forced
/// logout. Returns `None` when the call yields no result.
pub async fn fetch_role(client: &ApiClient) -> Result<Option<Role>, GatewayError> {
    let outcome = client.get(endpoints::MY_USER_DATA, None).await?;
    let value = match outcome {
        ApiOutcome::Json(value) => value,
        other => {
            debug!(?other, "who-am-I returned no user data");
            return Ok(None);
        }
    };
    let user: UserData = serde_json::from_value(value)?;
    let role = resolve_role(&user.roles);
    debug!(roles = ?user.roles, %role, "resolved active role");
    Ok(Some(role))
}
