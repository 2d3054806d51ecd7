//! Grant-based authorization.
//!
//! A grant row in `o_permissions` ties a group or a user to a resource table
//! and a record (0 = any record), with one flag column per action. Any enabled
//! grant that matches the principal's group or user id authorizes the action;
//! administrators skip the lookup entirely. Lookup failures deny.

use std::fmt;
use std::sync::Arc;

use crate::error::{LenderError, Result};
use crate::ports::{GrantStore, PrincipalStore};
use crate::principal::Principal;

/// Action flag on a grant row. The column name is never taken from input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    General,
    Create,
    Read,
    Update,
    Delete,
    Block,
    Unblock,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Self::General,
        Self::Create,
        Self::Read,
        Self::Update,
        Self::Delete,
        Self::Block,
        Self::Unblock,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Self::General => "general_",
            Self::Create => "create_",
            Self::Read => "read_",
            Self::Update => "update_",
            Self::Delete => "delete_",
            Self::Block => "block_",
            Self::Unblock => "unblock_",
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            Self::General => "access",
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Block => "block",
            Self::Unblock => "unblock",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Resource types that carry grants, named by their table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Customers,
    CustomerContacts,
    CustomerConversations,
    Users,
}

impl Resource {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Customers => "o_customers",
            Self::CustomerContacts => "o_customer_contacts",
            Self::CustomerConversations => "o_customer_conversations",
            Self::Users => "o_users",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Which record a grant covers. Stored as `rec = 0` for [`RecordScope::Any`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordScope {
    Any,
    Record(i32),
}

impl RecordScope {
    pub fn rec(&self) -> i32 {
        match self {
            Self::Any => 0,
            Self::Record(id) => *id,
        }
    }
}

/// Grant lookup handed to the store for non-admin principals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantQuery {
    pub group_id: i32,
    pub user_id: i32,
    pub resource: Resource,
    pub record: RecordScope,
    pub action: Action,
}

/// A stored grant row. Only used by stores that hold grants in memory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grant {
    pub group_id: i32,
    pub user_id: i32,
    pub tbl: String,
    pub rec: i32,
    pub general: bool,
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
    pub block: bool,
    pub unblock: bool,
}

impl Grant {
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::General => self.general,
            Action::Create => self.create,
            Action::Read => self.read,
            Action::Update => self.update,
            Action::Delete => self.delete,
            Action::Block => self.block,
            Action::Unblock => self.unblock,
        }
    }

    /// True when this row satisfies `query`.
    pub fn matches(&self, query: &GrantQuery) -> bool {
        self.tbl == query.resource.table()
            && self.rec == query.record.rec()
            && self.allows(query.action)
            && (self.group_id == query.group_id || self.user_id == query.user_id)
    }
}

/// Decides whether a principal may perform an action.
#[derive(Clone)]
pub struct PermissionEvaluator {
    principals: Arc<dyn PrincipalStore>,
    grants: Arc<dyn GrantStore>,
}

impl PermissionEvaluator {
    pub fn new(principals: Arc<dyn PrincipalStore>, grants: Arc<dyn GrantStore>) -> Self {
        Self { principals, grants }
    }

    /// Fails closed: an unknown principal or any store error yields `false`.
    pub async fn is_authorized(
        &self,
        principal_id: i32,
        resource: Resource,
        record: RecordScope,
        action: Action,
    ) -> bool {
        let principal = match self.principals.find_principal(principal_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                tracing::debug!(principal_id, "permission check for unknown principal");
                return false;
            }
            Err(e) => {
                tracing::warn!(principal_id, error = %e, "principal lookup failed, denying");
                return false;
            }
        };
        self.principal_is_authorized(&principal, resource, record, action)
            .await
    }

    /// Same decision for an already-loaded principal.
    pub async fn principal_is_authorized(
        &self,
        principal: &Principal,
        resource: Resource,
        record: RecordScope,
        action: Action,
    ) -> bool {
        if principal.is_admin() {
            return true;
        }
        let query = GrantQuery {
            group_id: principal.user_group,
            user_id: principal.uid,
            resource,
            record,
            action,
        };
        match self.grants.has_matching_grant(&query).await {
            Ok(allowed) => {
                tracing::debug!(
                    principal_id = principal.uid,
                    resource = %resource,
                    action = %action,
                    allowed,
                    "grant lookup"
                );
                allowed
            }
            Err(e) => {
                tracing::warn!(
                    principal_id = principal.uid,
                    resource = %resource,
                    action = %action,
                    error = %e,
                    "grant lookup failed, denying"
                );
                false
            }
        }
    }

    /// `Forbidden` with the caller's message unless authorized.
    pub async fn require(
        &self,
        principal: &Principal,
        resource: Resource,
        action: Action,
        message: &str,
    ) -> Result<()> {
        if self
            .principal_is_authorized(principal, resource, RecordScope::Any, action)
            .await
        {
            Ok(())
        } else {
            Err(LenderError::Forbidden(message.to_string()))
        }
    }
}
