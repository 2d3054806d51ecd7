//! Branch visibility for list and read queries.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::Result;
use crate::ports::StaffBranchStore;
use crate::principal::Principal;

/// Rows a principal may see. Stores apply this inside the query so that
/// counts and pages never include rows outside the scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchScope {
    /// Global read grant: no branch predicate at all.
    Unrestricted,
    /// Only rows whose branch is in this set. May be empty, which matches nothing.
    Branches(BTreeSet<i32>),
}

impl BranchScope {
    pub fn permits(&self, branch: i32) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Branches(set) => set.contains(&branch),
        }
    }

    /// Branch ids for an `IN` / `= ANY` predicate, `None` when unrestricted.
    pub fn ids(&self) -> Option<Vec<i32>> {
        match self {
            Self::Unrestricted => None,
            Self::Branches(set) => Some(set.iter().copied().collect()),
        }
    }
}

#[derive(Clone)]
pub struct BranchFilter {
    staff_branches: Arc<dyn StaffBranchStore>,
}

impl BranchFilter {
    pub fn new(staff_branches: Arc<dyn StaffBranchStore>) -> Self {
        Self { staff_branches }
    }

    /// Active staff assignments plus the principal's own branch.
    pub async fn visible_branches(
        &self,
        principal: &Principal,
        has_global_read: bool,
    ) -> Result<BranchScope> {
        if has_global_read {
            return Ok(BranchScope::Unrestricted);
        }
        let mut set: BTreeSet<i32> = self
            .staff_branches
            .active_branches(principal.uid)
            .await?
            .into_iter()
            .collect();
        if principal.branch > 0 {
            set.insert(principal.branch);
        }
        tracing::debug!(principal_id = principal.uid, branches = ?set, "branch scope");
        Ok(BranchScope::Branches(set))
    }
}
