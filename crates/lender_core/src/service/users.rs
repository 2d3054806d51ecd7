use crate::error::{LenderError, Result};
use crate::models::paging::{Page, PageQuery};
use crate::models::user::{AuthenticatedUser, StaffUser, UserFilter};
use crate::principal::{DataScope, Principal};

use super::LenderService;

pub const USER_SORTABLE: &[&str] = &["uid", "name", "email"];

impl LenderService {
    pub async fn list_users(
        &self,
        scope: DataScope,
        filter: &UserFilter,
        page: &PageQuery,
    ) -> Result<Page<StaffUser>> {
        let paging = page.resolve(USER_SORTABLE)?;
        self.read_stores(scope).users.list(filter, &paging).await
    }

    pub async fn get_user(&self, scope: DataScope, uid: i32) -> Result<StaffUser> {
        self.read_stores(scope)
            .users
            .get(uid)
            .await?
            .ok_or_else(|| LenderError::NotFound("User not found".into()))
    }

    /// The caller as seen by the server, with its group name resolved.
    pub async fn authenticated_user(&self, actor: &Principal) -> Result<AuthenticatedUser> {
        let group = self.current.users.group_name(actor.user_group).await?;
        Ok(AuthenticatedUser::new(actor, group))
    }
}
