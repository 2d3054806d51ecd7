use crate::error::Result;
use crate::models::conversation::Conversation;
use crate::models::paging::{Page, PageQuery};
use crate::permission::Resource;
use crate::principal::{DataScope, Principal};

use super::LenderService;

pub const INTERACTION_SORTABLE: &[&str] = &["uid", "conversation_date", "next_interaction"];

const DEFAULT_COUNT_LIMIT: i64 = 1000;

impl LenderService {
    /// Logged customer interactions, newest first, searchable by customer name.
    pub async fn list_interactions(
        &self,
        actor: &Principal,
        scope: DataScope,
        page: &PageQuery,
    ) -> Result<Page<Conversation>> {
        let mut paging = page.resolve(INTERACTION_SORTABLE)?;
        if paging.count_limit == 0 {
            paging.count_limit = DEFAULT_COUNT_LIMIT;
        }
        let branches = self
            .visible_scope(actor, Resource::CustomerConversations)
            .await?;
        self.read_stores(scope)
            .conversations
            .list(&branches, &paging)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    #[tokio::test]
    async fn scoped_to_visible_branches() {
        let (store, service) = setup();
        let near = store.add_customer(customer(0, "254700000001", 2));
        let far = store.add_customer(customer(0, "254700000002", 8));
        store.add_conversation(near, "Promised to pay Friday", None);
        store.add_conversation(far, "Phone off", None);

        let page = service
            .list_interactions(&officer(), DataScope::Current, &PageQuery::default())
            .await
            .unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.rows[0].transcript, "Promised to pay Friday");

        store.add_grant(grant("o_customer_conversations", |g| g.read = true));
        let page = service
            .list_interactions(&officer(), DataScope::Current, &PageQuery::default())
            .await
            .unwrap();
        assert_eq!(page.count, 2);
    }

    #[tokio::test]
    async fn search_matches_customer_name() {
        let (store, service) = setup();
        let mut c = customer(0, "254700000001", 2);
        c.full_name = "Wanjiku Mwangi".into();
        let uid = store.add_customer(c);
        store.add_conversation(uid, "Visited", None);
        let other = store.add_customer(customer(0, "254700000002", 2));
        store.add_conversation(other, "Visited", None);

        let q = PageQuery {
            search_term: Some("wanjiku".into()),
            ..Default::default()
        };
        let page = service
            .list_interactions(&admin(), DataScope::Current, &q)
            .await
            .unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.rows[0].full_name, "Wanjiku Mwangi");
    }

    #[tokio::test]
    async fn unknown_order_column_is_rejected() {
        let (_store, service) = setup();
        let q = PageQuery {
            order_by: Some("transcript".into()),
            ..Default::default()
        };
        let err = service
            .list_interactions(&admin(), DataScope::Current, &q)
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
    }
}
