//! Per-entity accessors
//!
//! Each [`EntityPreset`] fixes the table, column projection, default ordering
//! and cache policy for one entity. [`Accessors`] forwards the caller's
//! [`AccessOptions`] on top of a preset to the [`QueryExecutor`].
//!
//! Fast-changing entities (messages, transactions) are not cached by default.

use crate::backend::SortDirection;
use crate::error::QueryError;
use crate::executor::{QueryExecutor, QueryOptions, QueryResult};
use crate::filter::{Condition, FilterDescriptor};
use crate::types::Row;
use serde::Serialize;
use std::sync::Arc;

/// Fixed query configuration for one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityPreset {
    pub table: &'static str,
    pub columns: &'static str,
    pub order_by: &'static str,
    pub direction: SortDirection,
    pub use_cache: bool,
}

impl EntityPreset {
    /// Merge caller options over the preset
    pub fn options(&self, access: AccessOptions) -> QueryOptions {
        QueryOptions {
            columns: self.columns.to_string(),
            filters: access.filters,
            order_by: access
                .order_by
                .unwrap_or_else(|| self.order_by.to_string()),
            direction: access.direction.unwrap_or(self.direction),
            limit: access.limit,
            offset: access.offset,
            use_cache: access.use_cache.unwrap_or(self.use_cache),
            want_count: access.want_count,
        }
    }
}

pub mod presets {
    //! Column sets and orderings for every entity the application reads

    use super::EntityPreset;
    use crate::backend::SortDirection::{Ascending, Descending};

    pub const USERS: EntityPreset = EntityPreset {
        table: "users",
        columns: "id, email, full_name, avatar_url, role, is_verified, balance, created_at",
        order_by: "created_at",
        direction: Descending,
        use_cache: true,
    };

    pub const BRIEFS: EntityPreset = EntityPreset {
        table: "briefs",
        columns: "id, title, description, category, budget, deadline, status, client_id, created_at",
        order_by: "created_at",
        direction: Descending,
        use_cache: true,
    };

    pub const CONVERSATIONS: EntityPreset = EntityPreset {
        table: "conversations",
        columns: "id, brief_id, client_id, provider_id, last_message_at, created_at",
        order_by: "last_message_at",
        direction: Descending,
        use_cache: true,
    };

    pub const MESSAGES: EntityPreset = EntityPreset {
        table: "messages",
        columns: "id, conversation_id, sender_id, content, read, created_at",
        order_by: "created_at",
        direction: Ascending,
        use_cache: false,
    };

    pub const CONTRACTS: EntityPreset = EntityPreset {
        table: "contracts",
        columns: "id, brief_id, client_id, provider_id, amount, status, created_at",
        order_by: "created_at",
        direction: Descending,
        use_cache: true,
    };

    pub const SUPPORT_TICKETS: EntityPreset = EntityPreset {
        table: "support_tickets",
        columns: "id, user_id, subject, message, status, priority, created_at",
        order_by: "created_at",
        direction: Descending,
        use_cache: true,
    };

    pub const NEWSLETTER_SUBSCRIBERS: EntityPreset = EntityPreset {
        table: "newsletter_subscribers",
        columns: "id, email, subscribed, created_at",
        order_by: "created_at",
        direction: Descending,
        use_cache: true,
    };

    pub const BLOG_POSTS: EntityPreset = EntityPreset {
        table: "blog_posts",
        columns: "id, title, slug, excerpt, cover_image, author_id, published, published_at, created_at",
        order_by: "published_at",
        direction: Descending,
        use_cache: true,
    };

    pub const CATEGORIES: EntityPreset = EntityPreset {
        table: "categories",
        columns: "id, name, slug, description",
        order_by: "name",
        direction: Ascending,
        use_cache: true,
    };

    pub const REVIEWS: EntityPreset = EntityPreset {
        table: "reviews",
        columns: "id, contract_id, reviewer_id, reviewee_id, rating, comment, created_at",
        order_by: "created_at",
        direction: Descending,
        use_cache: true,
    };

    pub const TRANSACTIONS: EntityPreset = EntityPreset {
        table: "transactions",
        columns: "id, user_id, amount, type, status, external_id, created_at",
        order_by: "created_at",
        direction: Descending,
        use_cache: false,
    };
}

/// Caller-controlled part of an accessor query
///
/// `None` fields keep the preset's value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessOptions {
    pub filters: FilterDescriptor,
    pub limit: Option<usize>,
    pub offset: usize,
    pub order_by: Option<String>,
    pub direction: Option<SortDirection>,
    pub use_cache: Option<bool>,
    pub want_count: bool,
}

impl AccessOptions {
    pub fn filtered(filters: FilterDescriptor) -> Self {
        Self {
            filters,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = Some(use_cache);
        self
    }

    #[must_use]
    pub fn want_count(mut self) -> Self {
        self.want_count = true;
        self
    }
}

/// Headline counts for dashboards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlatformStats {
    pub total_users: u64,
    pub total_briefs: u64,
    pub open_briefs: u64,
    pub total_contracts: u64,
    pub completed_contracts: u64,
}

/// Entity-level read API over a shared executor
#[derive(Clone)]
pub struct Accessors {
    executor: Arc<QueryExecutor>,
}

impl Accessors {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<QueryExecutor> {
        &self.executor
    }

    /// Run any preset with caller options
    pub async fn query(&self, preset: &EntityPreset, access: AccessOptions) -> QueryResult {
        self.executor
            .fetch(preset.table, preset.options(access))
            .await
    }

    pub async fn users(&self, access: AccessOptions) -> QueryResult {
        self.query(&presets::USERS, access).await
    }

    pub async fn briefs(&self, access: AccessOptions) -> QueryResult {
        self.query(&presets::BRIEFS, access).await
    }

    /// Conversations where `user_id` is either participant
    pub async fn conversations_for(&self, user_id: &str, mut access: AccessOptions) -> QueryResult {
        access.filters = access.filters.any_of(vec![
            Condition::eq("client_id", user_id),
            Condition::eq("provider_id", user_id),
        ]);
        self.query(&presets::CONVERSATIONS, access).await
    }

    /// Messages of one conversation, oldest first
    pub async fn messages(&self, conversation_id: &str, mut access: AccessOptions) -> QueryResult {
        access.filters = access.filters.eq("conversation_id", conversation_id);
        self.query(&presets::MESSAGES, access).await
    }

    pub async fn contracts(&self, access: AccessOptions) -> QueryResult {
        self.query(&presets::CONTRACTS, access).await
    }

    pub async fn support_tickets(&self, access: AccessOptions) -> QueryResult {
        self.query(&presets::SUPPORT_TICKETS, access).await
    }

    pub async fn newsletter_subscribers(&self, access: AccessOptions) -> QueryResult {
        self.query(&presets::NEWSLETTER_SUBSCRIBERS, access).await
    }

    /// Published posts only
    pub async fn blog_posts(&self, mut access: AccessOptions) -> QueryResult {
        access.filters = access.filters.eq("published", true);
        self.query(&presets::BLOG_POSTS, access).await
    }

    pub async fn categories(&self, access: AccessOptions) -> QueryResult {
        self.query(&presets::CATEGORIES, access).await
    }

    pub async fn reviews(&self, access: AccessOptions) -> QueryResult {
        self.query(&presets::REVIEWS, access).await
    }

    /// A user's transactions, newest first
    pub async fn transactions(&self, user_id: &str, mut access: AccessOptions) -> QueryResult {
        access.filters = access.filters.eq("user_id", user_id);
        self.query(&presets::TRANSACTIONS, access).await
    }

    pub async fn user_by_id(&self, id: &str) -> Result<Option<Row>, QueryError> {
        self.first(&presets::USERS, id).await
    }

    pub async fn brief_by_id(&self, id: &str) -> Result<Option<Row>, QueryError> {
        self.first(&presets::BRIEFS, id).await
    }

    async fn first(&self, preset: &EntityPreset, id: &str) -> Result<Option<Row>, QueryError> {
        let payload = self
            .query(
                preset,
                AccessOptions::filtered(FilterDescriptor::new().eq("id", id)).limit(1),
            )
            .await
            .into_result()?;
        Ok(payload.rows.first().cloned())
    }

    /// Exact counts for the dashboard header
    pub async fn stats(&self) -> Result<PlatformStats, QueryError> {
        let (users, briefs, open_briefs, contracts, completed) = futures::join!(
            self.count(&presets::USERS, FilterDescriptor::new()),
            self.count(&presets::BRIEFS, FilterDescriptor::new()),
            self.count(&presets::BRIEFS, FilterDescriptor::new().eq("status", "open")),
            self.count(&presets::CONTRACTS, FilterDescriptor::new()),
            self.count(
                &presets::CONTRACTS,
                FilterDescriptor::new().eq("status", "completed")
            ),
        );

        Ok(PlatformStats {
            total_users: users?,
            total_briefs: briefs?,
            open_briefs: open_briefs?,
            total_contracts: contracts?,
            completed_contracts: completed?,
        })
    }

    async fn count(&self, preset: &EntityPreset, filters: FilterDescriptor) -> Result<u64, QueryError> {
        let options = QueryOptions {
            columns: "id".to_string(),
            ..preset.options(AccessOptions::filtered(filters).limit(1).want_count())
        };
        let payload = self
            .executor
            .fetch(preset.table, options)
            .await
            .into_result()?;
        Ok(payload.count.unwrap_or(payload.rows.len() as u64))
    }
}
