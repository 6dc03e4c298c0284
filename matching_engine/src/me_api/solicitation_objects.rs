use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{ActorId, SolicitationKind, SolicitationStatus},
    traits::MatchingEngineError,
};

pub const DEFAULT_PAGE_SIZE: i64 = 25;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolicitationQueryFilter {
    pub kind: Option<SolicitationKind>,
    pub status: Option<Vec<SolicitationStatus>>,
    pub posted_by: Option<ActorId>,
    pub accepted_counterparty: Option<ActorId>,
    /// Matches solicitations whose item name contains this text.
    pub item_name: Option<String>,
    pub deadline_after: Option<DateTime<Utc>>,
    pub deadline_before: Option<DateTime<Utc>>,
}

impl SolicitationQueryFilter {
    pub fn with_kind(mut self, kind: SolicitationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_status(mut self, status: SolicitationStatus) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_posted_by<A: Into<ActorId>>(mut self, actor: A) -> Self {
        self.posted_by = Some(actor.into());
        self
    }

    pub fn with_accepted_counterparty<A: Into<ActorId>>(mut self, actor: A) -> Self {
        self.accepted_counterparty = Some(actor.into());
        self
    }

    pub fn with_item_name<S: Into<String>>(mut self, item_name: S) -> Self {
        self.item_name = Some(item_name.into());
        self
    }

    pub fn deadline_after<T>(mut self, after: T) -> Result<Self, MatchingEngineError>
    where
        T: TryInto<DateTime<Utc>>,
        T::Error: Display,
    {
        let dt = after.try_into().map_err(|e| MatchingEngineError::InvalidInput(e.to_string()))?;
        self.deadline_after = Some(dt);
        Ok(self)
    }

    pub fn deadline_before<T>(mut self, before: T) -> Result<Self, MatchingEngineError>
    where
        T: TryInto<DateTime<Utc>>,
        T::Error: Display,
    {
        let dt = before.try_into().map_err(|e| MatchingEngineError::InvalidInput(e.to_string()))?;
        self.deadline_before = Some(dt);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none() &&
            self.status.is_none() &&
            self.posted_by.is_none() &&
            self.accepted_counterparty.is_none() &&
            self.item_name.is_none() &&
            self.deadline_after.is_none() &&
            self.deadline_before.is_none()
    }
}

impl Display for SolicitationQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "No filters.")?;
            return Ok(());
        }
        if let Some(kind) = &self.kind {
            write!(f, "kind: {kind}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        if let Some(actor) = &self.posted_by {
            write!(f, "posted by {actor}. ")?;
        }
        if let Some(actor) = &self.accepted_counterparty {
            write!(f, "accepted by {actor}. ")?;
        }
        if let Some(item) = &self.item_name {
            write!(f, "item: {item}. ")?;
        }
        if let Some(after) = &self.deadline_after {
            write!(f, "deadline after {after}. ")?;
        }
        if let Some(before) = &self.deadline_before {
            write!(f, "deadline before {before}. ")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    CreatedAt,
    Deadline,
    Price,
    MatchedCount,
}

impl SortBy {
    /// The column name. Only ever one of a fixed set, so it is safe to push into a query.
    pub fn column(&self) -> &'static str {
        match self {
            SortBy::CreatedAt => "created_at",
            SortBy::Deadline => "deadline",
            SortBy::Price => "price",
            SortBy::MatchedCount => "matched_count",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordering {
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Ordering {
    pub fn new(sort_by: SortBy, direction: SortDirection) -> Self {
        Self { sort_by, direction }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: Option<i64>,
    pub count: Option<i64>,
}

impl Pagination {
    pub fn new(offset: i64, count: i64) -> Self {
        Self { offset: Some(offset), count: Some(count) }
    }

    /// Builds a pagination window from a 1-based page number.
    pub fn page(page: i64, page_size: i64) -> Self {
        let size = page_size.clamp(1, MAX_PAGE_SIZE);
        let page = page.max(1);
        Self::new((page - 1) * size, size)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or_default().max(0)
    }

    pub fn limit(&self) -> i64 {
        self.count.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

/// Everything needed to run a solicitation listing query.
#[derive(Debug, Clone, Default)]
pub struct SolicitationQuery {
    pub filter: SolicitationQueryFilter,
    pub ordering: Ordering,
    pub pagination: Pagination,
}

impl SolicitationQuery {
    pub fn new(filter: SolicitationQueryFilter) -> Self {
        Self { filter, ..Default::default() }
    }

    pub fn ordered_by(mut self, sort_by: SortBy, direction: SortDirection) -> Self {
        self.ordering = Ordering::new(sort_by, direction);
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }
}
