use chrono::{DateTime, Utc};
use matching_engine::{
    db_types::{Actor, ActorId, SolicitationKind, SolicitationStatus, SupplierStatus},
    solicitation_objects::{
        Pagination,
        SolicitationQuery,
        SolicitationQueryFilter,
        SortBy,
        SortDirection,
        DEFAULT_PAGE_SIZE,
    },
    CandidateQuery,
};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

/// Query string for `GET /api/solicitations`. `status` is a comma-separated list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolicitationSearchParams {
    pub kind: Option<SolicitationKind>,
    pub status: Option<String>,
    pub posted_by: Option<i64>,
    pub accepted_counterparty: Option<i64>,
    pub item_name: Option<String>,
    pub deadline_after: Option<DateTime<Utc>>,
    pub deadline_before: Option<DateTime<Utc>>,
    pub sort_by: Option<SortBy>,
    pub direction: Option<SortDirection>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl SolicitationSearchParams {
    pub fn into_query(self) -> Result<SolicitationQuery, ServerError> {
        let status = self
            .status
            .map(|s| {
                s.split(',')
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| v.parse::<SolicitationStatus>())
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()
            .map_err(|e| ServerError::InvalidInput(e.to_string()))?;
        let filter = SolicitationQueryFilter {
            kind: self.kind,
            status,
            posted_by: self.posted_by.map(ActorId::from),
            accepted_counterparty: self.accepted_counterparty.map(ActorId::from),
            item_name: self.item_name.filter(|s| !s.trim().is_empty()),
            deadline_after: self.deadline_after,
            deadline_before: self.deadline_before,
        };
        let pagination = match (self.page, self.page_size) {
            (None, None) => Pagination::default(),
            (page, size) => Pagination::page(page.unwrap_or(1), size.unwrap_or(DEFAULT_PAGE_SIZE)),
        };
        Ok(SolicitationQuery::new(filter)
            .ordered_by(self.sort_by.unwrap_or_default(), self.direction.unwrap_or_default())
            .paginate(pagination))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExtendDeadlineParams {
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingParams {
    pub rated: Actor,
    pub score: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CandidateParams {
    pub count: Option<usize>,
    pub capacity: Option<u32>,
    #[serde(default)]
    pub only_available: bool,
}

impl CandidateParams {
    pub const DEFAULT_COUNT: usize = 10;

    pub fn into_query(self) -> CandidateQuery {
        let mut query = CandidateQuery::new(self.count.unwrap_or(Self::DEFAULT_COUNT));
        if let Some(capacity) = self.capacity {
            query = query.with_capacity(capacity);
        }
        if self.only_available {
            query = query.only_available();
        }
        query
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OpenConversationParams {
    pub project_id: i64,
    pub producer_id: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSupplierParams {
    pub actor_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SupplierStatusParams {
    pub status: SupplierStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeaturedParams {
    pub featured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSummary {
    pub requests_expired: usize,
    pub projects_expired: usize,
    pub failed_passes: Vec<SolicitationKind>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn search_params_build_a_query() {
        let params = SolicitationSearchParams {
            kind: Some(SolicitationKind::Request),
            status: Some("pending, active".into()),
            posted_by: Some(5),
            item_name: Some("  ".into()),
            sort_by: Some(SortBy::Deadline),
            page: Some(3),
            page_size: Some(10),
            ..Default::default()
        };
        let query = params.into_query().unwrap();
        assert_eq!(query.filter.status, Some(vec![SolicitationStatus::Pending, SolicitationStatus::Active]));
        assert_eq!(query.filter.posted_by, Some(ActorId(5)));
        assert_eq!(query.filter.item_name, None);
        assert_eq!(query.ordering.sort_by, SortBy::Deadline);
        assert_eq!(query.ordering.direction, SortDirection::Desc);
        assert_eq!(query.pagination.offset(), 20);
        assert_eq!(query.pagination.limit(), 10);
    }

    #[test]
    fn unknown_statuses_are_rejected() {
        let params = SolicitationSearchParams { status: Some("pending,lost".into()), ..Default::default() };
        assert!(matches!(params.into_query(), Err(ServerError::InvalidInput(_))));
    }

    #[test]
    fn candidate_params_defaults() {
        let query = CandidateParams { count: None, capacity: None, only_available: false }.into_query();
        assert_eq!(query.count, CandidateParams::DEFAULT_COUNT);
        assert_eq!(query.capacity, None);
    }
}
