use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{ActorId, NewSolicitation, Solicitation, SolicitationId, SolicitationKind, SolicitationStatus},
    solicitation_objects::SolicitationQuery,
};

/// Inserts a new solicitation with status `pending`. This is not atomic on its own. Embed the call inside a
/// transaction if it needs to be, and pass `&mut tx` as the connection argument.
pub async fn insert_solicitation(
    poster: ActorId,
    solicitation: NewSolicitation,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Solicitation, sqlx::Error> {
    let solicitation: Solicitation = sqlx::query_as(
        r#"
            INSERT INTO solicitations (
                kind,
                posted_by,
                item_name,
                quantity,
                unit,
                destination,
                target_location,
                price,
                currency,
                payment_terms,
                delivery_time,
                description,
                deadline,
                status,
                matched_count,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'pending', 0, $14, $14)
            RETURNING *;
        "#,
    )
    .bind(solicitation.kind)
    .bind(poster)
    .bind(solicitation.item_name)
    .bind(solicitation.quantity)
    .bind(solicitation.unit)
    .bind(solicitation.destination)
    .bind(solicitation.target_location)
    .bind(solicitation.price)
    .bind(solicitation.currency)
    .bind(solicitation.payment_terms)
    .bind(solicitation.delivery_time)
    .bind(solicitation.description)
    .bind(solicitation.deadline)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ {} {} inserted for {poster}", solicitation.kind, solicitation.id);
    Ok(solicitation)
}

/// Fetches the solicitation with the given id, unless it has been soft-deleted.
pub async fn fetch_solicitation(
    id: SolicitationId,
    conn: &mut SqliteConnection,
) -> Result<Option<Solicitation>, sqlx::Error> {
    let solicitation = sqlx::query_as("SELECT * FROM solicitations WHERE id = $1 AND deleted_at IS NULL")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(solicitation)
}

/// Fetches solicitations according to the filter, ordering and pagination in the query. Soft-deleted rows are
/// never returned.
pub async fn search_solicitations(
    query: SolicitationQuery,
    conn: &mut SqliteConnection,
) -> Result<Vec<Solicitation>, sqlx::Error> {
    let SolicitationQuery { filter, ordering, pagination } = query;
    let mut builder = QueryBuilder::new("SELECT * FROM solicitations WHERE deleted_at IS NULL");
    if let Some(kind) = filter.kind {
        builder.push(" AND kind = ").push_bind(kind);
    }
    if let Some(statuses) = filter.status {
        push_status_filter(&mut builder, &statuses);
    }
    if let Some(poster) = filter.posted_by {
        builder.push(" AND posted_by = ").push_bind(poster);
    }
    if let Some(counterparty) = filter.accepted_counterparty {
        builder.push(" AND accepted_counterparty = ").push_bind(counterparty);
    }
    if let Some(item) = filter.item_name {
        builder.push(" AND item_name LIKE ").push_bind(format!("%{item}%"));
    }
    if let Some(after) = filter.deadline_after {
        builder.push(" AND deadline >= ").push_bind(after);
    }
    if let Some(before) = filter.deadline_before {
        builder.push(" AND deadline <= ").push_bind(before);
    }
    let direction = ordering.direction.keyword();
    builder.push(format!(" ORDER BY {} {direction}, id {direction}", ordering.sort_by.column()));
    builder.push(" LIMIT ").push_bind(pagination.limit());
    builder.push(" OFFSET ").push_bind(pagination.offset());
    trace!("🗃️ Executing query: {}", builder.sql());
    let solicitations = builder.build_query_as::<Solicitation>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_solicitations: {} rows", solicitations.len());
    Ok(solicitations)
}

/// The one-way acceptance latch. Sets the counterparty if, and only if, the solicitation is still open and nobody has
/// been accepted yet. Returns `None` when the latch had already been taken (or the solicitation has moved on).
///
/// `count_match` adds the winning response to the matched count. Leave it off when the response was already counted
/// on submission.
pub async fn latch_acceptance(
    id: SolicitationId,
    counterparty: ActorId,
    count_match: bool,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Solicitation>, sqlx::Error> {
    let solicitation: Option<Solicitation> = sqlx::query_as(
        r#"
            UPDATE solicitations SET
                status = 'accepted',
                accepted_counterparty = $1,
                accepted_at = $2,
                matched_count = matched_count + $3,
                updated_at = $2
            WHERE id = $4
                AND status IN ('pending', 'active')
                AND accepted_counterparty IS NULL
                AND deleted_at IS NULL
            RETURNING *;
        "#,
    )
    .bind(counterparty)
    .bind(now)
    .bind(i64::from(count_match))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    match &solicitation {
        Some(_) => debug!("🗃️ Solicitation {id} accepted by {counterparty}"),
        None => trace!("🗃️ Acceptance latch for {id} was not taken by {counterparty}"),
    }
    Ok(solicitation)
}

/// Atomically increments the matched count of an open solicitation.
pub async fn increment_matched_count(
    id: SolicitationId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Solicitation>, sqlx::Error> {
    let solicitation = sqlx::query_as(
        r#"
            UPDATE solicitations SET matched_count = matched_count + 1, updated_at = $1
            WHERE id = $2 AND status IN ('pending', 'active') AND deleted_at IS NULL
            RETURNING *;
        "#,
    )
    .bind(now)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(solicitation)
}

/// Sets the status to `to` if the current status is one of `from`. When `owner` is given, the solicitation must also
/// have been posted by them.
pub async fn update_status(
    id: SolicitationId,
    owner: Option<ActorId>,
    from: &[SolicitationStatus],
    to: SolicitationStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Solicitation>, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE solicitations SET status = ");
    builder.push_bind(to);
    builder.push(", updated_at = ").push_bind(now);
    builder.push(" WHERE id = ").push_bind(id);
    builder.push(" AND deleted_at IS NULL");
    if let Some(owner) = owner {
        builder.push(" AND posted_by = ").push_bind(owner);
    }
    push_status_filter(&mut builder, from);
    builder.push(" RETURNING *");
    let solicitation = builder.build_query_as::<Solicitation>().fetch_optional(conn).await?;
    if let Some(s) = &solicitation {
        debug!("🗃️ Solicitation {id} is now {}", s.status);
    }
    Ok(solicitation)
}

pub async fn update_deadline(
    id: SolicitationId,
    owner: ActorId,
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Solicitation>, sqlx::Error> {
    let solicitation = sqlx::query_as(
        r#"
            UPDATE solicitations SET deadline = $1, updated_at = $2
            WHERE id = $3 AND posted_by = $4 AND deleted_at IS NULL
            RETURNING *;
        "#,
    )
    .bind(deadline)
    .bind(now)
    .bind(id)
    .bind(owner)
    .fetch_optional(conn)
    .await?;
    Ok(solicitation)
}

pub async fn soft_delete(
    id: SolicitationId,
    owner: ActorId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Solicitation>, sqlx::Error> {
    let solicitation = sqlx::query_as(
        r#"
            UPDATE solicitations SET deleted_at = $1, updated_at = $1
            WHERE id = $2 AND posted_by = $3 AND deleted_at IS NULL
            RETURNING *;
        "#,
    )
    .bind(now)
    .bind(id)
    .bind(owner)
    .fetch_optional(conn)
    .await?;
    Ok(solicitation)
}

/// Bulk-expires open solicitations of the given kind whose deadline has passed. Requests with an accepted
/// counterparty are left alone.
pub async fn expire_solicitations(
    kind: SolicitationKind,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Solicitation>, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE solicitations SET status = 'expired', updated_at = ");
    builder.push_bind(now);
    builder.push(" WHERE kind = ").push_bind(kind);
    builder.push(" AND status IN ('pending', 'active') AND deleted_at IS NULL AND deadline <= ").push_bind(now);
    if kind == SolicitationKind::Request {
        builder.push(" AND accepted_counterparty IS NULL");
    }
    builder.push(" RETURNING *");
    let expired = builder.build_query_as::<Solicitation>().fetch_all(conn).await?;
    trace!("🗃️ {} {kind}s expired", expired.len());
    Ok(expired)
}

fn push_status_filter(builder: &mut QueryBuilder<'_, Sqlite>, statuses: &[SolicitationStatus]) {
    builder.push(" AND status IN (");
    let mut list = builder.separated(", ");
    for status in statuses {
        list.push_bind(*status);
    }
    builder.push(")");
}
