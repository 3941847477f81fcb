use log::*;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::errors::{db_id, SqliteDatabaseError};
use crate::{
    db_types::{Listing, ListingFilter, ListingId, NewListing},
    UserId,
};

const LISTING_COLUMNS: &str =
    "l.id, l.title, l.description, l.image_url, l.price, l.author_id, u.username AS author_username, l.created_at";

/// Inserts the listing row and returns its id. The author must exist.
pub async fn insert_listing(
    author_id: UserId,
    listing: NewListing,
    conn: &mut SqliteConnection,
) -> Result<ListingId, SqliteDatabaseError> {
    let result = sqlx::query_scalar::<_, i64>(
        r#"INSERT INTO listings (title, description, image_url, price, author_id)
        VALUES ($1, $2, $3, $4, $5) RETURNING id"#,
    )
    .bind(listing.title)
    .bind(listing.description)
    .bind(listing.image_url)
    .bind(listing.price)
    .bind(db_id(author_id)?)
    .fetch_one(conn)
    .await;
    let id = match result {
        Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
            return Err(SqliteDatabaseError::AuthorNotFound(author_id));
        },
        Err(e) => return Err(e.into()),
        Ok(id) => id,
    };
    trace!("📦️ Listing #{id} inserted for author #{author_id}");
    ListingId::try_from(id).map_err(|e| SqliteDatabaseError::QueryError(e.to_string()))
}

pub async fn listing_by_id(id: ListingId, conn: &mut SqliteConnection) -> Result<Option<Listing>, SqliteDatabaseError> {
    let sql = format!("SELECT {LISTING_COLUMNS} FROM listings l JOIN users u ON l.author_id = u.id WHERE l.id = $1");
    let listing = sqlx::query_as(&sql).bind(db_id(id)?).fetch_optional(conn).await?;
    Ok(listing)
}

fn push_price_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ListingFilter) {
    if let Some(min) = filter.min_price {
        builder.push(" AND l.price >= ");
        builder.push_bind(min);
    }
    if let Some(max) = filter.max_price {
        builder.push(" AND l.price <= ");
        builder.push_bind(max);
    }
}

pub async fn count_listings(filter: &ListingFilter, conn: &mut SqliteConnection) -> Result<u32, SqliteDatabaseError> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM listings l JOIN users u ON l.author_id = u.id WHERE 1=1");
    push_price_filter(&mut builder, filter);
    let count = builder.build_query_scalar::<i64>().fetch_one(conn).await?;
    u32::try_from(count).map_err(|e| SqliteDatabaseError::QueryError(e.to_string()))
}

/// Fetches one page of listings matching `filter`. Rows with equal sort keys are ordered by id in the same direction
/// so that paging is stable.
pub async fn fetch_listings(
    filter: &ListingFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Listing>, SqliteDatabaseError> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {LISTING_COLUMNS} FROM listings l JOIN users u ON l.author_id = u.id WHERE 1=1"
    ));
    push_price_filter(&mut builder, filter);
    let direction = if filter.descending { "DESC" } else { "ASC" };
    builder.push(format!(" ORDER BY {} {direction}, l.id {direction}", filter.sort_by.column()));
    builder.push(" LIMIT ");
    builder.push_bind(i64::from(filter.per_page));
    builder.push(" OFFSET ");
    builder.push_bind(i64::try_from(filter.offset()).map_err(|e| SqliteDatabaseError::QueryError(e.to_string()))?);
    trace!("📦️ Executing query: {}", builder.sql());
    let listings = builder.build_query_as::<Listing>().fetch_all(conn).await?;
    Ok(listings)
}
