use crate::{
    db_types::{Listing, ListingFilter, ListingId, NewListing},
    AppError,
    Context,
    UserId,
};

#[allow(async_fn_in_trait)]
pub trait ListingManagement {
    /// Stores a new listing for `author_id` and returns it with the author's username filled in. The insert and the
    /// author lookup happen in one transaction; if the author does not exist nothing is written.
    async fn insert_listing(&self, ctx: &Context, author_id: UserId, listing: NewListing) -> Result<Listing, AppError>;

    /// Returns one page of listings matching the filter, together with the total number of matches.
    async fn fetch_listings(&self, ctx: &Context, filter: &ListingFilter) -> Result<(Vec<Listing>, u32), AppError>;

    async fn fetch_listing_by_id(&self, ctx: &Context, id: ListingId) -> Result<Option<Listing>, AppError>;
}
