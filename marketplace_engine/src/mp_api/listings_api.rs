use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Listing, ListingFilter, ListingId, ListingPage, NewListing},
    traits::ListingManagement,
    AppError,
    Context,
    UserId,
};

/// `ListingsApi` creates and searches marketplace listings.
pub struct ListingsApi<B> {
    db: B,
}

impl<B: Debug> Debug for ListingsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ListingsApi ({:?})", self.db)
    }
}

impl<B> ListingsApi<B>
where B: ListingManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn create_listing(
        &self,
        ctx: &Context,
        author_id: UserId,
        listing: NewListing,
    ) -> Result<Listing, AppError> {
        let listing = self.db.insert_listing(ctx, author_id, listing).await?;
        info!("📦️ [{}] User #{author_id} created listing #{}", ctx.request_id(), listing.id);
        Ok(listing)
    }

    /// Fetches one page of listings. A price range whose lower bound exceeds its upper bound is rejected rather than
    /// silently returning nothing.
    pub async fn fetch_listings(&self, ctx: &Context, filter: ListingFilter) -> Result<ListingPage, AppError> {
        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
            if min > max {
                return Err(AppError::validation(format!(
                    "The minimum price ({min}) cannot be greater than the maximum price ({max})"
                )));
            }
        }
        trace!("📦️ [{}] Fetching listings with {filter:?}", ctx.request_id());
        let (listings, total) = self.db.fetch_listings(ctx, &filter).await?;
        Ok(ListingPage { listings, total, page: filter.page, per_page: filter.per_page })
    }

    pub async fn listing_by_id(&self, ctx: &Context, id: ListingId) -> Result<Listing, AppError> {
        self.db.fetch_listing_by_id(ctx, id).await?.ok_or(AppError::ListingNotFound)
    }
}
