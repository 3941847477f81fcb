use chrono::{DateTime, Utc};
use marketplace_engine::{
    db_types::{Listing, ListingFilter, ListingId, ListingPage, NewListing, SortField, UserView},
    AppError,
    UserId,
};
use serde::{Deserialize, Serialize};

use crate::validation::{check_length, check_not_blank, RpcRequest, Validate};

pub const MAX_LISTING_PRICE: f64 = 100_000_000.0;
pub const MAX_PER_PAGE: u32 = 100;
const DEFAULT_PER_PAGE: u32 = 20;

//--------------------------------------        Auth         ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        check_length("username", &self.username, 3, 32)?;
        if !self.username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(AppError::validation("username may only contain letters, digits and underscores"));
        }
        check_length("password", &self.password, 6, 72)
    }
}

impl RpcRequest for RegisterRequest {
    fn as_validatable(&self) -> Option<&dyn Validate> {
        Some(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), AppError> {
        check_not_blank("username", &self.username)?;
        check_not_blank("password", &self.password)
    }
}

impl RpcRequest for LoginRequest {
    fn as_validatable(&self) -> Option<&dyn Validate> {
        Some(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user: UserView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserView,
}

//--------------------------------------      Listings       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateListingRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub image_url: String,
    pub price: f64,
}

impl Validate for CreateListingRequest {
    fn validate(&self) -> Result<(), AppError> {
        check_length("title", self.title.trim(), 3, 100)?;
        check_length("description", &self.description, 0, 1000)?;
        if !(self.image_url.starts_with("http://") || self.image_url.starts_with("https://")) {
            return Err(AppError::validation("image_url must be an http:// or https:// URL"));
        }
        if !self.price.is_finite() || self.price <= 0.0 || self.price > MAX_LISTING_PRICE {
            return Err(AppError::validation(format!("price must be greater than 0 and at most {MAX_LISTING_PRICE}")));
        }
        Ok(())
    }
}

impl RpcRequest for CreateListingRequest {
    fn as_validatable(&self) -> Option<&dyn Validate> {
        Some(self)
    }
}

impl From<CreateListingRequest> for NewListing {
    fn from(req: CreateListingRequest) -> Self {
        Self { title: req.title.trim().to_string(), description: req.description, image_url: req.image_url, price: req.price }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetListingsRequest {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// `created_at` or `price`. Anything else sorts by creation time.
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl Default for GetListingsRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
            sort_by: None,
            sort_order: SortOrder::default(),
            min_price: None,
            max_price: None,
        }
    }
}

impl Validate for GetListingsRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.page < 1 {
            return Err(AppError::validation("page must be at least 1"));
        }
        if self.per_page < 1 || self.per_page > MAX_PER_PAGE {
            return Err(AppError::validation(format!("per_page must be between 1 and {MAX_PER_PAGE}")));
        }
        for (name, price) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            if matches!(price, Some(p) if !p.is_finite() || p < 0.0) {
                return Err(AppError::validation(format!("{name} must be a non-negative number")));
            }
        }
        Ok(())
    }
}

impl RpcRequest for GetListingsRequest {
    fn as_validatable(&self) -> Option<&dyn Validate> {
        Some(self)
    }
}

impl From<GetListingsRequest> for ListingFilter {
    fn from(req: GetListingsRequest) -> Self {
        ListingFilter::default()
            .with_page(req.page, req.per_page)
            .with_sort(SortField::parse_or_default(req.sort_by.as_deref()), req.sort_order == SortOrder::Desc)
            .with_price_range(req.min_price, req.max_price)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetListingRequest {
    pub id: ListingId,
}

impl RpcRequest for GetListingRequest {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingResponse {
    pub id: ListingId,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub price: f64,
    pub author_username: String,
    pub created_at: DateTime<Utc>,
    pub is_owner: bool,
}

impl ListingResponse {
    pub fn for_caller(listing: Listing, caller: Option<UserId>) -> Self {
        let is_owner = listing.is_owned_by(caller);
        Self {
            id: listing.id,
            title: listing.title,
            description: listing.description,
            image_url: listing.image_url,
            price: listing.price,
            author_username: listing.author_username,
            created_at: listing.created_at,
            is_owner,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingsResponse {
    pub listings: Vec<ListingResponse>,
    pub total: u32,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl ListingsResponse {
    pub fn for_caller(page: ListingPage, caller: Option<UserId>) -> Self {
        let total_pages = page.total_pages();
        Self {
            listings: page.listings.into_iter().map(|l| ListingResponse::for_caller(l, caller)).collect(),
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            total_pages,
        }
    }
}

//--------------------------------------       Health        ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthCheckRequest {
    #[serde(default)]
    pub service: String,
}

impl RpcRequest for HealthCheckRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
}
