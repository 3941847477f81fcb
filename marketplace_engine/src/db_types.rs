use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::UserId;

pub type ListingId = u64;

//--------------------------------------        Users        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct User {
    #[sqlx(try_from = "i64")]
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// The public view of a user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self { id: user.id, username: user.username, created_at: user.created_at }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}

//--------------------------------------       Listings      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Listing {
    #[sqlx(try_from = "i64")]
    pub id: ListingId,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub price: f64,
    #[sqlx(try_from = "i64")]
    pub author_id: UserId,
    pub author_username: String,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Whether `caller` wrote this listing. Anonymous callers own nothing.
    pub fn is_owned_by(&self, caller: Option<UserId>) -> bool {
        caller == Some(self.author_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    Price,
}

impl SortField {
    /// Parse a client-supplied sort field. Anything unrecognised sorts by creation time.
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s.map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "price" => Self::Price,
            _ => Self::CreatedAt,
        }
    }

    pub(crate) fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "l.created_at",
            Self::Price => "l.price",
        }
    }
}

impl Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreatedAt => write!(f, "created_at"),
            Self::Price => write!(f, "price"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingFilter {
    pub page: u32,
    pub per_page: u32,
    pub sort_by: SortField,
    pub descending: bool,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self { page: 1, per_page: 20, sort_by: SortField::CreatedAt, descending: true, min_price: None, max_price: None }
    }
}

impl ListingFilter {
    pub fn with_page(mut self, page: u32, per_page: u32) -> Self {
        self.page = page;
        self.per_page = per_page;
        self
    }

    pub fn with_sort(mut self, sort_by: SortField, descending: bool) -> Self {
        self.sort_by = sort_by;
        self.descending = descending;
        self
    }

    pub fn with_price_range(mut self, min_price: Option<f64>, max_price: Option<f64>) -> Self {
        self.min_price = min_price;
        self.max_price = max_price;
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage {
    pub listings: Vec<Listing>,
    pub total: u32,
    pub page: u32,
    pub per_page: u32,
}

impl ListingPage {
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(self.per_page)
    }
}
