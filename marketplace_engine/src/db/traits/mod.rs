//! # Data access contracts
//!
//! The business APIs in [`crate::mp_api`] are generic over these traits, so that storage backends can be swapped out
//! and the APIs can be tested against mocks.
//!
//! * [`UserManagement`] covers creating and looking up user accounts.
//! * [`ListingManagement`] covers creating and querying marketplace listings.
//!
//! Every method takes the call [`Context`](crate::Context). Implementations must perform their storage access on the
//! transaction carried by the context when there is one, so that a caller can group several calls into one unit of
//! work.
mod listing_management;
mod user_management;

pub use listing_management::ListingManagement;
pub use user_management::UserManagement;
