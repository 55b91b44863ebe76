//! Domain models for the customer identity subsystem.
//!
//! - [`customer`] - Customer records and the plaintext inputs that create them
//! - [`visit`] - Visit child records
//! - [`share`] - Share grants and the views exposed through a share link
//! - [`session`] - Per-browser share unlock cache

pub mod customer;
pub mod session;
pub mod share;
pub mod visit;

pub use customer::{Customer, CustomerUpdate, NewCustomer};
pub use session::{ShareSession, keys as session_keys};
pub use share::{CustomerShareView, ShareGrant, SharePasswordHash, ShareStatus, VisitView};
pub use visit::Visit;
