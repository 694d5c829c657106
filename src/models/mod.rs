//! Data models for the bid-review-link client library.
//!
//! Domain records returned by the REST API, authentication payloads, realtime
//! wire frames and connection options.

pub mod bid;
pub mod connection_options;
pub mod customer;
pub mod dashboard;
pub mod list_response;
pub mod login_request;
pub mod login_response;
pub mod milestone;
pub mod register_request;
pub mod review;
pub mod review_completion;
pub mod server_message;
pub mod token_refresh;
pub mod user_info;
pub mod utils;


pub use bid::{Bid, BidStatus};
pub use connection_options::ConnectionOptions;
pub use customer::Customer;
pub use dashboard::{Dashboard, DashboardDistributions, DashboardInsights, DashboardOverview};
pub use list_response::ListResponse;
pub use login_request::LoginRequest;
pub use login_response::LoginResponse;
pub use milestone::Milestone;
pub use register_request::{RegisterRequest, RegisteredUser};
pub use review::Review;
pub use review_completion::{MessageResponse, ReviewCompletion};
pub use server_message::{DomainEvent, EntityRef, InboundFrame, StatusChange};
pub use token_refresh::{RefreshRequest, RefreshResponse};
pub use user_info::UserInfo;
