pub mod auth_service;
pub mod order_service;
pub mod status_service;
pub mod timeline_service;

pub use auth_service::{AuthService, TokenIssuer};
pub use order_service::{OrderService, UpdatedOrder};
pub use status_service::{normalize_status, StatusResolution};
pub use timeline_service::build_timeline;
