pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use router::notification_routes;
pub use services::fanout::NotificationFanout;
