pub mod articles;
pub mod auth;
pub mod comments;
pub mod events;
pub mod places;
pub mod reservations;

pub use articles::articles_routes;
pub use auth::auth_routes;
pub use comments::comments_routes;
pub use events::events_routes;
pub use places::places_routes;
pub use reservations::reservations_routes;
