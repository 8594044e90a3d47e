pub mod bookings;
pub mod connections;
pub mod turfs;
pub mod user_tokens;
pub mod users;

pub use bookings::CreateBooking;
pub use connections::CreateConnection;
pub use turfs::{CreateTurf, TurfFilter, UpdateTurf};
pub use user_tokens::CreateUserToken;
pub use users::CreateUser;
