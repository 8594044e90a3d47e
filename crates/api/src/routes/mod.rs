pub mod auth;
pub mod bookings;
pub mod connections;
pub mod payments;
pub mod turfs;
