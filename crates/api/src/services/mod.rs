pub mod catalog;
pub mod connections;
pub mod email_service;
pub mod payment_service;
pub mod reservations;
pub mod retry;
pub mod token_cleanup;

pub use catalog::Catalog;
pub use connections::ConnectionCoordinator;
pub use email_service::{spawn_email, EmailConfig, EmailService};
pub use payment_service::{PaymentConfig, PaymentService};
pub use reservations::ReservationCoordinator;
pub use token_cleanup::spawn_token_cleanup;
