mod email;
mod health;
mod payment;
mod reset;

pub use email::email_routes;
pub use health::health_routes;
pub use payment::payment_routes;
pub use reset::reset_routes;
