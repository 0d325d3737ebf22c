pub mod listing;
pub mod order;
pub mod user;

pub use listing::{Listing, ModerationDecision, ModerationStatus};
pub use order::{Order, OrderStatus, PaymentMethod};
pub use user::{Role, User};
