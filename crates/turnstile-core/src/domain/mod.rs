//! Domain model (client, subscription, visit, ids, errors).

pub mod client;
pub mod errors;
pub mod ids;
pub mod subscription;

pub use self::client::{Client, Visit};
pub use self::errors::EntryCheckError;
pub use self::ids::ClientId;
pub use self::subscription::{Subscription, SubscriptionKind, UnknownSubscriptionKind};
