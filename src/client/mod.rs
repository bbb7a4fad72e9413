//! Node client and block subscriptions.

pub mod node;
pub mod subscription;

pub use node::NodeClient;
pub use subscription::{BlockSubscription, SubscriptionMode};
