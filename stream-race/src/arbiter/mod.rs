//! Subscription arbitration: one stable downstream view over swappable upstreams.

mod subscription_arbiter;

pub use subscription_arbiter::SubscriptionArbiter;
