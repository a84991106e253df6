//! Database gateway: connection scope, execution, error classification.

mod gateway;
pub use gateway::{Gateway, GatewayConnection};
