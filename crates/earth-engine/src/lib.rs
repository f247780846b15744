//! Minimal Google Earth Engine REST client.
//!
//! Computations are described as expression graphs and evaluated remotely
//! through the `value:compute` endpoint; nothing is processed locally.

pub mod client;
pub mod credentials;
pub mod error;
pub mod expression;
pub mod oauth;
pub mod query;
pub mod token;

pub use client::{EarthEngineSession, SessionConfig};
pub use credentials::StoredCredentials;
pub use error::{EarthEngineError, EeResult};
pub use expression::{Expression, ExpressionBuilder, ValueNode};
pub use query::WaterIndexQuery;
