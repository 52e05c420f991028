//! Hosted store access for DealDesk.
//!
//! [`RestGateway`] implements the sync crate's `RemoteGateway` over the
//! store's REST API. Transport failures and timeouts surface as
//! `GatewayError::Unreachable`; refusals by the store surface as
//! `GatewayError::Rejected`.

pub mod config;
pub mod error;
pub mod rest;

pub use config::CloudConfig;
pub use error::{CloudError, CloudResult};
pub use rest::RestGateway;
