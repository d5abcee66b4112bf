//! Error type for the admin surface's own operations, layered on top of the
//! `gateway_core::GatewayError` the core returns.

use thiserror::Error;

use crate::module::database::DatabaseError;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

pub type AdminResult<T> = Result<T, AdminError>;
