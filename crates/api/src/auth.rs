//! Authorization Hook
//!
//! The gateway accepts an `Authorization` header but does not enforce
//! it; the trait keeps the capability point open for a real policy
//! without shipping token logic.

use crate::error::ApiError;

/// Decides whether a request may use the gateway
pub trait AuthPolicy: Send + Sync {
    /// Authorize a request given its `Authorization` header, if any
    fn authorize(&self, authorization: Option<&str>) -> Result<(), ApiError>;
}

/// Accepts every request
pub struct AllowAll;

impl AuthPolicy for AllowAll {
    fn authorize(&self, _authorization: Option<&str>) -> Result<(), ApiError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all_accepts_any_header() {
        assert!(AllowAll.authorize(None).is_ok());
        assert!(AllowAll.authorize(Some("Bearer abc")).is_ok());
        assert!(AllowAll.authorize(Some("not-a-bearer")).is_ok());
    }
}
