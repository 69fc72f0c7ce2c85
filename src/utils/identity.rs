use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::utils::error::AppError;

/// Header carrying the id of the already-authenticated caller.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity of the caller as asserted by the upstream authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

impl CallerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::AuthError("Missing caller identity".into()))?;

        let id = value
            .to_str()
            .map_err(|_| AppError::AuthError("Malformed caller identity".into()))?
            .trim();

        if id.is_empty() {
            return Err(AppError::AuthError("Missing caller identity".into()));
        }

        Ok(CallerId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<CallerId, AppError> {
        let (mut parts, _) = request.into_parts();
        CallerId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_reads_trimmed_header() {
        let request = Request::builder()
            .header(USER_ID_HEADER, " user-1 ")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap(), CallerId("user-1".into()));
    }

    #[tokio::test]
    async fn test_missing_header_is_auth_error() {
        let request = Request::builder().body(()).unwrap();
        assert!(matches!(extract(request).await, Err(AppError::AuthError(_))));
    }

    #[tokio::test]
    async fn test_blank_header_is_auth_error() {
        let request = Request::builder()
            .header(USER_ID_HEADER, "   ")
            .body(())
            .unwrap();
        assert!(matches!(extract(request).await, Err(AppError::AuthError(_))));
    }
}
