//! HTTP client for the user service.

use std::time::Duration;

use async_trait::async_trait;
use common::UserId;
use domain::{DirectoryError, UserDirectory};
use reqwest::{Client, StatusCode};

/// User directory backed by the user service's `GET /user/{id}` endpoint.
///
/// A 2xx answer means the user exists and a 4xx answer means it does not.
/// Anything else, including transport failures, is reported as unavailable.
#[derive(Debug, Clone)]
pub struct HttpUserDirectory {
    client: Client,
    base_url: String,
}

impl HttpUserDirectory {
    /// Creates a client for the service at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn user_url(&self, user_id: UserId) -> String {
        format!("{}/user/{}", self.base_url, user_id)
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    #[tracing::instrument(skip(self))]
    async fn ensure_exists(&self, user_id: UserId) -> Result<(), DirectoryError> {
        let response = self
            .client
            .get(self.user_url(user_id))
            .send()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status.is_client_error() {
            tracing::debug!(%user_id, %status, "user service does not know user");
            Err(DirectoryError::UserNotFound(user_id))
        } else {
            Err(DirectoryError::Unavailable(unexpected(status)))
        }
    }
}

fn unexpected(status: StatusCode) -> String {
    format!("user service answered {status}")
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::extract::Path;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;

    use super::*;

    /// Serves `/user/{id}` on an ephemeral port: 200 for `known`, 404 otherwise.
    async fn spawn_user_service(known: UserId) -> String {
        let app = Router::new().route(
            "/user/{id}",
            get(move |Path(id): Path<String>| async move {
                if id == known.to_string() {
                    AxumStatus::OK
                } else {
                    AxumStatus::NOT_FOUND
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_known_and_unknown_users() {
        let known = UserId::new();
        let base = spawn_user_service(known).await;
        let directory = HttpUserDirectory::new(&base, Duration::from_secs(2)).unwrap();

        assert!(directory.ensure_exists(known).await.is_ok());
        assert!(matches!(
            directory.ensure_exists(UserId::new()).await,
            Err(DirectoryError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let directory =
            HttpUserDirectory::new(&format!("http://{addr}"), Duration::from_secs(1)).unwrap();
        assert!(matches!(
            directory.ensure_exists(UserId::new()).await,
            Err(DirectoryError::Unavailable(_))
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let directory =
            HttpUserDirectory::new("http://users:8080/", Duration::from_secs(1)).unwrap();
        let user_id = UserId::new();
        assert_eq!(
            directory.user_url(user_id),
            format!("http://users:8080/user/{user_id}")
        );
    }
}
