use anyhow::{bail, Context};
use reqwest::{Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use reqwest_tracing::TracingMiddleware;

use crate::api::{
    Book, BookDetails, BookDetailsPatch, BookId, DetailResponse, Review, ReviewDetails,
    ReviewSummary,
};

pub struct BookMgtApiClient {
    url: String,
    username: String,
    password: String,
    /// Used for POST and DELETE requests, which are sent once
    client: ClientWithMiddleware,
    /// Used for idempotent requests, retried on transient failures
    retrying_client: ClientWithMiddleware,
}

async fn error_detail(response: Response) -> String {
    let status = response.status();
    response
        .json::<DetailResponse>()
        .await
        .map(|body| body.detail)
        .unwrap_or_else(|_| status.to_string())
}

impl BookMgtApiClient {
    pub fn new(url: &str, username: &str, password: &str) -> anyhow::Result<Self> {
        Self::with_retry_policy(
            url,
            username,
            password,
            ExponentialBackoff::builder().build_with_max_retries(3),
        )
    }

    pub fn with_retry_policy(
        url: &str,
        username: &str,
        password: &str,
        retry_policy: ExponentialBackoff,
    ) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = ClientBuilder::new(reqwest_client.clone())
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();
        let retrying_client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            client,
            retrying_client,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.username, Some(&self.password))
    }

    /// Calls GET /health endpoint
    pub async fn health(&self) -> anyhow::Result<bool> {
        let response = self
            .retrying_client
            .get(format!("{}/health", self.url))
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    /// Calls POST /books/ endpoint
    /// Returns the created book with its assigned id
    pub async fn add_book(&self, book_details: BookDetails) -> anyhow::Result<Book> {
        let response = self
            .authorized(self.client.post(format!("{}/books/", self.url)))
            .json(&book_details)
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("Failed to add book {}", error_detail(response).await)
        }
        response.json().await.context("Failed to parse book")
    }

    /// Calls GET /books/?skip={skip}&limit={limit} endpoint
    pub async fn list_books(&self, skip: i64, limit: i64) -> anyhow::Result<Vec<Book>> {
        let response = self
            .authorized(self.retrying_client.get(format!("{}/books/", self.url)))
            .query(&[("skip", skip), ("limit", limit)])
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            bail!("Failed to list books {}", error_detail(response).await)
        }
    }

    /// Calls GET /books/{book_id} endpoint
    /// Returns None if book was not in the repository
    /// and error in case of any other failure
    pub async fn get_book(&self, book_id: BookId) -> anyhow::Result<Option<Book>> {
        let response = self
            .authorized(self.retrying_client.get(format!("{}/books/{}", self.url, book_id)))
            .send()
            .await?;
        Self::optional_json(response, "get book").await
    }

    /// Calls PUT /books/{book_id} endpoint
    pub async fn replace_book(
        &self,
        book_id: BookId,
        book_details: BookDetails,
    ) -> anyhow::Result<Option<Book>> {
        let response = self
            .authorized(self.retrying_client.put(format!("{}/books/{}", self.url, book_id)))
            .json(&book_details)
            .send()
            .await?;
        Self::optional_json(response, "replace book").await
    }

    /// Calls PATCH /books/{book_id} endpoint
    pub async fn update_book(
        &self,
        book_id: BookId,
        patch: BookDetailsPatch,
    ) -> anyhow::Result<Option<Book>> {
        let response = self
            .authorized(self.retrying_client.patch(format!("{}/books/{}", self.url, book_id)))
            .json(&patch)
            .send()
            .await?;
        Self::optional_json(response, "update book").await
    }

    /// Calls DELETE /books/{book_id} endpoint
    /// Returns false if there was no such book
    pub async fn delete_book(&self, book_id: BookId) -> anyhow::Result<bool> {
        let response = self
            .authorized(self.client.delete(format!("{}/books/{}", self.url, book_id)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(false)
        } else if response.status().is_success() {
            Ok(true)
        } else {
            bail!("Failed to delete book {}", error_detail(response).await)
        }
    }

    /// Calls POST /books/{book_id}/reviews endpoint
    /// Returns None if the book does not exist
    pub async fn add_review(
        &self,
        book_id: BookId,
        review: ReviewDetails,
    ) -> anyhow::Result<Option<Review>> {
        let response = self
            .authorized(
                self.client
                    .post(format!("{}/books/{}/reviews", self.url, book_id)),
            )
            .json(&review)
            .send()
            .await?;
        Self::optional_json(response, "add review").await
    }

    /// Calls GET /books/{book_id}/reviews endpoint
    pub async fn list_reviews(&self, book_id: BookId) -> anyhow::Result<Vec<Review>> {
        let response = self
            .authorized(
                self.retrying_client
                    .get(format!("{}/books/{}/reviews", self.url, book_id)),
            )
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            bail!("Failed to list reviews {}", error_detail(response).await)
        }
    }

    /// Calls GET /books/{book_id}/summary endpoint
    /// Returns None when the book has no reviews
    pub async fn review_summary(&self, book_id: BookId) -> anyhow::Result<Option<ReviewSummary>> {
        let response = self
            .authorized(
                self.retrying_client
                    .get(format!("{}/books/{}/summary", self.url, book_id)),
            )
            .send()
            .await?;
        Self::optional_json(response, "get review summary").await
    }

    async fn optional_json<T: serde::de::DeserializeOwned>(
        response: Response,
        operation: &str,
    ) -> anyhow::Result<Option<T>> {
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            bail!("Failed to {} {}", operation, error_detail(response).await)
        }
    }
}

#[cfg(test)]
mod client_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::{web, App, HttpResponse, HttpServer};

    use super::*;

    /// Starts a server answering 503 to everything, returns its url and a request counter
    fn unavailable_server() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let server = HttpServer::new(move || {
            let counter = counter.clone();
            App::new().default_service(web::to(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { HttpResponse::ServiceUnavailable().finish() }
            }))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let url = format!("http://{}", server.addrs()[0]);
        actix_web::rt::spawn(server.run());
        (url, hits)
    }

    #[actix_web::test]
    async fn only_idempotent_requests_are_retried() {
        let (url, hits) = unavailable_server();
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(1), Duration::from_millis(10))
            .build_with_max_retries(3);
        let client =
            BookMgtApiClient::with_retry_policy(&url, "admin", "password", retry_policy).unwrap();

        let book = BookDetails {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            genre: None,
            year_published: None,
            summary: None,
        };
        assert!(client.add_book(book).await.is_err());
        assert_eq!(hits.swap(0, Ordering::SeqCst), 1);

        let review = ReviewDetails {
            user_id: 1,
            review_text: "Great".to_string(),
            rating: 5,
        };
        assert!(client.add_review(1, review).await.is_err());
        assert_eq!(hits.swap(0, Ordering::SeqCst), 1);

        assert!(client.delete_book(1).await.is_err());
        assert_eq!(hits.swap(0, Ordering::SeqCst), 1);

        assert!(client.get_book(1).await.is_err());
        assert_eq!(hits.swap(0, Ordering::SeqCst), 4);

        assert!(client
            .update_book(1, BookDetailsPatch::default())
            .await
            .is_err());
        assert_eq!(hits.swap(0, Ordering::SeqCst), 4);
    }
}
