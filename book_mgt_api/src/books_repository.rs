use std::sync::Arc;

pub use in_memory_books_repository::InMemoryBookRepository;
pub use postgres_books_repository::{PostgresBooksRepository, PostgresBooksRepositoryConfig};

use crate::api::{
    Book, BookDetails, BookDetailsPatch, BookId, Review, ReviewDetails, ReviewSummary, MAX_RATING,
    MIN_RATING,
};

mod in_memory_books_repository;
mod postgres_books_repository;

/// Repository shared between all http workers
pub type SharedBookRepository = Arc<dyn BookRepository>;

#[derive(thiserror::Error, Debug)]
pub enum BookRepositoryError {
    #[error("Book {0} not found")]
    NotFound(BookId),

    #[error("No reviews found for book {0}")]
    NoReviews(BookId),

    #[error("Rating {0} is out of range, expected 1..=5")]
    InvalidRating(i32),

    #[error("Failed to deserialize book: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

#[async_trait::async_trait]
pub trait BookRepository: Send + Sync {
    /// Adds book to repository, returns the stored book with the id assigned to it
    async fn add_book(&self, details: BookDetails) -> Result<Book, BookRepositoryError>;
    /// Lists books ordered by id, skipping `skip` books and returning at most `limit`
    async fn list_books(&self, skip: i64, limit: i64) -> Result<Vec<Book>, BookRepositoryError>;
    /// Retrieves the book from repository
    async fn get_book(&self, book_id: BookId) -> Result<Book, BookRepositoryError>;
    /// Replaces all details of the book
    async fn replace_book(
        &self,
        book_id: BookId,
        details: BookDetails,
    ) -> Result<Book, BookRepositoryError>;
    /// Merges the patch into the current details of the book
    async fn update_book(
        &self,
        book_id: BookId,
        patch: BookDetailsPatch,
    ) -> Result<Book, BookRepositoryError>;
    /// Removes the book together with all of its reviews
    async fn delete_book(&self, book_id: BookId) -> Result<(), BookRepositoryError>;
    /// Adds review to an existing book
    async fn add_review(
        &self,
        book_id: BookId,
        details: ReviewDetails,
    ) -> Result<Review, BookRepositoryError>;
    /// Lists reviews of the book ordered by id
    async fn list_reviews(&self, book_id: BookId) -> Result<Vec<Review>, BookRepositoryError>;
    /// Average rating and joined texts of all reviews of the book
    async fn review_summary(&self, book_id: BookId) -> Result<ReviewSummary, BookRepositoryError> {
        let reviews = self.list_reviews(book_id).await?;
        summarize_reviews(book_id, &reviews)
    }
}

pub(crate) fn validate_rating(rating: i32) -> Result<(), BookRepositoryError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(BookRepositoryError::InvalidRating(rating))
    }
}

pub(crate) fn summarize_reviews(
    book_id: BookId,
    reviews: &[Review],
) -> Result<ReviewSummary, BookRepositoryError> {
    if reviews.is_empty() {
        return Err(BookRepositoryError::NoReviews(book_id));
    }
    let ratings_sum: i64 = reviews.iter().map(|r| i64::from(r.details.rating)).sum();

    Ok(ReviewSummary {
        average_rating: ratings_sum as f64 / reviews.len() as f64,
        summary: reviews
            .iter()
            .map(|r| r.details.review_text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    })
}
