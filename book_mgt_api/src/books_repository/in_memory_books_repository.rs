use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI32, Ordering};

use serde_json::json;

use crate::api::{
    Book, BookDetails, BookDetailsPatch, BookId, Review, ReviewDetails, ReviewId,
};
use crate::books_repository::{validate_rating, BookRepository, BookRepositoryError};

#[derive(Default)]
pub struct InMemoryBookRepository {
    book_sequence_generator: AtomicI32,
    review_sequence_generator: AtomicI32,
    books: parking_lot::RwLock<BTreeMap<BookId, BookDetails>>,
    reviews: parking_lot::RwLock<BTreeMap<ReviewId, Review>>,
}

#[async_trait::async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn add_book(&self, details: BookDetails) -> Result<Book, BookRepositoryError> {
        let id = self.book_sequence_generator.fetch_add(1, Ordering::Relaxed) + 1;
        self.books.write().insert(id, details.clone());
        Ok(Book { id, details })
    }

    async fn list_books(&self, skip: i64, limit: i64) -> Result<Vec<Book>, BookRepositoryError> {
        let skip = usize::try_from(skip).unwrap_or_default();
        let limit = usize::try_from(limit).unwrap_or_default();
        Ok(self
            .books
            .read()
            .iter()
            .skip(skip)
            .take(limit)
            .map(|(&id, details)| Book {
                id,
                details: details.clone(),
            })
            .collect())
    }

    async fn get_book(&self, book_id: BookId) -> Result<Book, BookRepositoryError> {
        self.books
            .read()
            .get(&book_id)
            .cloned()
            .map(|details| Book {
                id: book_id,
                details,
            })
            .ok_or(BookRepositoryError::NotFound(book_id))
    }

    async fn replace_book(
        &self,
        book_id: BookId,
        details: BookDetails,
    ) -> Result<Book, BookRepositoryError> {
        let mut locked_books = self.books.write();
        let book = locked_books
            .get_mut(&book_id)
            .ok_or(BookRepositoryError::NotFound(book_id))?;
        *book = details.clone();
        Ok(Book {
            id: book_id,
            details,
        })
    }

    async fn update_book(
        &self,
        book_id: BookId,
        patch: BookDetailsPatch,
    ) -> Result<Book, BookRepositoryError> {
        let mut locked_books = self.books.write();
        let book = locked_books
            .get_mut(&book_id)
            .ok_or(BookRepositoryError::NotFound(book_id))?;

        let mut result_book = json!(book);
        json_patch::merge(&mut result_book, &json!(patch));
        let result_book: BookDetails = serde_json::from_value(result_book)?;
        *book = result_book.clone();
        Ok(Book {
            id: book_id,
            details: result_book,
        })
    }

    async fn delete_book(&self, book_id: BookId) -> Result<(), BookRepositoryError> {
        let mut locked_books = self.books.write();
        if locked_books.remove(&book_id).is_none() {
            return Err(BookRepositoryError::NotFound(book_id));
        }
        self.reviews
            .write()
            .retain(|_, review| review.book_id != book_id);
        Ok(())
    }

    async fn add_review(
        &self,
        book_id: BookId,
        details: ReviewDetails,
    ) -> Result<Review, BookRepositoryError> {
        validate_rating(details.rating)?;
        // Holding the books lock keeps the book from being deleted until the review is stored
        let locked_books = self.books.read();
        if !locked_books.contains_key(&book_id) {
            return Err(BookRepositoryError::NotFound(book_id));
        }
        let id = self.review_sequence_generator.fetch_add(1, Ordering::Relaxed) + 1;
        let review = Review {
            id,
            book_id,
            details,
        };
        self.reviews.write().insert(id, review.clone());
        Ok(review)
    }

    async fn list_reviews(&self, book_id: BookId) -> Result<Vec<Review>, BookRepositoryError> {
        Ok(self
            .reviews
            .read()
            .values()
            .filter(|review| review.book_id == book_id)
            .cloned()
            .collect())
    }
}
