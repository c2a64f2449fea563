use actix_web::http::header::LOCATION;
use actix_web::web::Data;
use actix_web::Error;
use actix_web::HttpResponse;
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};

use crate::api::{
    BookDetails, BookDetailsPatch, BookId, DetailResponse, ListBooksQuery, ReviewDetails,
};
use crate::auth::Authenticated;
use crate::books_repository::{BookRepositoryError, SharedBookRepository};

fn repository_error_response(operation: &str, err: BookRepositoryError) -> HttpResponse {
    match err {
        BookRepositoryError::NotFound(_) => {
            HttpResponse::NotFound().json(DetailResponse::new("Book not found"))
        }
        BookRepositoryError::NoReviews(_) => HttpResponse::NotFound()
            .json(DetailResponse::new("No reviews found for this book")),
        BookRepositoryError::InvalidRating(_) => {
            HttpResponse::UnprocessableEntity().json(DetailResponse::new(err.to_string()))
        }
        err => {
            tracing::error!("{} failed {}", operation, err);
            HttpResponse::InternalServerError().json(DetailResponse::new("Internal server error"))
        }
    }
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn add_book(
    _auth: Authenticated,
    books_repository: Data<SharedBookRepository>,
    details: web::Json<BookDetails>,
) -> Result<HttpResponse, Error> {
    Ok(
        match books_repository.add_book(details.into_inner()).await {
            Ok(book) => HttpResponse::Ok()
                .append_header((LOCATION, format!("/books/{}", book.id)))
                .json(book),
            Err(err) => repository_error_response("Add book", err),
        },
    )
}

#[api_v2_operation]
pub async fn list_books(
    _auth: Authenticated,
    books_repository: Data<SharedBookRepository>,
    query: web::Query<ListBooksQuery>,
) -> Result<HttpResponse, Error> {
    let ListBooksQuery { skip, limit } = query.into_inner();
    if skip < 0 || limit < 0 {
        return Ok(HttpResponse::BadRequest().json(DetailResponse::new(
            "skip and limit must not be negative",
        )));
    }
    Ok(match books_repository.list_books(skip, limit).await {
        Ok(books) => HttpResponse::Ok().json(books),
        Err(err) => repository_error_response("List books", err),
    })
}

#[api_v2_operation]
pub async fn get_book(
    _auth: Authenticated,
    books_repository: Data<SharedBookRepository>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    Ok(
        match books_repository.get_book(book_id.into_inner()).await {
            Ok(book) => HttpResponse::Ok().json(book),
            Err(err) => repository_error_response("Get book", err),
        },
    )
}

#[api_v2_operation]
pub async fn replace_book(
    _auth: Authenticated,
    books_repository: Data<SharedBookRepository>,
    book_id: web::Path<BookId>,
    details: web::Json<BookDetails>,
) -> Result<HttpResponse, Error> {
    Ok(
        match books_repository
            .replace_book(book_id.into_inner(), details.into_inner())
            .await
        {
            Ok(book) => HttpResponse::Ok().json(book),
            Err(err) => repository_error_response("Replace book", err),
        },
    )
}

#[api_v2_operation]
pub async fn update_book(
    _auth: Authenticated,
    books_repository: Data<SharedBookRepository>,
    book_id: web::Path<BookId>,
    patch: web::Json<BookDetailsPatch>,
) -> Result<HttpResponse, Error> {
    Ok(
        match books_repository
            .update_book(book_id.into_inner(), patch.into_inner())
            .await
        {
            Ok(book) => HttpResponse::Ok().json(book),
            Err(err) => repository_error_response("Update book", err),
        },
    )
}

#[api_v2_operation]
pub async fn delete_book(
    _auth: Authenticated,
    books_repository: Data<SharedBookRepository>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    let book_id = book_id.into_inner();
    Ok(match books_repository.delete_book(book_id).await {
        Ok(()) => {
            tracing::info!(book_id, "Book deleted");
            HttpResponse::Ok().json(DetailResponse::new("Book deleted"))
        }
        Err(err) => repository_error_response("Delete book", err),
    })
}

#[api_v2_operation]
pub async fn add_review(
    _auth: Authenticated,
    books_repository: Data<SharedBookRepository>,
    book_id: web::Path<BookId>,
    details: web::Json<ReviewDetails>,
) -> Result<HttpResponse, Error> {
    Ok(
        match books_repository
            .add_review(book_id.into_inner(), details.into_inner())
            .await
        {
            Ok(review) => HttpResponse::Ok().json(review),
            Err(err) => repository_error_response("Add review", err),
        },
    )
}

#[api_v2_operation]
pub async fn list_reviews(
    _auth: Authenticated,
    books_repository: Data<SharedBookRepository>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    Ok(
        match books_repository.list_reviews(book_id.into_inner()).await {
            Ok(reviews) => HttpResponse::Ok().json(reviews),
            Err(err) => repository_error_response("List reviews", err),
        },
    )
}

#[api_v2_operation]
pub async fn review_summary(
    _auth: Authenticated,
    books_repository: Data<SharedBookRepository>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    Ok(
        match books_repository.review_summary(book_id.into_inner()).await {
            Ok(summary) => HttpResponse::Ok().json(summary),
            Err(err) => repository_error_response("Review summary", err),
        },
    )
}
