//! Black-box tests of a running book management api.
//!
//! Both suites are disabled by default, enable them with
//! `--features system_tests` or `--features load_tests`.
//! The target is taken from `BOOK_MGT_API_URL` (default `http://127.0.0.1:8000`),
//! credentials from `ADMIN_USERNAME` / `ADMIN_PASSWORD`.

use book_mgt_api::api::{BookDetails, ReviewDetails};
use book_mgt_api::client::BookMgtApiClient;
use rand::seq::SliceRandom;
use rand::Rng;

const GENRES: &[&str] = &["Fantasy", "Essay", "Crime", "Poetry", "Science fiction"];

pub fn client_from_env() -> anyhow::Result<BookMgtApiClient> {
    let url =
        std::env::var("BOOK_MGT_API_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
    let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "password".to_string());
    BookMgtApiClient::new(&url, &username, &password)
}

pub fn generate_authors<R: Rng>(rng: &mut R, count: usize) -> Vec<String> {
    (0..count)
        .map(|_| format!("Author{}", rng.gen_range(0..1_000_000)))
        .collect()
}

pub fn generate_books<R: Rng>(rng: &mut R, count: usize, authors: &[String]) -> Vec<BookDetails> {
    (0..count)
        .map(|i| BookDetails {
            title: format!("Book {} {}", i, rng.gen_range(0..1_000_000)),
            author: authors
                .choose(rng)
                .cloned()
                .unwrap_or_else(|| "Anonymous".to_string()),
            genre: GENRES.choose(rng).map(|g| g.to_string()),
            year_published: Some(rng.gen_range(1800..2025)),
            summary: None,
        })
        .collect()
}

pub fn generate_review<R: Rng>(rng: &mut R) -> ReviewDetails {
    let rating = rng.gen_range(1..=5);
    ReviewDetails {
        user_id: rng.gen_range(1..1000),
        review_text: format!("Rated {} out of 5", rating),
        rating,
    }
}
