//! Shared test harness for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use library_api::application::service::BookService;
use library_api::domain::model::book::{Book, CreateBookRequest, NewBook};
use library_api::domain::model::id::BookId;
use library_api::domain::repository::BookRepository;
use library_api::infra::memory_store::InMemoryBookRepository;

// =============================================================================
// FailingRepo: Store障害を再現するリポジトリ
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[error("store unavailable")]
pub struct StoreUnavailable;

/// 全操作が失敗するリポジトリ。
pub struct FailingRepo;

impl BookRepository for FailingRepo {
    type Error = StoreUnavailable;

    fn insert(&mut self, _book: NewBook) -> Result<Book, Self::Error> {
        Err(StoreUnavailable)
    }

    fn find_by_id(&self, _id: BookId) -> Result<Option<Book>, Self::Error> {
        Err(StoreUnavailable)
    }

    fn replace(&mut self, _book: Book) -> Result<bool, Self::Error> {
        Err(StoreUnavailable)
    }

    fn remove_by_id(&mut self, _id: BookId) -> Result<bool, Self::Error> {
        Err(StoreUnavailable)
    }

    fn all(&self) -> Result<Vec<Book>, Self::Error> {
        Err(StoreUnavailable)
    }
}

// =============================================================================
// TestLibrary: 登録済みテスト用蔵書
// =============================================================================

pub fn create_req(title: &str, author: &str, year: i32) -> CreateBookRequest {
    CreateBookRequest {
        title: title.into(),
        author: author.into(),
        year,
        read: false,
    }
}

/// テスト用の蔵書。IDを名前で引ける。
pub struct TestLibrary {
    pub service: BookService<InMemoryBookRepository>,
    pub ids: HashMap<&'static str, BookId>,
}

impl TestLibrary {
    /// 標準的なテスト用蔵書（挿入順）:
    /// ```text
    /// 1. Dune by Frank Herbert (1965)
    /// 2. Foundation by Isaac Asimov (1951)
    /// 3. Hyperion by Dan Simmons (1989)
    /// 4. I, Robot by Isaac Asimov (1950)
    /// 5. The Left Hand of Darkness by Ursula K. Le Guin (1969)
    /// ```
    pub fn standard() -> Self {
        let mut service = BookService::new(InMemoryBookRepository::new());
        let mut ids = HashMap::new();

        for (name, title, author, year) in [
            ("dune", "Dune", "Frank Herbert", 1965),
            ("foundation", "Foundation", "Isaac Asimov", 1951),
            ("hyperion", "Hyperion", "Dan Simmons", 1989),
            ("robot", "I, Robot", "Isaac Asimov", 1950),
            ("left_hand", "The Left Hand of Darkness", "Ursula K. Le Guin", 1969),
        ] {
            let book = service.create(create_req(title, author, year)).unwrap();
            ids.insert(name, book.id());
        }

        Self { service, ids }
    }

    pub fn empty() -> BookService<InMemoryBookRepository> {
        BookService::new(InMemoryBookRepository::new())
    }
}

// =============================================================================
// Assertion helpers
// =============================================================================

/// 結果がErrで、メッセージに指定文字列を含むことをassert。
pub fn assert_error_contains<T: std::fmt::Debug>(
    result: Result<T, impl std::fmt::Display>,
    expected: &str,
) {
    match result {
        Err(e) => {
            let msg = e.to_string();
            assert!(
                msg.contains(expected),
                "Expected error containing '{expected}', got: '{msg}'"
            );
        }
        Ok(v) => panic!("Expected error containing '{expected}', got Ok({v:?})"),
    }
}
