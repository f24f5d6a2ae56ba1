use tracing::{debug, info};

use crate::domain::error::DomainError;
use crate::domain::model::book::{Book, CreateBookRequest, NewBook, UpdateBookRequest};
use crate::domain::model::id::BookId;
use crate::domain::repository::BookRepository;

use super::error::AppError;
use super::query::{ListQuery, Page};

/// 蔵書に対するユースケース。
/// 検証 → 重複チェック → 書き込み の順で操作し、失敗時はStoreに触れない。
/// 変更系は`&mut self`なので、共有する場合は全体を1つのロックで包む。
pub struct BookService<R: BookRepository> {
    repo: R,
}

impl<R: BookRepository> BookService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// 検索・並び替え・ページングした一覧を返す。
    pub fn list(&self, query: &ListQuery) -> Result<Page, AppError> {
        let books = self.repo.all().map_err(storage)?;
        Ok(query.apply(books))
    }

    /// Bookを新規作成する。(title, author) が既存と重複すればConflict。
    pub fn create(&mut self, req: CreateBookRequest) -> Result<Book, AppError> {
        let new_book = NewBook::try_from(req)?;
        let key = new_book.identity_key();

        let existing = self.repo.all().map_err(storage)?;
        if existing.iter().any(|b| b.identity_key() == key) {
            debug!(
                title = new_book.title(),
                author = new_book.author(),
                "duplicate create rejected"
            );
            return Err(DomainError::Conflict {
                title: new_book.title().to_string(),
                author: new_book.author().to_string(),
            }
            .into());
        }

        let book = self.repo.insert(new_book).map_err(storage)?;
        info!(id = %book.id(), title = book.title(), "book created");
        Ok(book)
    }

    pub fn get(&self, id: BookId) -> Result<Book, AppError> {
        self.repo
            .find_by_id(id)
            .map_err(storage)?
            .ok_or(AppError::Domain(DomainError::NotFound(id)))
    }

    /// 指定フィールドだけを更新する。入力検証は存在確認より先に行い、
    /// 重複チェックは自分自身を除外する。
    pub fn update(&mut self, id: BookId, req: UpdateBookRequest) -> Result<Book, AppError> {
        let req = req.normalized()?;
        let mut book = self.get(id)?;

        let key = book.identity_after(&req);
        let others = self.repo.all().map_err(storage)?;
        if others
            .iter()
            .any(|b| b.id() != id && b.identity_key() == key)
        {
            debug!(%id, "duplicate update rejected");
            return Err(DomainError::Conflict {
                title: req.title.unwrap_or_else(|| book.title().to_string()),
                author: req.author.unwrap_or_else(|| book.author().to_string()),
            }
            .into());
        }

        book.apply(req);
        if !self.repo.replace(book.clone()).map_err(storage)? {
            return Err(DomainError::NotFound(id).into());
        }
        info!(%id, "book updated");
        Ok(book)
    }

    pub fn delete(&mut self, id: BookId) -> Result<(), AppError> {
        if !self.repo.remove_by_id(id).map_err(storage)? {
            return Err(DomainError::NotFound(id).into());
        }
        info!(%id, "book deleted");
        Ok(())
    }
}

fn storage<E: std::error::Error + Send + Sync + 'static>(e: E) -> AppError {
    AppError::Storage(Box::new(e))
}
