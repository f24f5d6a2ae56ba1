use std::convert::Infallible;

use crate::domain::model::book::{Book, NewBook};
use crate::domain::model::id::BookId;
use crate::domain::repository::BookRepository;

/// プロセス内メモリのBookRepository実装。
/// 再起動すると内容は消える。IDは1から始まり、削除後も再利用しない。
#[derive(Debug)]
pub struct InMemoryBookRepository {
    books: Vec<Book>,
    next_id: u64,
}

impl Default for InMemoryBookRepository {
    fn default() -> Self {
        Self {
            books: Vec::new(),
            next_id: 1,
        }
    }
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    fn position(&self, id: BookId) -> Option<usize> {
        self.books.iter().position(|b| b.id() == id)
    }
}

impl BookRepository for InMemoryBookRepository {
    type Error = Infallible;

    fn insert(&mut self, book: NewBook) -> Result<Book, Self::Error> {
        let id = BookId::new(self.next_id);
        self.next_id += 1;
        let stored = Book::new(id, book);
        self.books.push(stored.clone());
        Ok(stored)
    }

    fn find_by_id(&self, id: BookId) -> Result<Option<Book>, Self::Error> {
        Ok(self.books.iter().find(|b| b.id() == id).cloned())
    }

    fn replace(&mut self, book: Book) -> Result<bool, Self::Error> {
        match self.position(book.id()) {
            Some(pos) => {
                self.books[pos] = book;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove_by_id(&mut self, id: BookId) -> Result<bool, Self::Error> {
        match self.position(id) {
            Some(pos) => {
                self.books.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn all(&self) -> Result<Vec<Book>, Self::Error> {
        Ok(self.books.clone())
    }
}
