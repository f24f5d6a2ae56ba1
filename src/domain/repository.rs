use super::model::book::{Book, NewBook};
use super::model::id::BookId;

/// Storeの抽象。Infra層が実装する。
///
/// 変更系は`&mut self`を取るため、呼び出し側の排他借用の中で
/// 重複チェックから書き込みまでが一続きに実行される。
pub trait BookRepository {
    type Error: std::error::Error + Send + Sync + 'static;

    /// 次のIDを採番して末尾に追加する。
    fn insert(&mut self, book: NewBook) -> Result<Book, Self::Error>;
    fn find_by_id(&self, id: BookId) -> Result<Option<Book>, Self::Error>;
    /// 同じIDのBookを挿入位置を保ったまま置き換える。
    fn replace(&mut self, book: Book) -> Result<bool, Self::Error>;
    fn remove_by_id(&mut self, id: BookId) -> Result<bool, Self::Error>;
    /// 挿入順の全件。
    fn all(&self) -> Result<Vec<Book>, Self::Error>;
}
