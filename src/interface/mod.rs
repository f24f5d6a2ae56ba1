use std::sync::Arc;

use tokio::sync::RwLock;

use crate::application::service::BookService;
use crate::infra::memory_store::InMemoryBookRepository;

pub mod http;
pub mod mcp;

/// プロセス内で1つだけのBookService。
/// 参照系はread、変更系はwriteロックを操作全体にわたって保持する。
pub type SharedLibrary = Arc<RwLock<BookService<InMemoryBookRepository>>>;

/// 空のStoreでSharedLibraryを作る。
pub fn shared_library() -> SharedLibrary {
    Arc::new(RwLock::new(BookService::new(InMemoryBookRepository::new())))
}
