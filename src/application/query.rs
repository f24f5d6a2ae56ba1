use std::cmp::Ordering;
use std::str::FromStr;

use serde::Serialize;

use crate::domain::error::DomainError;
use crate::domain::model::book::Book;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// 並び替えキー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Author,
    Year,
}

impl SortKey {
    fn compare(self, a: &Book, b: &Book) -> Ordering {
        match self {
            SortKey::Title => a.title().cmp(b.title()),
            SortKey::Author => a.author().cmp(b.author()),
            SortKey::Year => a.year().cmp(&b.year()),
        }
    }
}

impl FromStr for SortKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SortKey::Title),
            "author" => Ok(SortKey::Author),
            "year" => Ok(SortKey::Year),
            other => Err(DomainError::invalid(format!(
                "unknown sort key: '{other}'. Use: title, author, year"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(DomainError::invalid(format!(
                "unknown order: '{other}'. Use: asc, desc"
            ))),
        }
    }
}

/// 一覧取得の条件。offset/limitは`with_page`で範囲検証される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    search: Option<String>,
    sort: Option<SortKey>,
    order: SortOrder,
    offset: usize,
    limit: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: None,
            sort: None,
            order: SortOrder::Asc,
            offset: 0,
            limit: DEFAULT_LIMIT as usize,
        }
    }
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// 空文字列は「絞り込みなし」として扱う。
    pub fn search(mut self, q: impl Into<String>) -> Self {
        let q = q.into();
        self.search = if q.is_empty() {
            None
        } else {
            Some(q.to_lowercase())
        };
        self
    }

    pub fn sort_by(mut self, key: SortKey, order: SortOrder) -> Self {
        self.sort = Some(key);
        self.order = order;
        self
    }

    /// 並び替えキー無しで順序だけ指定された場合は挿入順のまま。
    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_page(mut self, offset: i64, limit: i64) -> Result<Self, DomainError> {
        if offset < 0 {
            return Err(DomainError::invalid(format!(
                "offset must be >= 0, got {offset}"
            )));
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(DomainError::invalid(format!(
                "limit must be between 1 and {MAX_LIMIT}, got {limit}"
            )));
        }
        self.offset = offset as usize;
        self.limit = limit as usize;
        Ok(self)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn sort_key(&self) -> Option<SortKey> {
        self.sort
    }

    /// 絞り込み → 安定ソート → ページング。totalはページング前の件数。
    pub fn apply(&self, books: Vec<Book>) -> Page {
        let mut matched: Vec<Book> = match &self.search {
            Some(needle) => books.into_iter().filter(|b| b.matches(needle)).collect(),
            None => books,
        };

        if let Some(key) = self.sort {
            match self.order {
                SortOrder::Asc => matched.sort_by(|a, b| key.compare(a, b)),
                SortOrder::Desc => matched.sort_by(|a, b| key.compare(b, a)),
            }
        }

        let total = matched.len();
        let items = matched
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect();
        Page { items, total }
    }
}

/// 一覧の1ページ分と、ページング前の一致件数。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub items: Vec<Book>,
    pub total: usize,
}
