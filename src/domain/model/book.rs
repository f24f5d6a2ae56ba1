use serde::Serialize;

use super::id::BookId;
use crate::domain::error::DomainError;

/// 受け付ける出版年の下限（含む）
pub const MIN_YEAR: i32 = 1500;
/// 受け付ける出版年の上限（含む）
pub const MAX_YEAR: i32 = 2100;

/// Book作成リクエスト（未検証の入力値）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub year: i32,
    pub read: bool,
}

impl TryFrom<CreateBookRequest> for NewBook {
    type Error = DomainError;

    fn try_from(req: CreateBookRequest) -> Result<Self, Self::Error> {
        NewBook::new(req.title, req.author, req.year, req.read)
    }
}

/// 検証済みの新規Book。IDはStoreが採番する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    title: String,
    author: String,
    year: i32,
    read: bool,
}

impl NewBook {
    /// title/authorをtrimし、空文字とyearの範囲外を拒否する。
    pub fn new(
        title: impl AsRef<str>,
        author: impl AsRef<str>,
        year: i32,
        read: bool,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            title: normalize_text("title", title.as_ref())?,
            author: normalize_text("author", author.as_ref())?,
            year: check_year(year)?,
            read,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn read(&self) -> bool {
        self.read
    }

    pub fn identity_key(&self) -> IdentityKey {
        identity_key(&self.title, &self.author)
    }
}

/// Book更新リクエスト（Noneのフィールドは変更しない）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<i32>,
    pub read: Option<bool>,
}

impl UpdateBookRequest {
    /// 指定されたフィールドだけを検証し、trim済みの値に置き換える。
    pub fn normalized(self) -> Result<Self, DomainError> {
        Ok(Self {
            title: self
                .title
                .map(|t| normalize_text("title", &t))
                .transpose()?,
            author: self
                .author
                .map(|a| normalize_text("author", &a))
                .transpose()?,
            year: self.year.map(check_year).transpose()?,
            read: self.read,
        })
    }
}

/// 重複判定キー: trim + 小文字化した (title, author)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    title: String,
    author: String,
}

pub fn identity_key(title: &str, author: &str) -> IdentityKey {
    IdentityKey {
        title: title.trim().to_lowercase(),
        author: author.trim().to_lowercase(),
    }
}

/// 蔵書レコード。Store経由でのみ生成される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    id: BookId,
    title: String,
    author: String,
    year: i32,
    read: bool,
}

impl Book {
    pub fn new(id: BookId, new_book: NewBook) -> Self {
        Self {
            id,
            title: new_book.title,
            author: new_book.author,
            year: new_book.year,
            read: new_book.read,
        }
    }

    pub fn id(&self) -> BookId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn read(&self) -> bool {
        self.read
    }

    pub fn identity_key(&self) -> IdentityKey {
        identity_key(&self.title, &self.author)
    }

    /// titleかauthorに小文字化済みの`needle`を含むか。
    pub fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.author.to_lowercase().contains(needle)
    }

    /// 更新後の (title, author) 重複判定キー。
    pub fn identity_after(&self, req: &UpdateBookRequest) -> IdentityKey {
        identity_key(
            req.title.as_deref().unwrap_or(&self.title),
            req.author.as_deref().unwrap_or(&self.author),
        )
    }

    // --- 内部操作（Service経由でのみ呼ばれる） ---

    /// `normalized()`済みのリクエストを適用する。idは変更しない。
    pub(crate) fn apply(&mut self, req: UpdateBookRequest) {
        if let Some(title) = req.title {
            self.title = title;
        }
        if let Some(author) = req.author {
            self.author = author;
        }
        if let Some(year) = req.year {
            self.year = year;
        }
        if let Some(read) = req.read {
            self.read = read;
        }
    }
}

fn normalize_text(field: &str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn check_year(year: i32) -> Result<i32, DomainError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(DomainError::invalid(format!(
            "year must be between {MIN_YEAR} and {MAX_YEAR}, got {year}"
        )));
    }
    Ok(year)
}
