use std::fmt;
use std::num::NonZeroU32;

/// A 1-indexed page number. Page zero cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Page(NonZeroU32);

impl Page {
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    /// Returns `None` for zero.
    #[must_use]
    pub const fn new(page: u32) -> Option<Self> {
        match NonZeroU32::new(page) {
            Some(page) => Some(Self(page)),
            None => None,
        }
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// The following page. Saturates at `u32::MAX`.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// The preceding page, or `None` on the first page.
    #[must_use]
    pub const fn prev(self) -> Option<Self> {
        Self::new(self.get() - 1)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A user as shown in the list. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Creation date, already formatted for display.
    pub created_at: String,
}

/// One page of users plus the size of the whole collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserListResult {
    /// In server order.
    pub users: Vec<User>,
    /// Total users across all pages. Never less than `users.len()`.
    pub total_count: u64,
}

impl UserListResult {
    /// Number of pages needed to show `total_count` users, `page_size` at a time.
    #[must_use]
    pub fn total_pages(&self, page_size: NonZeroU32) -> u64 {
        self.total_count.div_ceil(u64::from(page_size.get()))
    }

    /// Whether `page` is past the last page.
    #[must_use]
    pub fn is_past_end(&self, page: Page, page_size: NonZeroU32) -> bool {
        u64::from(page.get()) > self.total_pages(page_size)
    }
}

/// Validated input for creating a user. Only these three fields reach the server.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
