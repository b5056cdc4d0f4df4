use std::fmt;

/// A composite cache key such as `["users", 2]`.
///
/// Keys are compared segment by segment, so `users` is a prefix of `users:2`
/// but not of `users2` or `usersettings:1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    /// Starts a key with a namespace tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(vec![tag.into()])
    }

    /// Appends a segment.
    #[must_use]
    pub fn with(mut self, segment: impl fmt::Display) -> Self {
        self.0.push(segment.to_string());
        self
    }

    /// Returns `true` if every segment of `prefix` matches the start of this key.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// The key's segments in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(":"))
    }
}

impl From<&str> for QueryKey {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}
