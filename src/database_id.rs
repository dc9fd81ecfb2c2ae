//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// Identifies the user a conversation belongs to, e.g. a chat ID.
pub type UserId = i64;
