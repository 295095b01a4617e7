//! Errors raised by the persistence layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A lookup or write addressed a row that does not exist. Carries the
    /// table name.
    #[error("no matching row in {0}")]
    NotFound(&'static str),

    #[error("could not apply schema migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    /// `true` for [`DbError::NotFound`], whichever table it came from.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_table() {
        let err = DbError::NotFound("tasks");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "no matching row in tasks");
        assert!(!DbError::Sqlx(sqlx::Error::RowNotFound).is_not_found());
    }
}
