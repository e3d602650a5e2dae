//! Credential storage.

use rusqlite::{Connection, OptionalExtension};

use crate::{constraint, Result};

/// Stored credentials for one account.
#[derive(Debug, Clone)]
pub struct AccountRow {
    pub user_id: String,
    pub email: String,
    pub password_salt: Vec<u8>,
    pub password_hash: Vec<u8>,
    pub created_at: u64,
}

/// Insert a new account. The email is stored as given; callers normalize it.
pub fn insert(
    conn: &Connection,
    user_id: &str,
    email: &str,
    password_salt: &[u8],
    password_hash: &[u8],
    created_at: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO accounts (user_id, email, password_salt, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![user_id, email, password_salt, password_hash, created_at as i64],
    )
    .map_err(|e| constraint(e, "email already registered"))?;
    Ok(())
}

/// Look up an account by email.
pub fn get_by_email(conn: &Connection, email: &str) -> Result<Option<AccountRow>> {
    let row = conn
        .query_row(
            "SELECT user_id, email, password_salt, password_hash, created_at
             FROM accounts WHERE email = ?1",
            [email],
            |row| {
                Ok(AccountRow {
                    user_id: row.get(0)?,
                    email: row.get(1)?,
                    password_salt: row.get(2)?,
                    password_hash: row.get(3)?,
                    created_at: row.get::<_, i64>(4)? as u64,
                })
            },
        )
        .optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbError;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_insert_and_get() {
        let conn = test_db();
        insert(&conn, "u1", "a@example.com", &[1u8; 16], &[2u8; 32], 100).expect("insert");

        let row = get_by_email(&conn, "a@example.com")
            .expect("query")
            .expect("present");
        assert_eq!(row.user_id, "u1");
        assert_eq!(row.password_salt, vec![1u8; 16]);
        assert_eq!(row.password_hash, vec![2u8; 32]);
        assert!(get_by_email(&conn, "b@example.com").expect("query").is_none());
    }

    #[test]
    fn test_duplicate_email() {
        let conn = test_db();
        insert(&conn, "u1", "a@example.com", &[1u8; 16], &[2u8; 32], 100).expect("insert");
        let err = insert(&conn, "u2", "a@example.com", &[1u8; 16], &[2u8; 32], 100);
        assert!(matches!(err, Err(DbError::Constraint(_))));
    }
}
