//! Database query functions organized by domain.

pub mod accounts;
pub mod ad_watches;
pub mod comments;
pub mod profiles;
pub mod referrals;
pub mod rewards;
pub mod uploads;
pub mod videos;
pub mod withdrawals;

/// Seed an account and its profile. Shared by the query tests.
#[cfg(test)]
pub(crate) fn seed_user(conn: &rusqlite::Connection, user_id: &str) {
    let email = format!("{user_id}@example.com");
    accounts::insert(conn, user_id, &email, &[0u8; 16], &[0u8; 32], 1_000)
        .expect("insert account");
    profiles::insert(conn, user_id, &email, None, 1_000).expect("insert profile");
}
