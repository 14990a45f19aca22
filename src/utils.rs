//! Utility functions for the arena service

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::MatchId;

/// Prefix carried by every generated user id
pub const USER_ID_PREFIX: &str = "ARNG-";

/// Generate a new user ID: "ARNG-" followed by 8 uppercase alphanumerics
pub fn generate_user_id() -> String {
    let token: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect();
    format!("{}{}", USER_ID_PREFIX, token.to_uppercase())
}

/// Generate a new unique match ID
pub fn generate_match_id() -> MatchId {
    Uuid::new_v4()
}

/// Default display name for a fresh user: "player_" + last 4 of the id
pub fn default_username(user_id: &str) -> String {
    let tail_start = user_id.len().saturating_sub(4);
    format!("player_{}", &user_id[tail_start..])
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_ids() {
        let id1 = generate_user_id();
        let id2 = generate_user_id();
        assert_ne!(id1, id2);

        let match_id1 = generate_match_id();
        let match_id2 = generate_match_id();
        assert_ne!(match_id1, match_id2);
    }

    #[test]
    fn test_user_id_format() {
        let id = generate_user_id();
        assert!(id.starts_with(USER_ID_PREFIX));
        assert_eq!(id.len(), USER_ID_PREFIX.len() + 8);

        let token = &id[USER_ID_PREFIX.len()..];
        assert!(token
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_default_username() {
        assert_eq!(default_username("ARNG-7F3A9B2C"), "player_9B2C");
        assert_eq!(default_username("AB"), "player_AB");
    }
}
