use uuid::Uuid;

/// Length of a revision ID in characters.
pub const REVISION_ID_LEN: usize = 8;

/// Generate a fresh revision ID: the last eight hex characters of a random UUID.
///
/// Revision IDs are random rather than content-derived, so identical bytes
/// uploaded to two different specs still get independent histories.
pub fn new_revision_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[id.len() - REVISION_ID_LEN..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_ids_are_lowercase_hex() {
        let id = new_revision_id();
        assert_eq!(id.len(), REVISION_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn revision_ids_differ() {
        assert_ne!(new_revision_id(), new_revision_id());
    }
}
