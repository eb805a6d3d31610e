//! Authorization policy: pure predicates the handlers consult before any
//! mutation. A false result never raises an error here; the caller decides
//! the HTTP-level outcome (redirect, 404).

/// A post may be edited only by its author.
pub fn can_edit_post(user_id: i64, post_author_id: i64) -> bool {
    user_id == post_author_id
}

/// A reader may follow any author except themselves.
pub fn can_follow(user_id: i64, author_id: i64) -> bool {
    user_id != author_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_may_edit_own_post() {
        assert!(can_edit_post(7, 7));
    }

    #[test]
    fn non_author_may_not_edit() {
        assert!(!can_edit_post(8, 7));
    }

    #[test]
    fn following_another_author_is_allowed() {
        assert!(can_follow(1, 2));
    }

    #[test]
    fn self_follow_is_rejected() {
        assert!(!can_follow(5, 5));
    }
}
