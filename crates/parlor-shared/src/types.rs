use serde::{Deserialize, Serialize};

/// Domain suffix appended to bare user names that carry no `@`.
///
/// Room identifiers bake the normalized form in, so this value must never
/// change once a data directory exists.
pub const DEFAULT_DOMAIN: &str = "parlor.local";

// User identity = email address (stored as typed, not parsed)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical form used for room identity: bare names (no `@`) get the
    /// default domain suffix.  Case is deliberately left untouched; legacy
    /// case mismatches are handled by the store's repair pass.
    pub fn normalized(&self) -> UserId {
        if self.0.contains('@') {
            self.clone()
        } else {
            UserId(format!("{}@{}", self.0, DEFAULT_DOMAIN))
        }
    }

    /// ASCII-case-insensitive comparison of normalized forms.
    pub fn eq_ignore_case(&self, other: &UserId) -> bool {
        self.normalized()
            .0
            .eq_ignore_ascii_case(&other.normalized().0)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Canonical identifier of a two-party conversation.
///
/// Built by joining the byte-ordinally smaller normalized participant with
/// the larger one, separated by `_`.  The construction is commutative, so
/// both participants derive the same id no matter who opens the room first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
    /// Derive the canonical room id for a pair of users.
    ///
    /// `for_pair(a, b) == for_pair(b, a)` for all inputs, and repeated calls
    /// on the same pair always yield the same string.
    pub fn for_pair(a: &UserId, b: &UserId) -> Self {
        let a = a.normalized();
        let b = b.normalized();
        if a.as_str() <= b.as_str() {
            Self(format!("{}_{}", a, b))
        } else {
            Self(format!("{}_{}", b, a))
        }
    }

    /// Wrap a raw id read from a manifest or a file stem.  No validation is
    /// applied; legacy data may carry non-canonical spellings.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the id back into its two participants.
    ///
    /// Returns `None` unless the id splits into exactly two pieces.  User
    /// identifiers that themselves contain `_` break this derivation; the
    /// limitation is inherited from the on-disk naming scheme.
    pub fn participants(&self) -> Option<(UserId, UserId)> {
        let parts: Vec<&str> = self.0.split('_').collect();
        match parts.as_slice() {
            [a, b] if !a.is_empty() && !b.is_empty() => {
                Some((UserId::new(*a), UserId::new(*b)))
            }
            _ => None,
        }
    }

    /// Case-insensitive membership test, used by repair and orphan scans.
    pub fn involves(&self, user: &UserId) -> bool {
        self.participants()
            .map(|(a, b)| a.eq_ignore_case(user) || b.eq_ignore_case(user))
            .unwrap_or(false)
    }

    /// The participant that is not `user`, if `user` is a participant.
    pub fn counterpart_of(&self, user: &UserId) -> Option<UserId> {
        let (a, b) = self.participants()?;
        if a.eq_ignore_case(user) {
            Some(b)
        } else if b.eq_ignore_case(user) {
            Some(a)
        } else {
            None
        }
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_id_is_commutative() {
        let a = UserId::new("alice@x.com");
        let b = UserId::new("bob@y.com");
        assert_eq!(RoomId::for_pair(&a, &b), RoomId::for_pair(&b, &a));
    }

    #[test]
    fn room_id_is_stable() {
        let a = UserId::new("alice@x.com");
        let b = UserId::new("bob@y.com");
        let first = RoomId::for_pair(&a, &b);
        let second = RoomId::for_pair(&a, &b);
        assert_eq!(first.as_str(), second.as_str());
        assert_eq!(first.as_str(), "alice@x.com_bob@y.com");
    }

    #[test]
    fn bare_names_get_the_default_domain() {
        let a = UserId::new("alice");
        let b = UserId::new("bob@y.com");
        let id = RoomId::for_pair(&a, &b);
        assert_eq!(id.as_str(), "alice@parlor.local_bob@y.com");
    }

    #[test]
    fn normalization_is_idempotent() {
        let a = UserId::new("alice");
        assert_eq!(a.normalized(), a.normalized().normalized());
    }

    #[test]
    fn participants_round_trip() {
        let a = UserId::new("alice@x.com");
        let b = UserId::new("bob@y.com");
        let id = RoomId::for_pair(&a, &b);
        let (p1, p2) = id.participants().unwrap();
        assert_eq!(p1, a);
        assert_eq!(p2, b);
    }

    #[test]
    fn participants_reject_malformed_ids() {
        assert!(RoomId::from_raw("no-separator").participants().is_none());
        assert!(RoomId::from_raw("a_b_c").participants().is_none());
        assert!(RoomId::from_raw("_trailing").participants().is_none());
    }

    #[test]
    fn involves_ignores_case() {
        let id = RoomId::from_raw("Alice@x.com_bob@y.com");
        assert!(id.involves(&UserId::new("alice@X.COM")));
        assert!(id.involves(&UserId::new("BOB@y.com")));
        assert!(!id.involves(&UserId::new("carol@z.com")));
    }

    #[test]
    fn counterpart_resolution() {
        let id = RoomId::from_raw("alice@x.com_bob@y.com");
        let other = id.counterpart_of(&UserId::new("ALICE@x.com")).unwrap();
        assert_eq!(other.as_str(), "bob@y.com");
        assert!(id.counterpart_of(&UserId::new("carol@z.com")).is_none());
    }
}
