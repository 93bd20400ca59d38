use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::IdentifierError;

/// Closed registry of identifier prefixes.
pub const REGISTERED_PREFIXES: [&str; 3] = ["org", "usr", "svc"];

/// Length of the canonical dashed UUID text.
const UUID_TEXT_LEN: usize = 36;

/// The entity types stored in the catalog graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Organization,
    ServiceProvider,
    MarketService,
    MarketUser,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Organization,
        EntityKind::ServiceProvider,
        EntityKind::MarketService,
        EntityKind::MarketUser,
    ];

    /// Identifier prefix bound to this kind. Services and providers share `svc`.
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Organization => "org",
            EntityKind::MarketUser => "usr",
            EntityKind::MarketService | EntityKind::ServiceProvider => "svc",
        }
    }

    /// Node label used by the graph stores.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Organization => "Organization",
            EntityKind::ServiceProvider => "ServiceProvider",
            EntityKind::MarketService => "MarketService",
            EntityKind::MarketUser => "MarketUser",
        }
    }

    /// Lower-case name used in client-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Organization => "organization",
            EntityKind::ServiceProvider => "serviceProvider",
            EntityKind::MarketService => "marketService",
            EntityKind::MarketUser => "user",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| IdentifierError::UnknownKind(s.to_string()))
    }
}

pub fn is_registered_prefix(prefix: &str) -> bool {
    REGISTERED_PREFIXES.contains(&prefix)
}

/// Checks `<registered-prefix>-<uuid-text>` with a positive UUID version.
///
/// Never panics; any malformed input is simply rejected.
pub fn is_valid(candidate: &str) -> bool {
    let Some((prefix, suffix)) = candidate.split_once('-') else {
        return false;
    };
    if !is_registered_prefix(prefix) || suffix.len() != UUID_TEXT_LEN {
        return false;
    }
    match Uuid::parse_str(suffix) {
        Ok(uuid) => uuid.get_version_num() > 0,
        Err(_) => false,
    }
}

/// An entity-typed identifier such as `org-2f1c4b6e-0b9a-11ef-8a3d-5f2b9c7d1e40`.
///
/// Only constructed from validated text, so every instance satisfies [`is_valid`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    pub fn parse(candidate: &str) -> Result<Self, IdentifierError> {
        if is_valid(candidate) {
            Ok(Self(candidate.to_string()))
        } else {
            Err(IdentifierError::Invalid(candidate.to_string()))
        }
    }

    pub(crate) fn from_parts(prefix: &str, uuid: Uuid) -> Self {
        Self(format!("{}-{}", prefix, uuid.hyphenated()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> &str {
        self.0.split_once('-').map(|(p, _)| p).unwrap_or_default()
    }

    /// Whether this identifier may name an entity of `kind`.
    pub fn fits(&self, kind: EntityKind) -> bool {
        self.prefix() == kind.prefix()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(IdentifierError::Invalid(value))
        }
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identifier::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V1_TEXT: &str = "1b4e28ba-2fa1-11d2-883f-0016d3cca427";

    #[test]
    fn test_registered_prefixes_are_accepted() {
        for prefix in REGISTERED_PREFIXES {
            assert!(is_valid(&format!("{}-{}", prefix, V1_TEXT)));
        }
    }

    #[test]
    fn test_malformed_candidates_are_rejected() {
        let candidates = [
            "",
            "org",
            "org-",
            "-1b4e28ba-2fa1-11d2-883f-0016d3cca427",
            "abc-1b4e28ba-2fa1-11d2-883f-0016d3cca427",
            "ORG-1b4e28ba-2fa1-11d2-883f-0016d3cca427",
            "org1b4e28ba-2fa1-11d2-883f-0016d3cca427",
            "org-1b4e28ba2fa111d2883f0016d3cca427",
            "org-{1b4e28ba-2fa1-11d2-883f-0016d3cca427}",
            "org-1b4e28ba-2fa1-11d2-883f-0016d3cca42z",
            "org-00000000-0000-0000-0000-000000000000",
            "org-org-1b4e28ba-2fa1-11d2-883f-0016d3cca4",
            "42",
        ];
        for candidate in candidates {
            assert!(!is_valid(candidate), "{candidate:?} should be invalid");
            assert!(Identifier::parse(candidate).is_err());
        }
    }

    #[test]
    fn test_any_positive_version_is_valid() {
        let v4 = Uuid::new_v4();
        assert!(is_valid(&format!("usr-{}", v4.hyphenated())));
    }

    #[test]
    fn test_identifier_serde_validates() {
        let text = format!("\"svc-{}\"", V1_TEXT);
        let id: Identifier = serde_json::from_str(&text).unwrap();
        assert_eq!(id.prefix(), "svc");
        assert!(id.fits(EntityKind::MarketService));
        assert!(id.fits(EntityKind::ServiceProvider));
        assert!(!id.fits(EntityKind::Organization));
        assert_eq!(serde_json::to_string(&id).unwrap(), text);

        assert!(serde_json::from_str::<Identifier>("\"svc-nope\"").is_err());
    }

    #[test]
    fn test_kind_labels_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
            assert!(is_registered_prefix(kind.prefix()));
        }
        assert!(matches!(
            "Image".parse::<EntityKind>(),
            Err(IdentifierError::UnknownKind(_))
        ));
    }
}
