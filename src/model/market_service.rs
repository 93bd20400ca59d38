use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::graph::{EdgeType, Reference, RelationDef};
use crate::model::validation::FieldErrors;
use crate::model::{EntityKind, GraphEntity, Identifier};

pub const PROVIDED_BY_FIELD: &str = "providedBy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    Requested,
    Planned,
    InCreation,
    Testing,
    Production,
    Deprecated,
    Unsupported,
    Discontinued,
}

impl LifecycleStatus {
    pub const ALL: [LifecycleStatus; 8] = [
        LifecycleStatus::Requested,
        LifecycleStatus::Planned,
        LifecycleStatus::InCreation,
        LifecycleStatus::Testing,
        LifecycleStatus::Production,
        LifecycleStatus::Deprecated,
        LifecycleStatus::Unsupported,
        LifecycleStatus::Discontinued,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleStatus::Requested => "REQUESTED",
            LifecycleStatus::Planned => "PLANNED",
            LifecycleStatus::InCreation => "IN_CREATION",
            LifecycleStatus::Testing => "TESTING",
            LifecycleStatus::Production => "PRODUCTION",
            LifecycleStatus::Deprecated => "DEPRECATED",
            LifecycleStatus::Unsupported => "UNSUPPORTED",
            LifecycleStatus::Discontinued => "DISCONTINUED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

/// RFC 3339 with nine fractional digits, so stored text sorts in time order.
mod fixed_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Nanos, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<DateTime<Utc>>::deserialize(deserializer)
    }
}

/// A service offered on the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketService {
    pub uuid: Identifier,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    #[serde(default, with = "fixed_timestamp")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, with = "fixed_timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
    pub lifecycle_status: Option<LifecycleStatus>,
    /// How users log in to the service, e.g. "Helmholtz AAI".
    pub authentication: Option<String>,
    /// `PROVIDED_BY` target: a service provider or an organization.
    pub provided_by: Option<Identifier>,
}

impl GraphEntity for MarketService {
    const KIND: EntityKind = EntityKind::MarketService;
    const RELATIONS: &'static [RelationDef] = &[RelationDef {
        field: PROVIDED_BY_FIELD,
        edge: EdgeType::ProvidedBy,
        targets: &[EntityKind::ServiceProvider, EntityKind::Organization],
        many: false,
    }];
    const SORTABLE_FIELDS: &'static [&'static str] = &[
        "uuid",
        "name",
        "description",
        "url",
        "created",
        "lastModified",
        "lifecycleStatus",
    ];
    const DEFAULT_SORT: &'static str = "name.asc";

    fn id(&self) -> &Identifier {
        &self.uuid
    }

    fn relation(&self, field: &str) -> Vec<Identifier> {
        match field {
            PROVIDED_BY_FIELD => self.provided_by.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    fn set_relation(&mut self, field: &str, targets: Vec<Identifier>) {
        if field == PROVIDED_BY_FIELD {
            self.provided_by = targets.into_iter().next();
        }
    }
}

/// Request body for services. `created` and `lastModified` are owned by the
/// server and ignored when supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarketServiceDraft {
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub lifecycle_status: Option<String>,
    pub authentication: Option<String>,
    pub provided_by: Option<Reference>,
}

impl MarketServiceDraft {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = FieldErrors::new();
        errors.required("name", &self.name);
        errors.url("url", &self.url);
        if let Some(status) = &self.lifecycle_status {
            if LifecycleStatus::parse(status).is_none() {
                let allowed: Vec<&str> = LifecycleStatus::ALL.iter().map(|s| s.as_str()).collect();
                errors.push(
                    "lifecycleStatus",
                    &format!("must be one of [{}]", allowed.join(", ")),
                );
            }
        }
        errors.not_null(PROVIDED_BY_FIELD, &self.provided_by);
        errors.into_vec()
    }

    /// Lifecycle status after validation has accepted the draft.
    pub fn status(&self) -> Option<LifecycleStatus> {
        self.lifecycle_status.as_deref().and_then(LifecycleStatus::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lifecycle_status_names() {
        for status in LifecycleStatus::ALL {
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                json!(status.as_str())
            );
            assert_eq!(LifecycleStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LifecycleStatus::parse("production"), None);
    }

    #[test]
    fn test_draft_validation() {
        let draft: MarketServiceDraft = serde_json::from_value(json!({
            "name": "Sync+Share",
            "url": "serviceXy.helmholtz.de",
            "lifecycleStatus": "LIVE",
            "created": "2020-02-19T00:00:00Z"
        }))
        .unwrap();
        let errors = draft.validate();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0], "url: must be a valid URL");
        assert!(errors[1].starts_with("lifecycleStatus: must be one of [REQUESTED"));
        assert_eq!(errors[2], "providedBy: must not be null");
    }

    #[test]
    fn test_valid_draft() {
        let draft: MarketServiceDraft = serde_json::from_value(json!({
            "name": "Sync+Share",
            "lifecycleStatus": "IN_CREATION",
            "providedBy": "svc-1b4e28ba-2fa1-11d2-883f-0016d3cca427"
        }))
        .unwrap();
        assert!(draft.validate().is_empty());
        assert_eq!(draft.status(), Some(LifecycleStatus::InCreation));
    }

    #[test]
    fn test_timestamps_sort_as_text() {
        let whole = "2020-02-19T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let half = whole + chrono::Duration::milliseconds(500);
        let text = |ts: DateTime<Utc>| {
            let service = MarketService {
                uuid: Identifier::parse("svc-1b4e28ba-2fa1-11d2-883f-0016d3cca427").unwrap(),
                name: "Sync+Share".to_string(),
                description: None,
                url: None,
                created: Some(ts),
                last_modified: None,
                lifecycle_status: None,
                authentication: None,
                provided_by: None,
            };
            serde_json::to_value(&service).unwrap()["created"]
                .as_str()
                .unwrap()
                .to_string()
        };

        assert_eq!(text(whole), "2020-02-19T10:00:00.000000000Z");
        assert!(text(whole) < text(half));

        let parsed: MarketService = serde_json::from_value(json!({
            "uuid": "svc-1b4e28ba-2fa1-11d2-883f-0016d3cca427",
            "name": "Sync+Share",
            "created": "2020-02-19T10:00:00.500Z"
        }))
        .unwrap();
        assert_eq!(parsed.created, Some(half));
        assert_eq!(parsed.last_modified, None);
    }
}
