use serde::{Deserialize, Serialize};

use crate::model::validation::FieldErrors;
use crate::model::{EntityKind, GraphEntity, Identifier};

/// Field holding the identity-provider subject of a user.
pub const SUB_FIELD: &str = "sub";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketUser {
    pub uuid: Identifier,
    pub first_name: String,
    pub last_name: String,
    pub screen_name: Option<String>,
    pub email: String,
    /// Subject claim issued by the identity provider for this user.
    pub sub: String,
}

impl GraphEntity for MarketUser {
    const KIND: EntityKind = EntityKind::MarketUser;
    const SORTABLE_FIELDS: &'static [&'static str] =
        &["uuid", "firstName", "lastName", "screenName", "email"];
    const DEFAULT_SORT: &'static str = "lastName.asc";

    fn id(&self) -> &Identifier {
        &self.uuid
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarketUserDraft {
    pub uuid: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub screen_name: Option<String>,
    pub email: Option<String>,
    pub sub: Option<String>,
}

impl MarketUserDraft {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = FieldErrors::new();
        errors.not_blank("firstName", &self.first_name);
        errors.max_len("firstName", &self.first_name, 100);
        errors.not_blank("lastName", &self.last_name);
        errors.max_len("lastName", &self.last_name, 100);
        errors.max_len("screenName", &self.screen_name, 20);
        errors.not_blank("email", &self.email);
        errors.max_len("email", &self.email, 100);
        errors.email("email", &self.email);
        errors.not_blank(SUB_FIELD, &self.sub);
        errors.into_vec()
    }
}
