use serde::{Deserialize, Serialize};

use crate::model::validation::FieldErrors;
use crate::model::{EntityKind, GraphEntity, Identifier};

/// A Helmholtz centre or other institution offering services on the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub uuid: Identifier,
    pub name: String,
    pub abbreviation: Option<String>,
    /// Logo, either a web address or an embedded encoding.
    pub img: Option<String>,
    pub url: String,
    /// Services provided by the organization directly or through its providers.
    #[serde(default)]
    pub service_list: Vec<Identifier>,
    /// Contact users of the organization's service providers.
    #[serde(default)]
    pub contact_persons: Vec<Identifier>,
}

impl GraphEntity for Organization {
    const KIND: EntityKind = EntityKind::Organization;
    const TRANSIENT_FIELDS: &'static [&'static str] = &["serviceList", "contactPersons"];
    const SORTABLE_FIELDS: &'static [&'static str] = &["uuid", "name", "abbreviation", "url"];
    const DEFAULT_SORT: &'static str = "name.asc";

    fn id(&self) -> &Identifier {
        &self.uuid
    }
}

/// Organization request body. Every field is optional so that missing values
/// can be reported as field errors instead of a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrganizationDraft {
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    pub img: Option<String>,
    pub url: Option<String>,
}

impl OrganizationDraft {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = FieldErrors::new();
        errors.required("name", &self.name);
        if errors.not_null("url", &self.url) {
            errors.url("url", &self.url);
        }
        errors.into_vec()
    }
}
