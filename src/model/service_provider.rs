use serde::{Deserialize, Serialize};

use crate::model::graph::{EdgeType, Reference, RelationDef};
use crate::model::validation::FieldErrors;
use crate::model::{EntityKind, GraphEntity, Identifier};

pub const ORGANIZATION_FIELD: &str = "organization";
pub const CONTACT_PERSONS_FIELD: &str = "contactPersons";

/// The part of an organization that operates services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProvider {
    pub uuid: Identifier,
    /// `PART_OF` target. `None` when the referenced organization could not be resolved.
    pub organization: Option<Identifier>,
    /// Services `PROVIDED_BY` this provider; read-time view.
    #[serde(default)]
    pub service_list: Vec<Identifier>,
    #[serde(default)]
    pub contact_persons: Vec<Identifier>,
}

impl GraphEntity for ServiceProvider {
    const KIND: EntityKind = EntityKind::ServiceProvider;
    const RELATIONS: &'static [RelationDef] = &[
        RelationDef {
            field: ORGANIZATION_FIELD,
            edge: EdgeType::PartOf,
            targets: &[EntityKind::Organization],
            many: false,
        },
        RelationDef {
            field: CONTACT_PERSONS_FIELD,
            edge: EdgeType::Has,
            targets: &[EntityKind::MarketUser],
            many: true,
        },
    ];
    const TRANSIENT_FIELDS: &'static [&'static str] = &["serviceList"];
    const SORTABLE_FIELDS: &'static [&'static str] = &["uuid"];
    const DEFAULT_SORT: &'static str = "uuid.asc";

    fn id(&self) -> &Identifier {
        &self.uuid
    }

    fn relation(&self, field: &str) -> Vec<Identifier> {
        match field {
            ORGANIZATION_FIELD => self.organization.iter().cloned().collect(),
            CONTACT_PERSONS_FIELD => self.contact_persons.clone(),
            _ => Vec::new(),
        }
    }

    fn set_relation(&mut self, field: &str, targets: Vec<Identifier>) {
        match field {
            ORGANIZATION_FIELD => self.organization = targets.into_iter().next(),
            CONTACT_PERSONS_FIELD => self.contact_persons = targets,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceProviderDraft {
    pub uuid: Option<String>,
    pub organization: Option<Reference>,
    pub contact_persons: Option<Vec<Reference>>,
}

impl ServiceProviderDraft {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = FieldErrors::new();
        errors.not_null(ORGANIZATION_FIELD, &self.organization);
        errors.into_vec()
    }
}
