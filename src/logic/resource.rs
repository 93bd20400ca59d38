use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::{
    reference_targets, EdgeType, GraphEntity, Identifier, MarketService, MarketServiceDraft,
    MarketUser, MarketUserDraft, Organization, OrganizationDraft, RelationDef, ServiceProvider,
    ServiceProviderDraft, CONTACT_PERSONS_FIELD, ORGANIZATION_FIELD, PROVIDED_BY_FIELD,
};
use crate::store::{Repository, Store};

/// Binds an entity to its request body and to the parts of the mutation
/// protocol that differ per entity.
#[async_trait::async_trait]
pub trait Resource: GraphEntity {
    type Draft: Serialize + DeserializeOwned + Default + Send + Sync + 'static;

    /// Path segment of the collection under the API base path.
    const COLLECTION: &'static str;

    fn validate(draft: &Self::Draft) -> Vec<String>;

    fn supplied_id(draft: &Self::Draft) -> Option<&str>;

    /// Raw target identifiers the draft names for `relation`.
    fn requested(_draft: &Self::Draft, _relation: &RelationDef) -> Vec<String> {
        Vec::new()
    }

    /// Builds a new entity from a validated draft. Relation fields start empty.
    fn build(id: Identifier, draft: Self::Draft) -> Self;

    /// Replaces every mutable scalar field. Identifier and relations are kept.
    fn overwrite(&mut self, draft: Self::Draft);

    /// Server-owned bookkeeping applied before every write.
    fn touch(&mut self, _now: DateTime<Utc>) {}

    /// Fills read-time views that are derived from other nodes.
    async fn load_views<S: Store>(&mut self, _repo: &Repository<S>) -> anyhow::Result<()> {
        Ok(())
    }
}

fn push_unique(list: &mut Vec<Identifier>, items: Vec<Identifier>) {
    for item in items {
        if !list.contains(&item) {
            list.push(item);
        }
    }
}

#[async_trait::async_trait]
impl Resource for Organization {
    type Draft = OrganizationDraft;
    const COLLECTION: &'static str = "organizations";

    fn validate(draft: &OrganizationDraft) -> Vec<String> {
        draft.validate()
    }

    fn supplied_id(draft: &OrganizationDraft) -> Option<&str> {
        draft.uuid.as_deref()
    }

    fn build(id: Identifier, draft: OrganizationDraft) -> Self {
        Organization {
            uuid: id,
            name: draft.name.unwrap_or_default(),
            abbreviation: draft.abbreviation,
            img: draft.img,
            url: draft.url.unwrap_or_default(),
            service_list: Vec::new(),
            contact_persons: Vec::new(),
        }
    }

    fn overwrite(&mut self, draft: OrganizationDraft) {
        self.name = draft.name.unwrap_or_default();
        self.abbreviation = draft.abbreviation;
        self.img = draft.img;
        self.url = draft.url.unwrap_or_default();
    }

    async fn load_views<S: Store>(&mut self, repo: &Repository<S>) -> anyhow::Result<()> {
        let providers = repo.sources_of(EdgeType::PartOf, &self.uuid).await?;

        let mut services = repo.sources_of(EdgeType::ProvidedBy, &self.uuid).await?;
        let mut contacts = Vec::new();
        for provider in &providers {
            push_unique(&mut services, repo.sources_of(EdgeType::ProvidedBy, provider).await?);
            push_unique(&mut contacts, repo.targets_of(provider, EdgeType::Has).await?);
        }

        self.service_list = services;
        self.contact_persons = contacts;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Resource for ServiceProvider {
    type Draft = ServiceProviderDraft;
    const COLLECTION: &'static str = "serviceProviders";

    fn validate(draft: &ServiceProviderDraft) -> Vec<String> {
        draft.validate()
    }

    fn supplied_id(draft: &ServiceProviderDraft) -> Option<&str> {
        draft.uuid.as_deref()
    }

    fn requested(draft: &ServiceProviderDraft, relation: &RelationDef) -> Vec<String> {
        match relation.field {
            ORGANIZATION_FIELD => reference_targets(&draft.organization),
            CONTACT_PERSONS_FIELD => reference_targets(draft.contact_persons.iter().flatten()),
            _ => Vec::new(),
        }
    }

    fn build(id: Identifier, _draft: ServiceProviderDraft) -> Self {
        ServiceProvider {
            uuid: id,
            organization: None,
            service_list: Vec::new(),
            contact_persons: Vec::new(),
        }
    }

    // A provider has no scalar fields of its own.
    fn overwrite(&mut self, _draft: ServiceProviderDraft) {}

    async fn load_views<S: Store>(&mut self, repo: &Repository<S>) -> anyhow::Result<()> {
        self.service_list = repo.sources_of(EdgeType::ProvidedBy, &self.uuid).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Resource for MarketService {
    type Draft = MarketServiceDraft;
    const COLLECTION: &'static str = "services";

    fn validate(draft: &MarketServiceDraft) -> Vec<String> {
        draft.validate()
    }

    fn supplied_id(draft: &MarketServiceDraft) -> Option<&str> {
        draft.uuid.as_deref()
    }

    fn requested(draft: &MarketServiceDraft, relation: &RelationDef) -> Vec<String> {
        match relation.field {
            PROVIDED_BY_FIELD => reference_targets(&draft.provided_by),
            _ => Vec::new(),
        }
    }

    fn build(id: Identifier, draft: MarketServiceDraft) -> Self {
        let lifecycle_status = draft.status();
        MarketService {
            uuid: id,
            name: draft.name.unwrap_or_default(),
            description: draft.description,
            url: draft.url,
            created: None,
            last_modified: None,
            lifecycle_status,
            authentication: draft.authentication,
            provided_by: None,
        }
    }

    fn overwrite(&mut self, draft: MarketServiceDraft) {
        self.lifecycle_status = draft.status();
        self.name = draft.name.unwrap_or_default();
        self.description = draft.description;
        self.url = draft.url;
        self.authentication = draft.authentication;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        if self.created.is_none() {
            self.created = Some(now);
        }
        self.last_modified = Some(now);
    }
}

#[async_trait::async_trait]
impl Resource for MarketUser {
    type Draft = MarketUserDraft;
    const COLLECTION: &'static str = "users";

    fn validate(draft: &MarketUserDraft) -> Vec<String> {
        draft.validate()
    }

    fn supplied_id(draft: &MarketUserDraft) -> Option<&str> {
        draft.uuid.as_deref()
    }

    fn build(id: Identifier, draft: MarketUserDraft) -> Self {
        MarketUser {
            uuid: id,
            first_name: draft.first_name.unwrap_or_default(),
            last_name: draft.last_name.unwrap_or_default(),
            screen_name: draft.screen_name,
            email: draft.email.unwrap_or_default(),
            sub: draft.sub.unwrap_or_default(),
        }
    }

    fn overwrite(&mut self, draft: MarketUserDraft) {
        self.first_name = draft.first_name.unwrap_or_default();
        self.last_name = draft.last_name.unwrap_or_default();
        self.screen_name = draft.screen_name;
        self.email = draft.email.unwrap_or_default();
        self.sub = draft.sub.unwrap_or_default();
    }
}
