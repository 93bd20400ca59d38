use chrono::Utc;
use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{CatalogError, CatalogResult, KindConflict};
use crate::logic::id_generator::IdGenerator;
use crate::logic::patch::{apply_patch_as, parse_patch};
use crate::logic::resource::Resource;
use crate::model::{
    GraphEntity, Identifier, ListParams, MarketUser, Page, PageRequest, RelationDef, SUB_FIELD,
};
use crate::store::{Repository, Store};

/// Result of a PUT: whether the identifier was new or already stored.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Created(T),
    Updated(T),
}

/// Drives create, replace, patch, delete and reads for every [`Resource`].
///
/// Node writes and edge writes are separate store calls. A failure between
/// deleting an old edge and creating its replacement leaves the entity
/// without that relationship, never with two.
pub struct ResourceService<S: Store> {
    repo: Repository<S>,
    ids: Arc<IdGenerator>,
}

impl<S: Store> Clone for ResourceService<S> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            ids: Arc::clone(&self.ids),
        }
    }
}

fn not_found<E: GraphEntity>(id: &Identifier) -> CatalogError {
    CatalogError::NotFound {
        entity: E::KIND.label(),
        id: id.to_string(),
    }
}

fn check<E: Resource>(draft: &E::Draft) -> CatalogResult<()> {
    let errors = E::validate(draft);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::Validation(errors))
    }
}

/// Requested targets for every relation of `E`, in `E::RELATIONS` order.
fn requested_links<E: Resource>(draft: &E::Draft) -> Vec<Vec<String>> {
    E::RELATIONS
        .iter()
        .map(|relation| {
            let mut targets = E::requested(draft, relation);
            if !relation.many {
                targets.truncate(1);
            }
            targets
        })
        .collect()
}

fn differs(current: &[Identifier], requested: &[String]) -> bool {
    current.len() != requested.len()
        || current.iter().zip(requested).any(|(c, r)| c.as_str() != r)
}

impl<S: Store> ResourceService<S> {
    pub fn new(store: Arc<S>, ids: Arc<IdGenerator>) -> Self {
        Self {
            repo: Repository::new(store),
            ids,
        }
    }

    pub fn repository(&self) -> &Repository<S> {
        &self.repo
    }

    /// Rejects identifiers already bound to a node of another kind.
    async fn ensure_kind<E: Resource>(&self, id: &Identifier) -> CatalogResult<()> {
        match self.repo.node_kind(id).await? {
            Some(existing) if existing != E::KIND => Err(CatalogError::validation(
                KindConflict {
                    id: id.clone(),
                    existing,
                }
                .to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Replaces the outgoing edges of one relation with the resolvable part of `targets`.
    async fn relink<E: Resource>(
        &self,
        entity: &mut E,
        relation: &RelationDef,
        targets: &[String],
    ) -> CatalogResult<()> {
        let id = entity.id().clone();
        self.repo.delete_edges(&id, relation.edge).await?;

        let mut linked = Vec::new();
        for candidate in targets {
            match self.repo.resolve(candidate, relation.targets).await? {
                Some(target) if !linked.contains(&target) => {
                    self.repo.create_edge(&id, relation.edge, &target).await?;
                    linked.push(target);
                }
                Some(_) => {}
                None => warn!(
                    "{} {}: {} target {} not found, relationship left out",
                    E::KIND,
                    id,
                    relation.edge,
                    candidate
                ),
            }
        }
        entity.set_relation(relation.field, linked);
        Ok(())
    }

    async fn relink_all<E: Resource>(
        &self,
        entity: &mut E,
        links: &[Vec<String>],
        only_changed: bool,
    ) -> CatalogResult<()> {
        for (relation, targets) in E::RELATIONS.iter().zip(links) {
            if only_changed && !differs(&entity.relation(relation.field), targets) {
                continue;
            }
            self.relink(entity, relation, targets).await?;
        }
        Ok(())
    }

    /// POST: validates, assigns an identifier and stores the entity with
    /// whatever relationships resolve.
    pub async fn create<E: Resource>(&self, draft: E::Draft, actor: &str) -> CatalogResult<E> {
        check::<E>(&draft)?;
        let id = self.ids.assign_or_generate(E::KIND, E::supplied_id(&draft))?;
        self.ensure_kind::<E>(&id).await?;

        let links = requested_links::<E>(&draft);
        let mut entity = E::build(id, draft);
        entity.touch(Utc::now());
        self.repo.save(&entity).await?;
        self.relink_all(&mut entity, &links, false).await?;
        entity.load_views(&self.repo).await?;

        info!("{} {} created by {}", E::KIND, entity.id(), actor);
        Ok(entity)
    }

    /// PUT: overwrites a stored entity or creates one under the path identifier.
    ///
    /// The body is validated before the path identifier. An identifier in the
    /// body never replaces the stored one.
    pub async fn replace<E: Resource>(
        &self,
        raw_id: &str,
        draft: E::Draft,
        actor: &str,
    ) -> CatalogResult<Outcome<E>> {
        check::<E>(&draft)?;
        let id = Identifier::parse(raw_id)?;
        let links = requested_links::<E>(&draft);

        match self.repo.find_by_id::<E>(&id).await? {
            Some(mut entity) => {
                entity.overwrite(draft);
                entity.touch(Utc::now());
                self.repo.save(&entity).await?;
                self.relink_all(&mut entity, &links, true).await?;
                entity.load_views(&self.repo).await?;

                info!("{} {} replaced by {}", E::KIND, id, actor);
                Ok(Outcome::Updated(entity))
            }
            None => {
                self.ensure_kind::<E>(&id).await?;
                let mut entity = E::build(id, draft);
                entity.touch(Utc::now());
                self.repo.save(&entity).await?;
                self.relink_all(&mut entity, &links, false).await?;
                entity.load_views(&self.repo).await?;

                info!("{} {} created by {}", E::KIND, entity.id(), actor);
                Ok(Outcome::Created(entity))
            }
        }
    }

    /// PATCH: applies an RFC 6902 document to the stored entity.
    ///
    /// Only scalar fields are taken from the patched document. Relations are
    /// re-resolved when the patched references differ from the stored edges.
    pub async fn patch<E: Resource>(
        &self,
        raw_id: &str,
        document: Value,
        actor: &str,
    ) -> CatalogResult<E> {
        let id = Identifier::parse(raw_id)?;
        let Some(mut entity) = self.repo.find_by_id::<E>(&id).await? else {
            return Err(not_found::<E>(&id));
        };

        let patch = parse_patch(document)?;
        let draft: E::Draft = apply_patch_as(&patch, &entity)?;
        let links = requested_links::<E>(&draft);

        // Relations the patch left alone keep their stored state, resolved or not.
        let unchanged: Vec<&str> = E::RELATIONS
            .iter()
            .zip(&links)
            .filter(|(relation, targets)| !differs(&entity.relation(relation.field), targets))
            .map(|(relation, _)| relation.field)
            .collect();
        let errors: Vec<String> = E::validate(&draft)
            .into_iter()
            .filter(|message| {
                !unchanged
                    .iter()
                    .any(|field| message.split_once(": ").is_some_and(|(f, _)| f == *field))
            })
            .collect();
        if !errors.is_empty() {
            return Err(CatalogError::Validation(errors));
        }

        entity.overwrite(draft);
        entity.touch(Utc::now());
        self.repo.save(&entity).await?;
        self.relink_all(&mut entity, &links, true).await?;
        entity.load_views(&self.repo).await?;

        info!("{} {} patched by {}", E::KIND, id, actor);
        Ok(entity)
    }

    /// DELETE: removes the node and its edges. Returns whether anything was stored.
    pub async fn delete<E: Resource>(&self, raw_id: &str, actor: &str) -> CatalogResult<bool> {
        let id = Identifier::parse(raw_id)?;
        let deleted = self.repo.delete_by_id::<E>(&id).await?;
        if deleted {
            info!("{} {} deleted by {}", E::KIND, id, actor);
        }
        Ok(deleted)
    }

    pub async fn get<E: Resource>(&self, raw_id: &str) -> CatalogResult<E> {
        let id = Identifier::parse(raw_id)?;
        let mut entity = self
            .repo
            .find_by_id::<E>(&id)
            .await?
            .ok_or_else(|| not_found::<E>(&id))?;
        entity.load_views(&self.repo).await?;
        Ok(entity)
    }

    pub async fn list<E: Resource>(&self, params: &ListParams) -> CatalogResult<Page<E>> {
        let request = PageRequest::from_params(params, E::DEFAULT_SORT, E::SORTABLE_FIELDS)
            .map_err(CatalogError::Validation)?;
        let mut page = self.repo.find_all::<E>(&request).await?;
        for entity in &mut page.content {
            entity.load_views(&self.repo).await?;
        }
        Ok(page)
    }

    /// Looks a user up by the identity-provider subject.
    pub async fn user_by_subject(&self, subject: &str) -> CatalogResult<MarketUser> {
        let users = self
            .repo
            .find_by_property::<MarketUser>(SUB_FIELD, &Value::String(subject.to_string()))
            .await?;
        users.into_iter().next().ok_or_else(|| CatalogError::NotFound {
            entity: MarketUser::KIND.label(),
            id: subject.to_string(),
        })
    }
}
