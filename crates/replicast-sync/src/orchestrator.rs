use futures::future::join_all;
use replicast_protocol::{
    handler_for, prepare, AttachmentHandler, DeleteOutcome, EntityHandler, HandlerContext,
};
use replicast_types::reserved::DESTINATION_TAXONOMY;
use replicast_types::{DestinationId, EntityKind, EntityRef};
use tracing::{debug, info};

use crate::error::SyncResult;
use crate::registry::DestinationRegistry;
use crate::report::{DestinationOutcome, SyncAction, SyncOutcome, SyncReport};

/// Drives the full per-event sequence.
///
/// Within one destination the chain is strictly sequential: a dependent
/// asset is replicated and its descriptor written back before the primary
/// entity is prepared, so the primary's asset reference resolves. Across
/// destinations chains run concurrently; their id spaces are disjoint.
/// Reconciliation runs only after every chain has settled, so it always
/// observes a consistent Identity Map.
pub struct SyncOrchestrator {
    ctx: HandlerContext,
    registry: DestinationRegistry,
}

impl SyncOrchestrator {
    pub fn new(ctx: HandlerContext, registry: DestinationRegistry) -> Self {
        Self { ctx, registry }
    }

    pub fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    /// Destinations currently targeted by the entity's own site-term
    /// assignment — not by the Identity Map.
    fn targeted(&self, entity: EntityRef) -> SyncResult<Vec<DestinationId>> {
        Ok(self
            .ctx
            .terms
            .object_terms(entity)?
            .into_iter()
            .filter(|term| term.taxonomy == DESTINATION_TAXONOMY)
            .map(|term| DestinationId(term.id))
            .collect())
    }

    /// The entity's dependent asset, when it has one that must replicate
    /// first.
    fn dependency_handler(&self, entity: EntityRef) -> SyncResult<Option<AttachmentHandler>> {
        if entity.kind() != EntityKind::Post {
            return Ok(None);
        }
        let payload = self.ctx.projector.project(entity)?;
        Ok(prepare::ref_u64(&payload, "featured_media")
            .map(|id| AttachmentHandler::new(self.ctx.clone(), id)))
    }

    /// Handle a save event: replicate to every targeted destination, then
    /// reconcile destinations dropped from the target set.
    pub async fn on_save(&self, entity: EntityRef) -> SyncResult<SyncReport> {
        let targeted = self.targeted(entity)?;
        info!(entity = %entity, destinations = targeted.len(), "save event");

        let handler = handler_for(self.ctx.clone(), entity)?;
        let dependency = self.dependency_handler(entity)?;

        let saves = targeted.iter().map(|id| {
            let handler = handler.as_ref();
            let dependency = dependency.as_ref();
            async move { self.save_on(*id, handler, dependency).await }
        });
        let mut outcomes = join_all(saves).await;

        outcomes.extend(self.reconcile(entity, handler.as_ref(), &targeted).await?);
        Ok(SyncReport { entity, outcomes })
    }

    async fn save_on(
        &self,
        id: DestinationId,
        handler: &dyn EntityHandler,
        dependency: Option<&AttachmentHandler>,
    ) -> DestinationOutcome {
        let Some(destination) = self.registry.get(id) else {
            return DestinationOutcome::failed(id, SyncAction::Save, "destination not registered");
        };
        if !destination.accepts(handler.entity().kind()) {
            return DestinationOutcome::ok(id, SyncAction::Save, SyncOutcome::Skipped);
        }

        // The asset must exist on the destination before the primary
        // payload is prepared; its success callback updates the Identity
        // Map this chain reads next.
        if let Some(media) = dependency {
            if destination.accepts(EntityKind::Attachment) {
                if let Err(e) = media.handle_save(destination).await {
                    return DestinationOutcome::failed(
                        id,
                        SyncAction::Save,
                        format!("featured media: {e}"),
                    );
                }
            }
        }

        match handler.handle_save(destination).await {
            Ok(save) => {
                for (source, descriptor) in save.remote.term_descriptors() {
                    if let Err(e) =
                        self.ctx
                            .identity
                            .put(EntityRef::Term(source), id, Some(descriptor))
                    {
                        return DestinationOutcome::failed(
                            id,
                            SyncAction::Save,
                            format!("term descriptor write-back: {e}"),
                        );
                    }
                }
                let outcome = if save.created {
                    SyncOutcome::Created {
                        remote_id: save.remote.id,
                    }
                } else {
                    SyncOutcome::Updated {
                        remote_id: save.remote.id,
                    }
                };
                DestinationOutcome::ok(id, SyncAction::Save, outcome)
            }
            Err(e) => DestinationOutcome::failed(id, SyncAction::Save, e),
        }
    }

    /// Hard-delete replicas on destinations no longer targeted. This is
    /// how unchecking a destination propagates as a deletion.
    async fn reconcile(
        &self,
        entity: EntityRef,
        handler: &dyn EntityHandler,
        targeted: &[DestinationId],
    ) -> SyncResult<Vec<DestinationOutcome>> {
        let replicas = self.ctx.identity.get(entity)?;
        let stale: Vec<DestinationId> = replicas
            .destinations()
            .filter(|id| !targeted.contains(id))
            .collect();
        if stale.is_empty() {
            return Ok(Vec::new());
        }
        debug!(entity = %entity, stale = stale.len(), "reconciling dropped destinations");

        let deletes = stale.iter().map(|id| async move {
            let Some(destination) = self.registry.get(*id) else {
                return DestinationOutcome::failed(
                    *id,
                    SyncAction::Reconcile,
                    "destination not registered",
                );
            };
            match handler.handle_delete(destination, true).await {
                Ok(_) => DestinationOutcome::ok(*id, SyncAction::Reconcile, SyncOutcome::Deleted),
                Err(e) => DestinationOutcome::failed(*id, SyncAction::Reconcile, e),
            }
        });
        Ok(join_all(deletes).await)
    }

    /// Handle a trash event: soft-delete every replica.
    pub async fn on_trash(&self, entity: EntityRef) -> SyncResult<SyncReport> {
        self.remove(entity, false, SyncAction::Trash).await
    }

    /// Handle a permanent-delete event: hard-delete every replica.
    pub async fn on_delete(&self, entity: EntityRef) -> SyncResult<SyncReport> {
        self.remove(entity, true, SyncAction::Delete).await
    }

    async fn remove(
        &self,
        entity: EntityRef,
        force: bool,
        action: SyncAction,
    ) -> SyncResult<SyncReport> {
        let replicas: Vec<DestinationId> =
            self.ctx.identity.get(entity)?.destinations().collect();
        info!(entity = %entity, destinations = replicas.len(), force, "delete event");

        let handler = handler_for(self.ctx.clone(), entity)?;
        let deletes = replicas.iter().map(|id| {
            let handler = handler.as_ref();
            async move {
                let Some(destination) = self.registry.get(*id) else {
                    return DestinationOutcome::failed(*id, action, "destination not registered");
                };
                match handler.handle_delete(destination, force).await {
                    Ok(DeleteOutcome::Deleted) => {
                        DestinationOutcome::ok(*id, action, SyncOutcome::Deleted)
                    }
                    Ok(DeleteOutcome::Trashed) => {
                        DestinationOutcome::ok(*id, action, SyncOutcome::Trashed)
                    }
                    Ok(DeleteOutcome::NothingToDelete) => {
                        DestinationOutcome::ok(*id, action, SyncOutcome::Skipped)
                    }
                    Err(e) => DestinationOutcome::failed(*id, action, e),
                }
            }
        });
        Ok(SyncReport {
            entity,
            outcomes: join_all(deletes).await,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use replicast_protocol::{Method, ScriptedTransport};
    use replicast_store::{
        AssetContent, InMemoryAssetStore, InMemoryMetadataStore, InMemoryProjector,
        InMemoryTermStore, Term,
    };
    use replicast_types::{Destination, RemoteDescriptor, RemoteStatus};
    use serde_json::json;

    struct Fixture {
        terms: Arc<InMemoryTermStore>,
        assets: Arc<InMemoryAssetStore>,
        projector: Arc<InMemoryProjector>,
        transport: Arc<ScriptedTransport>,
        orchestrator: SyncOrchestrator,
    }

    fn destination(id: u64) -> Destination {
        Destination {
            id: DestinationId(id),
            base_url: format!("https://site{id}.example/wp-json/wp/v2"),
            api_key: format!("key{id}"),
            api_secret: format!("secret{id}"),
            kinds: Default::default(),
        }
    }

    fn fixture(destination_ids: &[u64]) -> Fixture {
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let terms = Arc::new(InMemoryTermStore::new());
        let assets = Arc::new(InMemoryAssetStore::new());
        let projector = Arc::new(InMemoryProjector::new());
        let transport = Arc::new(ScriptedTransport::new());
        let ctx = HandlerContext::new(
            metadata,
            terms.clone(),
            assets.clone(),
            projector.clone(),
            transport.clone(),
        );

        let mut registry = DestinationRegistry::new();
        for id in destination_ids {
            registry.register(destination(*id));
        }

        Fixture {
            terms,
            assets,
            projector,
            transport,
            orchestrator: SyncOrchestrator::new(ctx, registry),
        }
    }

    /// Assign the site term selecting `destination` to `entity`.
    fn target(f: &Fixture, entity: EntityRef, destination: u64) {
        f.terms.insert(Term {
            id: destination,
            taxonomy: DESTINATION_TAXONOMY.into(),
            name: format!("Site {destination}"),
            slug: format!("site-{destination}"),
            description: String::new(),
            parent: None,
        });
        f.terms.assign(entity, &[destination]);
    }

    fn project_post(f: &Fixture, id: u64, value: serde_json::Value) {
        f.projector.set(
            EntityRef::Post(id),
            value.as_object().cloned().unwrap_or_default(),
        );
    }

    fn identity(f: &Fixture) -> &replicast_identity::IdentityMap {
        &f.orchestrator.context().identity
    }

    #[tokio::test]
    async fn save_replicates_to_targeted_destinations() {
        let f = fixture(&[1]);
        let post = EntityRef::Post(1);
        target(&f, post, 1);
        project_post(&f, 1, json!({"id": 1, "type": "post", "title": "Hello"}));
        f.transport.respond_json(
            Method::Post,
            "site1.example",
            201,
            json!({"id": 100, "status": "publish"}),
        );

        let report = f.orchestrator.on_save(post).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(
            report.outcomes[0].result,
            Ok(SyncOutcome::Created { remote_id: 100 })
        );
        assert_eq!(
            identity(&f)
                .descriptor(post, DestinationId(1))
                .unwrap()
                .unwrap()
                .remote_id,
            100
        );
    }

    #[tokio::test]
    async fn untargeted_entity_produces_empty_report() {
        let f = fixture(&[1]);
        let post = EntityRef::Post(1);
        project_post(&f, 1, json!({"id": 1, "type": "post"}));

        let report = f.orchestrator.on_save(post).await.unwrap();
        assert!(report.outcomes.is_empty());
        assert!(f.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn featured_media_is_primed_before_the_post() {
        let f = fixture(&[1]);
        let post = EntityRef::Post(1);
        target(&f, post, 1);
        f.assets
            .insert(9, AssetContent::new("cover.jpg", "image/jpeg", vec![1, 2]));
        f.projector.set(
            EntityRef::Asset(9),
            json!({"id": 9, "type": "attachment", "status": "inherit"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        project_post(
            &f,
            1,
            json!({"id": 1, "type": "post", "title": "T", "featured_media": 9}),
        );
        f.transport.respond_json(
            Method::Post,
            "/media/",
            201,
            json!({"id": 900, "status": "publish"}),
        );
        f.transport.respond_json(
            Method::Post,
            "/posts/",
            201,
            json!({"id": 100, "status": "publish"}),
        );

        let report = f.orchestrator.on_save(post).await.unwrap();
        assert!(report.is_success());

        // Strictly sequential within the destination: media first, and the
        // post payload already carries the freshly minted asset id.
        let requests = f.transport.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].url.contains("/media/"));
        assert!(requests[1].url.contains("/posts/"));
        assert_eq!(requests[1].json_body().unwrap()["featured_media"], json!(900));

        assert_eq!(
            identity(&f)
                .descriptor(EntityRef::Asset(9), DestinationId(1))
                .unwrap()
                .unwrap()
                .remote_id,
            900
        );
    }

    #[tokio::test]
    async fn failed_media_priming_skips_the_primary() {
        let f = fixture(&[1]);
        let post = EntityRef::Post(1);
        target(&f, post, 1);
        f.assets
            .insert(9, AssetContent::new("cover.jpg", "image/jpeg", vec![1]));
        f.projector.set(
            EntityRef::Asset(9),
            json!({"id": 9, "type": "attachment"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        project_post(
            &f,
            1,
            json!({"id": 1, "type": "post", "featured_media": 9}),
        );
        f.transport.fail(Method::Post, "/media/", "connection reset");

        let report = f.orchestrator.on_save(post).await.unwrap();
        assert_eq!(report.failed(), 1);
        // The primary was never attempted; the next run retries both.
        assert_eq!(f.transport.requests().len(), 1);
        assert!(identity(&f).descriptor(post, DestinationId(1)).unwrap().is_none());
    }

    #[tokio::test]
    async fn second_save_routes_through_update() {
        let f = fixture(&[1]);
        let post = EntityRef::Post(1);
        target(&f, post, 1);
        project_post(&f, 1, json!({"id": 1, "type": "post", "title": "T"}));
        f.transport.respond_json(
            Method::Post,
            "/posts/",
            201,
            json!({"id": 100, "status": "publish"}),
        );
        f.transport.respond_json(
            Method::Put,
            "/posts/100/",
            200,
            json!({"id": 100, "status": "publish"}),
        );

        f.orchestrator.on_save(post).await.unwrap();
        let report = f.orchestrator.on_save(post).await.unwrap();
        assert_eq!(
            report.outcomes[0].result,
            Ok(SyncOutcome::Updated { remote_id: 100 })
        );
        let requests = f.transport.requests();
        assert_eq!(requests[1].method, Method::Put);
    }

    #[tokio::test]
    async fn reconciliation_deletes_dropped_destinations_only() {
        let f = fixture(&[1, 2]);
        let post = EntityRef::Post(1);
        // Previously on {1, 2}; now targeted only at {1}.
        target(&f, post, 1);
        project_post(&f, 1, json!({"id": 1, "type": "post", "title": "T"}));
        identity(&f)
            .put(
                post,
                DestinationId(1),
                Some(RemoteDescriptor::new(100, RemoteStatus::Publish)),
            )
            .unwrap();
        identity(&f)
            .put(
                post,
                DestinationId(2),
                Some(RemoteDescriptor::new(200, RemoteStatus::Publish)),
            )
            .unwrap();

        f.transport.respond_json(
            Method::Put,
            "site1.example",
            200,
            json!({"id": 100, "status": "publish"}),
        );
        f.transport.respond_json(
            Method::Delete,
            "site2.example",
            200,
            json!({"deleted": true}),
        );

        let report = f.orchestrator.on_save(post).await.unwrap();
        assert!(report.is_success());

        // Exactly one hard delete, addressed to the dropped destination.
        let deletes: Vec<_> = f
            .transport
            .requests()
            .into_iter()
            .filter(|r| r.method == Method::Delete)
            .collect();
        assert_eq!(deletes.len(), 1);
        assert!(deletes[0].url.contains("site2.example"));
        assert!(deletes[0].url.ends_with("/posts/200/"));
        assert_eq!(
            deletes[0].query,
            vec![("force".to_string(), "true".to_string())]
        );

        // Y cleared, X untouched.
        assert!(identity(&f).descriptor(post, DestinationId(2)).unwrap().is_none());
        assert_eq!(
            identity(&f)
                .descriptor(post, DestinationId(1))
                .unwrap()
                .unwrap()
                .remote_id,
            100
        );
        assert!(report
            .outcome(DestinationId(2), SyncAction::Reconcile)
            .unwrap()
            .is_ok());
    }

    #[tokio::test]
    async fn destination_failures_are_isolated() {
        let f = fixture(&[1, 2]);
        let post = EntityRef::Post(1);
        target(&f, post, 1);
        target(&f, post, 2);
        project_post(&f, 1, json!({"id": 1, "type": "post", "title": "T"}));

        f.transport.fail(Method::Post, "site1.example", "connection reset");
        f.transport.respond_json(
            Method::Post,
            "site2.example",
            201,
            json!({"id": 200, "status": "publish"}),
        );

        let report = f.orchestrator.on_save(post).await.unwrap();
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);

        assert!(identity(&f).descriptor(post, DestinationId(1)).unwrap().is_none());
        assert_eq!(
            identity(&f)
                .descriptor(post, DestinationId(2))
                .unwrap()
                .unwrap()
                .remote_id,
            200
        );

        let failed = report.outcome(DestinationId(1), SyncAction::Save).unwrap();
        assert!(failed.result.as_ref().unwrap_err().contains("connection reset"));
    }

    #[tokio::test]
    async fn nested_term_descriptors_are_persisted_from_the_response() {
        let f = fixture(&[1]);
        let post = EntityRef::Post(1);
        target(&f, post, 1);
        project_post(&f, 1, json!({"id": 1, "type": "post", "title": "T"}));
        f.transport.respond_json(
            Method::Post,
            "/posts/",
            201,
            json!({
                "id": 100,
                "status": "publish",
                "replicast": {
                    "term": [{
                        "id": 70,
                        "taxonomy_ref": 77,
                        "parent": null,
                        "taxonomy": "category",
                        "name": "News",
                        "slug": "news",
                        "source": 7
                    }]
                }
            }),
        );

        f.orchestrator.on_save(post).await.unwrap();
        let descriptor = identity(&f)
            .descriptor(EntityRef::Term(7), DestinationId(1))
            .unwrap()
            .unwrap();
        assert_eq!(descriptor.remote_id, 70);
        assert_eq!(descriptor.taxonomy_ref(), Some(77));
    }

    #[tokio::test]
    async fn unregistered_destination_is_reported_not_requested() {
        let f = fixture(&[]);
        let post = EntityRef::Post(1);
        target(&f, post, 5);
        project_post(&f, 1, json!({"id": 1, "type": "post"}));

        let report = f.orchestrator.on_save(post).await.unwrap();
        assert_eq!(report.failed(), 1);
        assert!(f.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn kind_restricted_destination_is_skipped() {
        let f = {
            let mut f = fixture(&[]);
            let mut dest = destination(1);
            dest.kinds.insert(EntityKind::Term);
            let mut registry = DestinationRegistry::new();
            registry.register(dest);
            let ctx = f.orchestrator.context().clone();
            f.orchestrator = SyncOrchestrator::new(ctx, registry);
            f
        };
        let post = EntityRef::Post(1);
        target(&f, post, 1);
        project_post(&f, 1, json!({"id": 1, "type": "post"}));

        let report = f.orchestrator.on_save(post).await.unwrap();
        assert_eq!(report.outcomes[0].result, Ok(SyncOutcome::Skipped));
        assert!(f.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn trash_event_soft_deletes_every_replica() {
        let f = fixture(&[1, 2]);
        let post = EntityRef::Post(1);
        project_post(&f, 1, json!({"id": 1, "type": "post"}));
        identity(&f)
            .put(
                post,
                DestinationId(1),
                Some(RemoteDescriptor::new(100, RemoteStatus::Publish)),
            )
            .unwrap();
        identity(&f)
            .put(
                post,
                DestinationId(2),
                Some(RemoteDescriptor::new(200, RemoteStatus::Publish)),
            )
            .unwrap();

        f.transport.respond_json(
            Method::Delete,
            "site1.example",
            200,
            json!({"id": 100, "status": "trash"}),
        );
        f.transport.respond_json(
            Method::Delete,
            "site2.example",
            200,
            json!({"id": 200, "status": "trash"}),
        );

        let report = f.orchestrator.on_trash(post).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.outcomes.len(), 2);

        for request in f.transport.requests() {
            assert_eq!(
                request.query,
                vec![("force".to_string(), "false".to_string())]
            );
        }
        // Descriptors kept, with the trashed status.
        let descriptor = identity(&f)
            .descriptor(post, DestinationId(1))
            .unwrap()
            .unwrap();
        assert!(descriptor.status.is_trashed());
    }

    #[tokio::test]
    async fn delete_event_clears_every_replica() {
        let f = fixture(&[1]);
        let post = EntityRef::Post(1);
        project_post(&f, 1, json!({"id": 1, "type": "post"}));
        identity(&f)
            .put(
                post,
                DestinationId(1),
                Some(RemoteDescriptor::new(100, RemoteStatus::Trash)),
            )
            .unwrap();

        f.transport.respond_json(
            Method::Delete,
            "/posts/100/",
            200,
            json!({"deleted": true}),
        );

        let report = f.orchestrator.on_delete(post).await.unwrap();
        assert_eq!(report.outcomes[0].result, Ok(SyncOutcome::Deleted));
        assert!(identity(&f).get(post).unwrap().is_empty());
    }
}
