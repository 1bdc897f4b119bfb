use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use replicast_api::FieldComposer;
use replicast_crypto::{RequestSigner, SignatureAlgorithm};
use replicast_identity::IdentityMap;
use replicast_resolver::ReferenceResolver;
use replicast_store::{AssetStore, EntityProjector, MetadataStore, TermStore};
use replicast_types::Destination;
use tracing::{debug, warn};

use crate::endpoint::headers;
use crate::error::{ProtocolError, ProtocolResult};
use crate::transport::{Method, OutboundRequest, RequestBody, Transport, TransportResponse};

/// Everything a protocol handler needs: the host collaborators, the
/// identity map and resolver built over them, and the transport.
#[derive(Clone)]
pub struct HandlerContext {
    pub identity: IdentityMap,
    pub resolver: ReferenceResolver,
    pub composer: FieldComposer,
    pub metadata: Arc<dyn MetadataStore>,
    pub terms: Arc<dyn TermStore>,
    pub assets: Arc<dyn AssetStore>,
    pub projector: Arc<dyn EntityProjector>,
    pub transport: Arc<dyn Transport>,
    algorithm: SignatureAlgorithm,
}

impl HandlerContext {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        terms: Arc<dyn TermStore>,
        assets: Arc<dyn AssetStore>,
        projector: Arc<dyn EntityProjector>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let identity = IdentityMap::new(metadata.clone());
        Self {
            resolver: ReferenceResolver::new(identity.clone()),
            composer: FieldComposer::new(metadata.clone(), terms.clone(), assets.clone()),
            identity,
            metadata,
            terms,
            assets,
            projector,
            transport,
            algorithm: SignatureAlgorithm::default(),
        }
    }

    /// Select a non-default signature algorithm.
    pub fn with_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Build and sign one outbound request.
    ///
    /// The path is `<base_url>/<resource>/`, plus `<remote_id>/` when the
    /// call addresses an existing replica.
    pub fn request(
        &self,
        method: Method,
        destination: &Destination,
        resource: &str,
        remote_id: Option<u64>,
        query: &[(&str, &str)],
        body: RequestBody,
    ) -> ProtocolResult<OutboundRequest> {
        destination.validate()?;

        let mut url = format!("{}/{}/", destination.api_root(), resource);
        if let Some(id) = remote_id {
            url.push_str(&format!("{id}/"));
        }

        let mut request = OutboundRequest {
            method,
            url,
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            headers: Vec::new(),
            body,
        };

        let timestamp = unix_timestamp();
        let signer = RequestSigner::new(&destination.api_key, &destination.api_secret)
            .with_algorithm(self.algorithm);
        let signature = signer.sign(method.as_str(), &request.uri_with_query(), timestamp)?;

        request
            .headers
            .push((headers::API_KEY.into(), destination.api_key.clone()));
        request
            .headers
            .push((headers::TIMESTAMP.into(), timestamp.to_string()));
        request
            .headers
            .push((headers::SIGNATURE.into(), signature.into_string()));
        request.headers.push((headers::MARKER.into(), "1".into()));

        if let RequestBody::Binary {
            content_type,
            content_disposition,
            content_md5,
            ..
        } = &request.body
        {
            request
                .headers
                .push((headers::CONTENT_TYPE.into(), content_type.clone()));
            request.headers.push((
                headers::CONTENT_DISPOSITION.into(),
                content_disposition.clone(),
            ));
            request
                .headers
                .push((headers::CONTENT_MD5.into(), content_md5.clone()));
        }

        Ok(request)
    }

    /// Execute a request and enforce the success contract.
    ///
    /// Transport failures propagate untouched; a completed non-2xx
    /// exchange becomes a remote error carrying status and reason. Neither
    /// mutates the identity map.
    pub async fn dispatch(&self, request: OutboundRequest) -> ProtocolResult<TransportResponse> {
        let method = request.method;
        let url = request.url.clone();
        debug!(method = %method, url = %url, "dispatching request");

        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            let reason = response.reason();
            warn!(
                method = %method,
                url = %url,
                status = response.status,
                reason = %reason,
                "remote error"
            );
            return Err(ProtocolError::Remote {
                status: response.status,
                reason,
            });
        }
        Ok(response)
    }
}

fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use replicast_store::{
        InMemoryAssetStore, InMemoryMetadataStore, InMemoryProjector, InMemoryTermStore,
    };
    use replicast_types::DestinationId;

    use crate::scripted::ScriptedTransport;
    use serde_json::json;

    fn context(transport: Arc<ScriptedTransport>) -> HandlerContext {
        HandlerContext::new(
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(InMemoryTermStore::new()),
            Arc::new(InMemoryAssetStore::new()),
            Arc::new(InMemoryProjector::new()),
            transport,
        )
    }

    fn destination() -> Destination {
        Destination {
            id: DestinationId(1),
            base_url: "https://remote.example/wp-json/wp/v2".into(),
            api_key: "key".into(),
            api_secret: "secret".into(),
            kinds: Default::default(),
        }
    }

    #[test]
    fn builds_signed_request() {
        let ctx = context(Arc::new(ScriptedTransport::new()));
        let request = ctx
            .request(
                Method::Post,
                &destination(),
                "posts",
                None,
                &[],
                RequestBody::Json(json!({"title": "t"})),
            )
            .unwrap();

        assert_eq!(request.url, "https://remote.example/wp-json/wp/v2/posts/");
        assert_eq!(request.header(headers::API_KEY), Some("key"));
        assert_eq!(request.header(headers::MARKER), Some("1"));
        assert!(request.header(headers::SIGNATURE).is_some());
        assert!(request.header(headers::TIMESTAMP).is_some());
    }

    #[test]
    fn remote_id_lands_in_path() {
        let ctx = context(Arc::new(ScriptedTransport::new()));
        let request = ctx
            .request(
                Method::Delete,
                &destination(),
                "posts",
                Some(42),
                &[("force", "true")],
                RequestBody::Empty,
            )
            .unwrap();
        assert_eq!(
            request.uri_with_query(),
            "https://remote.example/wp-json/wp/v2/posts/42/?force=true"
        );
    }

    #[test]
    fn binary_body_adds_content_headers() {
        let ctx = context(Arc::new(ScriptedTransport::new()));
        let request = ctx
            .request(
                Method::Post,
                &destination(),
                "media",
                None,
                &[],
                RequestBody::Binary {
                    bytes: vec![1, 2],
                    content_type: "image/png".into(),
                    content_disposition: "attachment; filename=a.png".into(),
                    content_md5: "abc".into(),
                },
            )
            .unwrap();
        assert_eq!(request.header(headers::CONTENT_TYPE), Some("image/png"));
        assert_eq!(request.header(headers::CONTENT_MD5), Some("abc"));
    }

    #[test]
    fn invalid_destination_fails_before_any_request() {
        let transport = Arc::new(ScriptedTransport::new());
        let ctx = context(transport.clone());
        let mut bad = destination();
        bad.api_secret.clear();

        let err = ctx
            .request(Method::Post, &bad, "posts", None, &[], RequestBody::Empty)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Config(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn dispatch_maps_non_2xx_to_remote_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_any(403, json!({"message": "invalid signature"}));
        let ctx = context(transport);

        let request = ctx
            .request(
                Method::Post,
                &destination(),
                "posts",
                None,
                &[],
                RequestBody::Empty,
            )
            .unwrap();
        let err = ctx.dispatch(request).await.unwrap_err();
        match err {
            ProtocolError::Remote { status, reason } => {
                assert_eq!(status, 403);
                assert_eq!(reason, "invalid signature");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
