//! gRPC transport for the event bus's Listen Stream and the Import
//! Pipeline's RunImport call.
//!
//! Requires the `grpc` feature. Uses tonic for the gRPC server and prost
//! for message serialization (standard protobuf wire format, no `.proto`
//! file), with services hand-built via `tonic_build::manual::Service`.
//!
//! Every handler passes through the rate limiter and the panic-recovery
//! boundary before touching the bus, the listen stream, or the import
//! pipeline.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use tokio_stream::Stream;
use tonic::{Request, Response, Status};

use crate::bus::{EventBus, EventFilter};
use crate::error::DirectoryError;
use crate::event::{Event, EventType};
use crate::import::{self, ImportConfig, ImporterRegistry};
use crate::listener::{ListenStep, ListenStream};
use crate::panic_recovery;
use crate::rate_limit::{RateLimiter, RequestContext};
use crate::store::Store;

// ---------------------------------------------------------------------------
// Message types (prost — standard protobuf wire format)
// ---------------------------------------------------------------------------

#[derive(Clone, prost::Message)]
pub struct ListenRequest {
    #[prost(string, repeated, tag = "1")]
    pub event_types: Vec<String>,
    #[prost(string, repeated, tag = "2")]
    pub labels: Vec<String>,
    #[prost(string, repeated, tag = "3")]
    pub cids: Vec<String>,
}

#[derive(Clone, prost::Message)]
pub struct EventMessage {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub event_type: String,
    #[prost(uint64, tag = "3")]
    pub timestamp_ms: u64,
    #[prost(string, tag = "4")]
    pub resource_id: String,
    #[prost(string, repeated, tag = "5")]
    pub labels: Vec<String>,
    #[prost(map = "string, string", tag = "6")]
    pub metadata: HashMap<String, String>,
}

impl From<Event> for EventMessage {
    fn from(event: Event) -> Self {
        EventMessage {
            id: event.id,
            event_type: event.event_type.wire_name().to_string(),
            timestamp_ms: event.timestamp_ms,
            resource_id: event.resource_id,
            labels: event.labels,
            metadata: event.metadata,
        }
    }
}

#[derive(Clone, prost::Message)]
pub struct RunImportRequest {
    #[prost(string, tag = "1")]
    pub registry_type: String,
    #[prost(string, tag = "2")]
    pub registry_url: String,
    #[prost(map = "string, string", tag = "3")]
    pub filters: HashMap<String, String>,
    #[prost(uint32, tag = "4")]
    pub limit: u32,
    #[prost(uint32, tag = "5")]
    pub concurrency: u32,
    #[prost(bool, tag = "6")]
    pub dry_run: bool,
    #[prost(bool, tag = "7")]
    pub force: bool,
    #[prost(bool, tag = "8")]
    pub debug: bool,
    #[prost(bool, tag = "9")]
    pub enrich: bool,
    #[prost(string, tag = "10")]
    pub enricher_config: String,
}

impl From<RunImportRequest> for ImportConfig {
    fn from(req: RunImportRequest) -> Self {
        ImportConfig {
            registry_type: req.registry_type,
            registry_url: req.registry_url,
            filters: req.filters,
            limit: req.limit as usize,
            concurrency: req.concurrency as usize,
            dry_run: req.dry_run,
            force: req.force,
            debug: req.debug,
            enrich: req.enrich,
            enricher_config: if req.enricher_config.is_empty() {
                None
            } else {
                Some(req.enricher_config)
            },
        }
    }
}

#[derive(Clone, prost::Message)]
pub struct RunImportResponse {
    #[prost(uint64, tag = "1")]
    pub total_records: u64,
    #[prost(uint64, tag = "2")]
    pub imported_count: u64,
    #[prost(uint64, tag = "3")]
    pub skipped_count: u64,
    #[prost(uint64, tag = "4")]
    pub failed_count: u64,
    #[prost(string, repeated, tag = "5")]
    pub errors: Vec<String>,
}

impl From<import::ImportResult> for RunImportResponse {
    fn from(result: import::ImportResult) -> Self {
        RunImportResponse {
            total_records: result.total_records as u64,
            imported_count: result.imported_count as u64,
            skipped_count: result.skipped_count as u64,
            failed_count: result.failed_count as u64,
            errors: result.errors,
        }
    }
}

// ---------------------------------------------------------------------------
// Generated service traits + server/client
// ---------------------------------------------------------------------------

include!(concat!(env!("OUT_DIR"), "/directory.events.DirectoryEvents.rs"));
include!(concat!(env!("OUT_DIR"), "/directory.import.DirectoryImport.rs"));

pub use directory_events_server::{DirectoryEvents, DirectoryEventsServer};
pub use directory_import_server::{DirectoryImport, DirectoryImportServer};

fn client_id_from(request: &Request<impl Send>) -> String {
    request
        .metadata()
        .get("x-client-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn parse_filter(req: &ListenRequest) -> Result<EventFilter, Status> {
    let mut filter = EventFilter::default();
    for raw in &req.event_types {
        filter.event_types.insert(EventType::parse_one(raw).map_err(Status::from)?);
    }
    filter.label_any_of.extend(req.labels.iter().cloned());
    filter.cid_any_of.extend(req.cids.iter().cloned());
    Ok(filter)
}

// ---------------------------------------------------------------------------
// DirectoryEvents handler
// ---------------------------------------------------------------------------

/// gRPC handler for `DirectoryEvents`: wraps the event bus and the rate
/// limiter behind the `Listen` streaming RPC.
pub struct EventsHandler {
    bus: EventBus,
    rate_limiter: Arc<RateLimiter>,
}

impl EventsHandler {
    pub fn new(bus: EventBus, rate_limiter: Arc<RateLimiter>) -> Self {
        EventsHandler { bus, rate_limiter }
    }
}

#[tonic::async_trait]
impl DirectoryEvents for EventsHandler {
    type ListenStream = Pin<Box<dyn Stream<Item = Result<EventMessage, Status>> + Send>>;

    async fn listen(
        &self,
        request: Request<ListenRequest>,
    ) -> Result<Response<Self::ListenStream>, Status> {
        let client_id = client_id_from(&request);
        self.rate_limiter
            .check(RequestContext { method: "Listen", client_id: &client_id })
            .map_err(Status::from)?;

        let filter = parse_filter(request.get_ref())?;
        let cancellation = tokio_util::sync::CancellationToken::new();
        // No external cancellation source from tonic for server-streaming
        // RPCs: the client disconnecting simply drops this stream, which
        // drops `stream` and runs `ListenStream`'s own unsubscribe-on-drop.
        let mut stream = ListenStream::open(self.bus.clone(), filter, cancellation)
            .map_err(Status::from)?;

        let output = async_stream::stream! {
            loop {
                match stream.next().await {
                    ListenStep::Event(event) => yield Ok(event.into()),
                    ListenStep::BusClosed => break,
                    ListenStep::Cancelled(err) => {
                        yield Err(Status::from(err));
                        break;
                    }
                }
            }
        };

        Ok(Response::new(Box::pin(output)))
    }
}

// ---------------------------------------------------------------------------
// DirectoryImport handler
// ---------------------------------------------------------------------------

/// gRPC handler for `DirectoryImport`: wraps the importer registry, the
/// store, and the rate limiter / panic recovery boundary behind the
/// unary `RunImport` RPC.
pub struct ImportHandler {
    registry: Arc<ImporterRegistry>,
    http_client: reqwest::Client,
    store: Arc<dyn Store>,
    rate_limiter: Arc<RateLimiter>,
}

impl ImportHandler {
    pub fn new(
        registry: Arc<ImporterRegistry>,
        http_client: reqwest::Client,
        store: Arc<dyn Store>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        ImportHandler { registry, http_client, store, rate_limiter }
    }
}

#[tonic::async_trait]
impl DirectoryImport for ImportHandler {
    async fn run_import(
        &self,
        request: Request<RunImportRequest>,
    ) -> Result<Response<RunImportResponse>, Status> {
        let client_id = client_id_from(&request);
        self.rate_limiter
            .check(RequestContext { method: "RunImport", client_id: &client_id })
            .map_err(Status::from)?;

        let config: ImportConfig = request.into_inner().into();
        let registry_client = self
            .registry
            .create(self.http_client.clone(), &config)
            .map_err(Status::from)?;
        let store = self.store.clone();

        let result = panic_recovery::guard_async("RunImport", Some(&client_id), async move {
            import::run_import(
                config,
                registry_client,
                store,
                None,
                default_transform(),
                tokio_util::sync::CancellationToken::new(),
            )
            .await
        })
        .await
        .map_err(Status::from)?;

        Ok(Response::new(result.into()))
    }
}

/// Default transform for raw MCP registry JSON into a canonical `Record`.
fn default_transform() -> import::TransformFn {
    use crate::store::Record;
    Arc::new(|item: serde_json::Value| {
        let name = item["name"]
            .as_str()
            .ok_or_else(|| DirectoryError::validation("mcp server missing name"))?
            .to_string();
        let version = item["version"].as_str().unwrap_or("0.0.0").to_string();
        Ok(Record {
            name,
            version,
            skills: vec![],
            domains: vec![],
            metadata: HashMap::new(),
        })
    })
}
