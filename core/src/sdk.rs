//! One method per remote operation.
//!
//! # Design
//! `UcodeSdk` glues the pure `UcodeClient` to a `Transport`: build the
//! request, execute it, parse the response, and hand back the decoded data
//! next to the raw `HttpResponse`. Each call is a single best-effort round
//! trip; nothing is retried.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::client::{UcodeClient, FAAS_BYPASS_PARAM};
use crate::config::Config;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    AggregationResult, Argument, ArgumentWithPagination, MultipleUpdateResult, ObjectList, RelationArgument,
    Response, SingleObject,
};

/// Blocking client for the UCode object API. Cheap to clone and safe to share
/// between threads.
#[derive(Clone)]
pub struct UcodeSdk {
    client: UcodeClient,
    transport: Arc<dyn Transport>,
}

impl UcodeSdk {
    pub fn new(config: Config) -> Self {
        let transport = UreqTransport::new(config.request_timeout());
        Self::with_transport(config, transport)
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Ok(Self::new(Config::from_env()?))
    }

    pub fn with_transport(config: Config, transport: impl Transport + 'static) -> Self {
        Self {
            client: UcodeClient::new(config),
            transport: Arc::new(transport),
        }
    }

    pub fn config(&self) -> &Config {
        self.client.config()
    }

    pub fn create_object(&self, arg: &Argument) -> Result<Response<SingleObject>, ApiError> {
        let request = self.client.build_create_object(arg)?;
        self.round_trip(&arg.table_slug, request, UcodeClient::parse_single)
    }

    pub fn get_list(&self, arg: &ArgumentWithPagination) -> Result<Response<ObjectList>, ApiError> {
        let request = self.client.build_get_list(arg)?;
        self.round_trip(&arg.table_slug, request, UcodeClient::parse_list)
    }

    pub fn get_list_slim(&self, arg: &ArgumentWithPagination) -> Result<Response<ObjectList>, ApiError> {
        let request = self.client.build_get_list_slim(arg)?;
        self.round_trip(&arg.table_slug, request, UcodeClient::parse_list)
    }

    pub fn get_single(&self, arg: &Argument) -> Result<Response<SingleObject>, ApiError> {
        let request = self.client.build_get_single(arg)?;
        self.round_trip(&arg.table_slug, request, UcodeClient::parse_single)
    }

    pub fn get_single_slim(&self, arg: &Argument) -> Result<Response<SingleObject>, ApiError> {
        let request = self.client.build_get_single_slim(arg)?;
        self.round_trip(&arg.table_slug, request, UcodeClient::parse_single)
    }

    pub fn get_list_aggregation(&self, arg: &Argument) -> Result<Response<AggregationResult>, ApiError> {
        let request = self.client.build_get_list_aggregation(arg)?;
        self.round_trip(&arg.table_slug, request, UcodeClient::parse_aggregation)
    }

    pub fn update_object(&self, arg: &Argument) -> Result<Response<SingleObject>, ApiError> {
        let request = self.client.build_update_object(arg)?;
        self.round_trip(&arg.table_slug, request, UcodeClient::parse_single)
    }

    pub fn multiple_update(&self, arg: &Argument) -> Result<Response<MultipleUpdateResult>, ApiError> {
        let request = self.client.build_multiple_update(arg)?;
        self.round_trip(&arg.table_slug, request, UcodeClient::parse_multiple_update)
    }

    pub fn delete(&self, arg: &Argument) -> Result<Response<()>, ApiError> {
        let request = self.client.build_delete(arg)?;
        self.round_trip(&arg.table_slug, request, UcodeClient::parse_empty)
    }

    pub fn multiple_delete(&self, arg: &Argument) -> Result<Response<()>, ApiError> {
        let request = self.client.build_multiple_delete(arg)?;
        self.round_trip(&arg.table_slug, request, UcodeClient::parse_empty)
    }

    pub fn append_many_to_many(&self, arg: &RelationArgument) -> Result<Response<()>, ApiError> {
        let request = self.client.build_append_many_to_many(arg)?;
        self.round_trip(&arg.relation.table_from, request, UcodeClient::parse_empty)
    }

    pub fn delete_many_to_many(&self, arg: &RelationArgument) -> Result<Response<()>, ApiError> {
        let request = self.client.build_delete_many_to_many(arg)?;
        self.round_trip(&arg.relation.table_from, request, UcodeClient::parse_empty)
    }

    fn round_trip<T>(
        &self,
        table: &str,
        request: HttpRequest,
        parse: impl FnOnce(&UcodeClient, &HttpResponse) -> Result<T, ApiError>,
    ) -> Result<Response<T>, ApiError> {
        debug!(
            method = %request.method,
            url = %request.url,
            table,
            function = self.config().function_name(),
            disable_faas = request.query_value(FAAS_BYPASS_PARAM).is_some(),
            "sending request"
        );
        let start = Instant::now();
        let http = self
            .transport
            .execute(&request)
            .inspect_err(|err| warn!(table, url = %request.url, error = %err, "request failed"))?;
        debug!(status = http.status, elapsed = ?start.elapsed(), "response received");

        if !http.is_success() {
            warn!(table, status = http.status, body = %http.body, "platform returned non-success status");
        }
        let data = parse(&self.client, &http)?;
        Ok(Response { data, http })
    }
}
