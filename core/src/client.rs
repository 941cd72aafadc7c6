//! Stateless HTTP request builder and response parser for the UCode API.
//!
//! # Design
//! `UcodeClient` holds only the immutable `Config` and carries no mutable
//! state between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that reads an
//! `HttpResponse`. `UcodeSdk` runs the round-trip in between; keeping this
//! half free of I/O makes every wire detail testable without a server.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    AggregationResult, Argument, ArgumentWithPagination, Envelope, ManyToMany, MultipleUpdateResult, ObjectList,
    RelationArgument, SingleObject,
};

/// Query pair that tells the platform not to fire serverless triggers.
pub const FAAS_BYPASS_PARAM: &str = "from-ofs";

/// Synchronous, stateless request builder for the UCode object API.
#[derive(Debug, Clone)]
pub struct UcodeClient {
    config: Config,
}

impl UcodeClient {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn build_create_object(&self, arg: &Argument) -> Result<HttpRequest, ApiError> {
        let slug = table_slug(&arg.table_slug)?;
        let body = to_body(&arg.request)?;
        Ok(self.request(HttpMethod::Post, format!("/v1/object/{slug}"), arg.disable_faas, Some(body)))
    }

    /// `limit` and `page` ride in the body next to the filters.
    pub fn build_get_list(&self, arg: &ArgumentWithPagination) -> Result<HttpRequest, ApiError> {
        let slug = table_slug(&arg.table_slug)?;
        let mut data = arg.request.data.clone();
        data.insert("limit".to_string(), json!(arg.limit));
        data.insert("page".to_string(), json!(arg.page));
        let body = to_body(&json!({ "data": data }))?;
        Ok(self.request(
            HttpMethod::Post,
            format!("/v1/object/get-list/{slug}"),
            arg.disable_faas,
            Some(body),
        ))
    }

    /// Filters travel as a JSON-encoded `data` query value.
    pub fn build_get_list_slim(&self, arg: &ArgumentWithPagination) -> Result<HttpRequest, ApiError> {
        let slug = table_slug(&arg.table_slug)?;
        let filters = serde_json::to_string(&arg.request.data).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut req = self.request(
            HttpMethod::Get,
            format!("/v1/object-slim/get-list/{slug}"),
            arg.disable_faas,
            None,
        );
        req.query.push(("data".to_string(), filters));
        req.query.push(("limit".to_string(), arg.limit.to_string()));
        req.query.push(("page".to_string(), arg.page.to_string()));
        Ok(req)
    }

    pub fn build_get_single(&self, arg: &Argument) -> Result<HttpRequest, ApiError> {
        let slug = table_slug(&arg.table_slug)?;
        let guid = guid(arg)?;
        Ok(self.request(HttpMethod::Get, format!("/v1/object/{slug}/{guid}"), arg.disable_faas, None))
    }

    pub fn build_get_single_slim(&self, arg: &Argument) -> Result<HttpRequest, ApiError> {
        let slug = table_slug(&arg.table_slug)?;
        let guid = guid(arg)?;
        Ok(self.request(HttpMethod::Get, format!("/v1/object-slim/{slug}/{guid}"), arg.disable_faas, None))
    }

    /// The pipeline in `request.data` is forwarded as-is.
    pub fn build_get_list_aggregation(&self, arg: &Argument) -> Result<HttpRequest, ApiError> {
        let slug = table_slug(&arg.table_slug)?;
        let body = to_body(&arg.request)?;
        Ok(self.request(
            HttpMethod::Post,
            format!("/v1/object/get-list-aggregation/{slug}"),
            arg.disable_faas,
            Some(body),
        ))
    }

    pub fn build_update_object(&self, arg: &Argument) -> Result<HttpRequest, ApiError> {
        let slug = table_slug(&arg.table_slug)?;
        let body = to_body(&arg.request)?;
        Ok(self.request(HttpMethod::Put, format!("/v1/object/{slug}"), arg.disable_faas, Some(body)))
    }

    pub fn build_multiple_update(&self, arg: &Argument) -> Result<HttpRequest, ApiError> {
        let slug = table_slug(&arg.table_slug)?;
        if !matches!(arg.request.get("objects"), Some(Value::Array(_))) {
            return Err(ApiError::InvalidArgument(
                "multiple update requires an `objects` array".to_string(),
            ));
        }
        let body = to_body(&arg.request)?;
        Ok(self.request(
            HttpMethod::Put,
            format!("/v1/object/multiple-update/{slug}"),
            arg.disable_faas,
            Some(body),
        ))
    }

    pub fn build_delete(&self, arg: &Argument) -> Result<HttpRequest, ApiError> {
        let slug = table_slug(&arg.table_slug)?;
        let guid = guid(arg)?;
        Ok(self.request(HttpMethod::Delete, format!("/v1/object/{slug}/{guid}"), arg.disable_faas, None))
    }

    pub fn build_multiple_delete(&self, arg: &Argument) -> Result<HttpRequest, ApiError> {
        let slug = table_slug(&arg.table_slug)?;
        let ids = match arg.request.get("ids") {
            Some(ids @ Value::Array(_)) => ids,
            _ => {
                return Err(ApiError::InvalidArgument(
                    "multiple delete requires an `ids` array".to_string(),
                ))
            }
        };
        let body = to_body(&json!({ "ids": ids }))?;
        Ok(self.request(HttpMethod::Delete, format!("/v1/object/{slug}"), arg.disable_faas, Some(body)))
    }

    pub fn build_append_many_to_many(&self, arg: &RelationArgument) -> Result<HttpRequest, ApiError> {
        let body = relation_body(&arg.relation)?;
        Ok(self.request(HttpMethod::Put, "/v1/many-to-many".to_string(), arg.disable_faas, Some(body)))
    }

    pub fn build_delete_many_to_many(&self, arg: &RelationArgument) -> Result<HttpRequest, ApiError> {
        let body = relation_body(&arg.relation)?;
        Ok(self.request(HttpMethod::Delete, "/v1/many-to-many".to_string(), arg.disable_faas, Some(body)))
    }

    pub fn parse_single(&self, response: &HttpResponse) -> Result<SingleObject, ApiError> {
        decode(response)
    }

    pub fn parse_list(&self, response: &HttpResponse) -> Result<ObjectList, ApiError> {
        decode(response)
    }

    pub fn parse_aggregation(&self, response: &HttpResponse) -> Result<AggregationResult, ApiError> {
        decode(response)
    }

    pub fn parse_multiple_update(&self, response: &HttpResponse) -> Result<MultipleUpdateResult, ApiError> {
        decode(response)
    }

    /// For operations whose success carries no payload worth decoding.
    pub fn parse_empty(&self, response: &HttpResponse) -> Result<(), ApiError> {
        check_status(response)
    }

    fn request(&self, method: HttpMethod, path: String, disable_faas: bool, body: Option<String>) -> HttpRequest {
        let mut headers = vec![
            ("authorization".to_string(), "API-KEY".to_string()),
            ("x-api-key".to_string(), self.config.app_id().to_string()),
        ];
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        let mut query = Vec::new();
        if disable_faas {
            query.push((FAAS_BYPASS_PARAM.to_string(), "true".to_string()));
        }
        HttpRequest {
            method,
            url: format!("{}{path}", self.config.base_url()),
            query,
            headers,
            body,
        }
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound {
            body: response.body.clone(),
        });
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    check_status(response)?;
    let envelope: Envelope<T> =
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))?;
    Ok(envelope.data.data)
}

fn to_body<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn relation_body(relation: &ManyToMany) -> Result<String, ApiError> {
    path_segment("table_from", &relation.table_from)?;
    path_segment("table_to", &relation.table_to)?;
    if relation.id_from.is_empty() {
        return Err(ApiError::InvalidArgument("id_from must not be empty".to_string()));
    }
    to_body(relation)
}

fn table_slug(slug: &str) -> Result<&str, ApiError> {
    path_segment("table slug", slug)
}

fn guid(arg: &Argument) -> Result<&str, ApiError> {
    match arg.request.get("guid") {
        Some(Value::String(guid)) => path_segment("guid", guid),
        Some(_) => Err(ApiError::InvalidArgument("guid must be a string".to_string())),
        None => Err(ApiError::InvalidArgument("request data has no guid".to_string())),
    }
}

/// Slugs and guids are spliced into the URL path, so they must stay one segment.
fn path_segment<'a>(what: &str, value: &'a str) -> Result<&'a str, ApiError> {
    if value.is_empty() {
        return Err(ApiError::InvalidArgument(format!("{what} must not be empty")));
    }
    if value.chars().any(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace()) {
        return Err(ApiError::InvalidArgument(format!("{what} {value:?} is not a valid path segment")));
    }
    Ok(value)
}
