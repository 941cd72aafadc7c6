//! Arguments and response DTOs for the UCode object API.
//!
//! # Design
//! Objects are loosely typed (`Object` is a JSON map) because table schemas
//! live on the platform. The response envelopes mirror the platform's
//! wrapper but are defined independently from the mock-server crate;
//! integration tests catch schema drift between the two.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::HttpResponse;

/// A single record as the platform returns it.
pub type Object = Map<String, Value>;

/// Generic JSON payload container: object fields, filters, guids, pipelines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub data: Object,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of one field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

impl From<Object> for Request {
    fn from(data: Object) -> Self {
        Self { data }
    }
}

/// Argument for operations that address a table without pagination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Argument {
    pub table_slug: String,
    pub request: Request,
    /// Skip the platform's serverless triggers for this call.
    pub disable_faas: bool,
}

impl Argument {
    pub fn new(table_slug: &str, request: Request) -> Self {
        Self {
            table_slug: table_slug.to_string(),
            request,
            disable_faas: false,
        }
    }

    pub fn disable_faas(mut self, disable_faas: bool) -> Self {
        self.disable_faas = disable_faas;
        self
    }

    pub fn paginate(self, limit: u32, page: u32) -> ArgumentWithPagination {
        ArgumentWithPagination {
            table_slug: self.table_slug,
            request: self.request,
            disable_faas: self.disable_faas,
            limit,
            page,
        }
    }
}

/// `Argument` plus page size and 1-based page number, forwarded unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentWithPagination {
    pub table_slug: String,
    pub request: Request,
    pub disable_faas: bool,
    pub limit: u32,
    pub page: u32,
}

/// Link descriptor for many-to-many relations. An empty `id_to` applies the
/// operation to every related record, so it is always serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManyToMany {
    pub table_from: String,
    pub table_to: String,
    pub id_from: String,
    #[serde(default)]
    pub id_to: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationArgument {
    pub relation: ManyToMany,
    pub disable_faas: bool,
}

/// The platform's response wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub description: String,
    pub data: EnvelopeData<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeData<T> {
    #[serde(default)]
    pub table_slug: String,
    pub data: T,
}

/// Payload of create, update and single-object reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SingleObject {
    #[serde(default)]
    pub response: Object,
}

/// Payload of list reads. `count` is the total matching the filter, not the
/// page length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectList {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub response: Vec<Object>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultipleUpdateResult {
    #[serde(default)]
    pub objects: Vec<Object>,
}

/// Aggregation output, left uninterpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    #[serde(default)]
    pub data: Vec<Value>,
}

/// Decoded payload together with the raw response it came from.
#[derive(Debug, Clone)]
pub struct Response<T> {
    pub data: T,
    pub http: HttpResponse,
}
