use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub type Object = Map<String, Value>;

/// In-memory platform state. Rows keep insertion order so paging is stable.
#[derive(Debug, Default)]
pub struct Store {
    pub tables: HashMap<String, Vec<Object>>,
    /// Mutations that would have fired a serverless trigger.
    pub triggers_fired: u64,
}

pub type Db = Arc<RwLock<Store>>;

type Reply = Result<(StatusCode, Json<Value>), (StatusCode, String)>;

#[derive(Debug, Default, Deserialize)]
pub struct FaasParams {
    #[serde(rename = "from-ofs", default)]
    pub from_ofs: bool,
}

#[derive(Debug, Deserialize)]
pub struct DataBody {
    #[serde(default)]
    pub data: Object,
}

#[derive(Debug, Deserialize)]
pub struct IdsBody {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ManyToMany {
    pub table_from: String,
    pub table_to: String,
    pub id_from: String,
    pub id_to: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SlimListParams {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub page: u32,
    #[serde(rename = "from-ofs", default)]
    pub from_ofs: bool,
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/v1/object/{table}", post(create_object).put(update_object).delete(multiple_delete))
        .route("/v1/object/{table}/{guid}", get(get_single).delete(delete_object))
        .route("/v1/object/get-list/{table}", post(get_list))
        .route("/v1/object/get-list-aggregation/{table}", post(get_list_aggregation))
        .route("/v1/object/multiple-update/{table}", put(multiple_update))
        .route("/v1/object-slim/get-list/{table}", get(get_list_slim))
        .route("/v1/object-slim/{table}/{guid}", get(get_single_slim))
        .route("/v1/many-to-many", put(append_many_to_many).delete(delete_many_to_many))
        .layer(middleware::from_fn(require_app_id))
        .route("/debug/triggers", get(triggers_fired))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn require_app_id(request: Request, next: Next) -> Result<Response, StatusCode> {
    let has_key = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| !v.is_empty());
    if !has_key {
        tracing::warn!(uri = %request.uri(), "rejecting request without x-api-key");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(request).await)
}

fn envelope(status: StatusCode, label: &str, table: &str, data: Value) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "status": label,
            "description": "",
            "data": { "table_slug": table, "data": data },
        })),
    )
}

fn not_found(table: &str, guid: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("object {guid} not found in {table}"))
}

fn bad_request(msg: impl Into<String>) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, msg.into())
}

fn record_mutation(store: &mut Store, faas: &FaasParams) {
    if !faas.from_ofs {
        store.triggers_fired += 1;
    }
}

fn guid_of(object: &Object) -> Option<&str> {
    object.get("guid").and_then(Value::as_str)
}

/// Equality match on every filter key; pagination keys are not filters.
fn matches_filters(object: &Object, filters: &Object) -> bool {
    filters
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "limit" | "page" | "offset"))
        .all(|(k, v)| object.get(k) == Some(v))
}

fn page_of(rows: &[Object], filters: &Object, limit: u32, page: u32) -> Value {
    let matched: Vec<&Object> = rows.iter().filter(|o| matches_filters(o, filters)).collect();
    let count = matched.len();
    let page_rows: Vec<&Object> = if limit == 0 {
        matched
    } else {
        let offset = (page.max(1) as usize - 1) * limit as usize;
        matched.into_iter().skip(offset).take(limit as usize).collect()
    };
    json!({ "count": count, "response": page_rows })
}

async fn create_object(
    State(db): State<Db>,
    Path(table): Path<String>,
    Query(faas): Query<FaasParams>,
    Json(body): Json<DataBody>,
) -> Reply {
    let mut object = body.data;
    if guid_of(&object).is_none() {
        object.insert("guid".to_string(), json!(Uuid::new_v4().to_string()));
    }
    let mut store = db.write().await;
    record_mutation(&mut store, &faas);
    store.tables.entry(table.clone()).or_default().push(object.clone());
    Ok(envelope(StatusCode::CREATED, "CREATED", &table, json!({ "response": object })))
}

async fn update_object(
    State(db): State<Db>,
    Path(table): Path<String>,
    Query(faas): Query<FaasParams>,
    Json(body): Json<DataBody>,
) -> Reply {
    let guid = guid_of(&body.data)
        .ok_or_else(|| bad_request("update requires a guid"))?
        .to_string();
    let mut store = db.write().await;
    let row = store
        .tables
        .get_mut(&table)
        .and_then(|rows| rows.iter_mut().find(|o| guid_of(o) == Some(guid.as_str())))
        .ok_or_else(|| not_found(&table, &guid))?;
    row.extend(body.data);
    let updated = row.clone();
    record_mutation(&mut store, &faas);
    Ok(envelope(StatusCode::OK, "OK", &table, json!({ "response": updated })))
}

/// Upserts: rows with a known guid are merged, the rest are inserted.
async fn multiple_update(
    State(db): State<Db>,
    Path(table): Path<String>,
    Query(faas): Query<FaasParams>,
    Json(body): Json<DataBody>,
) -> Reply {
    let objects: Vec<Object> = match body.data.get("objects") {
        Some(objects) => serde_json::from_value(objects.clone()).map_err(|e| bad_request(e.to_string()))?,
        None => return Err(bad_request("multiple update requires objects")),
    };
    let mut store = db.write().await;
    record_mutation(&mut store, &faas);
    let rows = store.tables.entry(table.clone()).or_default();
    let mut result = Vec::with_capacity(objects.len());
    for mut object in objects {
        let existing = match guid_of(&object).map(str::to_string) {
            Some(guid) => rows.iter_mut().find(|o| guid_of(o) == Some(guid.as_str())),
            None => None,
        };
        match existing {
            Some(row) => {
                row.extend(object);
                result.push(row.clone());
            }
            None => {
                if guid_of(&object).is_none() {
                    object.insert("guid".to_string(), json!(Uuid::new_v4().to_string()));
                }
                rows.push(object.clone());
                result.push(object);
            }
        }
    }
    Ok(envelope(StatusCode::OK, "OK", &table, json!({ "objects": result })))
}

async fn get_single(State(db): State<Db>, Path((table, guid)): Path<(String, String)>) -> Reply {
    let store = db.read().await;
    let object = store
        .tables
        .get(&table)
        .and_then(|rows| rows.iter().find(|o| guid_of(o) == Some(guid.as_str())))
        .ok_or_else(|| not_found(&table, &guid))?;
    Ok(envelope(StatusCode::OK, "OK", &table, json!({ "response": object })))
}

/// Slim reads drop relation id lists.
async fn get_single_slim(State(db): State<Db>, Path((table, guid)): Path<(String, String)>) -> Reply {
    let store = db.read().await;
    let object = store
        .tables
        .get(&table)
        .and_then(|rows| rows.iter().find(|o| guid_of(o) == Some(guid.as_str())))
        .ok_or_else(|| not_found(&table, &guid))?;
    let slim: Object = object
        .iter()
        .filter(|(k, _)| !k.ends_with("_ids"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Ok(envelope(StatusCode::OK, "OK", &table, json!({ "response": slim })))
}

async fn get_list(State(db): State<Db>, Path(table): Path<String>, Json(body): Json<DataBody>) -> Reply {
    let limit = body.data.get("limit").and_then(Value::as_u64).unwrap_or(0) as u32;
    let page = body.data.get("page").and_then(Value::as_u64).unwrap_or(1) as u32;
    let store = db.read().await;
    let rows = store.tables.get(&table).map(Vec::as_slice).unwrap_or_default();
    Ok(envelope(StatusCode::OK, "OK", &table, page_of(rows, &body.data, limit, page)))
}

async fn get_list_slim(
    State(db): State<Db>,
    Path(table): Path<String>,
    Query(params): Query<SlimListParams>,
) -> Reply {
    let filters: Object = match params.data.as_deref() {
        Some(raw) if !raw.is_empty() => serde_json::from_str(raw).map_err(|e| bad_request(e.to_string()))?,
        _ => Object::new(),
    };
    let store = db.read().await;
    let rows = store.tables.get(&table).map(Vec::as_slice).unwrap_or_default();
    Ok(envelope(StatusCode::OK, "OK", &table, page_of(rows, &filters, params.limit, params.page)))
}

/// Supports `$match` (equality) and `$limit` stages.
async fn get_list_aggregation(
    State(db): State<Db>,
    Path(table): Path<String>,
    Json(body): Json<DataBody>,
) -> Reply {
    let stages = match body.data.get("pipelines") {
        Some(Value::Array(stages)) => stages.clone(),
        _ => return Err(bad_request("aggregation requires a pipelines array")),
    };
    let store = db.read().await;
    let mut rows: Vec<Object> = store.tables.get(&table).cloned().unwrap_or_default();
    for stage in &stages {
        if let Some(Value::Object(filters)) = stage.get("$match") {
            rows.retain(|o| matches_filters(o, filters));
        } else if let Some(limit) = stage.get("$limit").and_then(Value::as_u64) {
            rows.truncate(limit as usize);
        } else {
            return Err(bad_request(format!("unsupported pipeline stage: {stage}")));
        }
    }
    Ok(envelope(StatusCode::OK, "OK", &table, json!({ "data": rows })))
}

async fn delete_object(
    State(db): State<Db>,
    Path((table, guid)): Path<(String, String)>,
    Query(faas): Query<FaasParams>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut store = db.write().await;
    let rows = store.tables.get_mut(&table).ok_or_else(|| not_found(&table, &guid))?;
    let before = rows.len();
    rows.retain(|o| guid_of(o) != Some(guid.as_str()));
    if rows.len() == before {
        return Err(not_found(&table, &guid));
    }
    record_mutation(&mut store, &faas);
    Ok(StatusCode::NO_CONTENT)
}

/// Unknown ids are ignored.
async fn multiple_delete(
    State(db): State<Db>,
    Path(table): Path<String>,
    Query(faas): Query<FaasParams>,
    Json(body): Json<IdsBody>,
) -> StatusCode {
    let mut store = db.write().await;
    if let Some(rows) = store.tables.get_mut(&table) {
        rows.retain(|o| !matches!(guid_of(o), Some(guid) if body.ids.iter().any(|id| id == guid)));
    }
    record_mutation(&mut store, &faas);
    StatusCode::NO_CONTENT
}

fn relation_field(relation: &ManyToMany) -> String {
    format!("{}_ids", relation.table_to)
}

async fn append_many_to_many(
    State(db): State<Db>,
    Query(faas): Query<FaasParams>,
    Json(relation): Json<ManyToMany>,
) -> Reply {
    let field = relation_field(&relation);
    let mut store = db.write().await;
    let row = store
        .tables
        .get_mut(&relation.table_from)
        .and_then(|rows| rows.iter_mut().find(|o| guid_of(o) == Some(relation.id_from.as_str())))
        .ok_or_else(|| not_found(&relation.table_from, &relation.id_from))?;
    let mut ids: Vec<String> = row
        .get(&field)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();
    for id in relation.id_to {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    row.insert(field, json!(ids));
    let updated = row.clone();
    record_mutation(&mut store, &faas);
    Ok(envelope(StatusCode::OK, "OK", &relation.table_from, json!({ "response": updated })))
}

/// An empty `id_to` unlinks every related record.
async fn delete_many_to_many(
    State(db): State<Db>,
    Query(faas): Query<FaasParams>,
    Json(relation): Json<ManyToMany>,
) -> Reply {
    let field = relation_field(&relation);
    let mut store = db.write().await;
    let row = store
        .tables
        .get_mut(&relation.table_from)
        .and_then(|rows| rows.iter_mut().find(|o| guid_of(o) == Some(relation.id_from.as_str())))
        .ok_or_else(|| not_found(&relation.table_from, &relation.id_from))?;
    let ids: Vec<String> = if relation.id_to.is_empty() {
        Vec::new()
    } else {
        row.get(&field)
            .and_then(|v| serde_json::from_value::<Vec<String>>(v.clone()).ok())
            .unwrap_or_default()
            .into_iter()
            .filter(|id| !relation.id_to.contains(id))
            .collect()
    };
    row.insert(field, json!(ids));
    let updated = row.clone();
    record_mutation(&mut store, &faas);
    Ok(envelope(StatusCode::OK, "OK", &relation.table_from, json!({ "response": updated })))
}

async fn triggers_fired(State(db): State<Db>) -> Json<Value> {
    Json(json!({ "triggers_fired": db.read().await.triggers_fired }))
}
