use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pet {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Deserialize)]
pub struct CreatePet {
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Deserialize)]
pub struct ListPets {
    pub limit: Option<usize>,
    pub tag: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Pet>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/openapi.json", get(openapi))
        .route("/pets", get(list_pets).post(create_pet))
        .route("/pets/{pet_id}", get(get_pet).delete(delete_pet))
        .route("/whoami", get(whoami))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// OpenAPI document for this server, with `servers[0].url` pointing at the
/// host the document was requested from.
pub fn openapi_document(server_url: &str) -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {"title": "Mock pet store", "version": "1.0.0"},
        "servers": [{"url": server_url}],
        "paths": {
            "/pets": {
                "get": {
                    "operationId": "listPets",
                    "summary": "List pets",
                    "parameters": [
                        {"name": "limit", "in": "query", "schema": {"type": "integer"}},
                        {"name": "tag", "in": "query", "schema": {"type": "string"}}
                    ]
                },
                "post": {"operationId": "createPet", "summary": "Create a pet"}
            },
            "/pets/{petId}": {
                "parameters": [
                    {"name": "petId", "in": "path", "required": true, "schema": {"type": "string"}}
                ],
                "get": {"operationId": "getPetById", "description": "Info for a specific pet"},
                "delete": {"operationId": "deletePet"}
            },
            "/whoami": {
                "get": {"operationId": "whoAmI", "summary": "Echo the bearer token"}
            }
        }
    })
}

async fn openapi(headers: HeaderMap) -> Json<Value> {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("127.0.0.1:3000");
    Json(openapi_document(&format!("http://{host}")))
}

async fn list_pets(State(db): State<Db>, Query(query): Query<ListPets>) -> Json<Vec<Pet>> {
    let pets = db.read().await;
    let mut matching: Vec<Pet> = pets
        .values()
        .filter(|pet| query.tag.is_none() || pet.tag == query.tag)
        .cloned()
        .collect();
    matching.sort_by(|a, b| a.name.cmp(&b.name));
    if let Some(limit) = query.limit {
        matching.truncate(limit);
    }
    Json(matching)
}

async fn create_pet(
    State(db): State<Db>,
    Json(input): Json<CreatePet>,
) -> (StatusCode, Json<Pet>) {
    let pet = Pet {
        id: Uuid::new_v4(),
        name: input.name,
        tag: input.tag,
    };
    db.write().await.insert(pet.id, pet.clone());
    (StatusCode::CREATED, Json(pet))
}

async fn get_pet(
    State(db): State<Db>,
    Path(pet_id): Path<Uuid>,
) -> Result<Json<Pet>, (StatusCode, Json<Value>)> {
    let pets = db.read().await;
    pets.get(&pet_id).cloned().map(Json).ok_or_else(not_found)
}

async fn delete_pet(
    State(db): State<Db>,
    Path(pet_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let mut pets = db.write().await;
    pets.remove(&pet_id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(not_found)
}

async fn whoami(headers: HeaderMap) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    match token {
        Some(token) => Ok(Json(json!({"token": token}))),
        None => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "missing bearer token"})),
        )),
    }
}

fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"error": "pet not found"})))
}
