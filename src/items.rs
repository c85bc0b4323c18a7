// src/items.rs
//! Minimal CRUD boundary: a seeded item list that accepts new entries.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct ItemStore {
    items: RwLock<Vec<Item>>,
}

impl Default for ItemStore {
    fn default() -> Self {
        let items = (1..=3)
            .map(|n| Item {
                id: n.to_string(),
                name: format!("Item {n}"),
                description: format!("Description for Item {n}"),
                created_at: None,
            })
            .collect();
        Self {
            items: RwLock::new(items),
        }
    }
}

impl ItemStore {
    pub async fn list(&self) -> Vec<Item> {
        self.items.read().await.clone()
    }

    pub async fn add(&self, name: String, description: String) -> Item {
        let item = Item {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            created_at: Some(Utc::now()),
        };
        self.items.write().await.push(item.clone());
        info!(item_id = %item.id, "item created");
        item
    }
}

/// Names may be any non-empty scalar; numbers and `true` are stored as text.
/// Zero, `false`, null, objects and arrays are not names.
fn item_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

pub async fn list_items(State(state): State<Arc<AppState>>) -> Json<Vec<Item>> {
    Json(state.items.list().await)
}

pub async fn create_item(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(e) => {
            debug!(error = %e, "rejected item payload");
            return bad_request("Invalid request body");
        }
    };

    let Some(name) = body.get("name").and_then(item_name) else {
        return bad_request("Name is required");
    };
    let description = body
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let item = state.items.add(name, description).await;
    (StatusCode::CREATED, Json(item)).into_response()
}
