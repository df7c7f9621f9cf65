//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use kakurega_shared::time::timestamp_to_jst_rfc3339;

use crate::{
    domain::{Room, RoomName},
    infrastructure::dto::http::{MemberDetailDto, RoomDetailDto, RoomSummaryDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// List every live room, sorted by name
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.repository.list_rooms().await;
    Json(rooms.iter().map(to_summary).collect())
}

/// Get room detail by name
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_name): Path<String>,
) -> Result<Json<RoomDetailDto>, StatusCode> {
    let Ok(name) = RoomName::new(room_name) else {
        return Err(StatusCode::NOT_FOUND);
    };
    let room = state
        .repository
        .get_room(&name)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;

    Ok(Json(RoomDetailDto {
        name: room.name.to_string(),
        members: room
            .members
            .iter()
            .map(|m| MemberDetailDto {
                username: m.username.to_string(),
                joined_at: timestamp_to_jst_rfc3339(m.joined_at.value()),
            })
            .collect(),
        created_at: timestamp_to_jst_rfc3339(room.created_at.value()),
    }))
}

fn to_summary(room: &Room) -> RoomSummaryDto {
    RoomSummaryDto {
        name: room.name.to_string(),
        members: room.members.iter().map(|m| m.username.to_string()).collect(),
        created_at: timestamp_to_jst_rfc3339(room.created_at.value()),
    }
}
