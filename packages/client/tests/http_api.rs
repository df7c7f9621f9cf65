//! HTTP API integration tests.
//!
//! Tests for REST API endpoints (health check, room list, room details).

mod fixtures;
use fixtures::{TestServer, get_json, joined_peer};

#[tokio::test]
async fn test_health_endpoint() {
    // テスト項目: /api/health エンドポイントが正常に動作する
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let (status, body) = get_json(&server, "/api/health").await;

    // then (期待する結果):
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_rooms_list_is_empty_before_any_join() {
    // テスト項目: 参加者がいなければルームは存在しない（ルームは遅延生成される）
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let (status, body) = get_json(&server, "/api/rooms").await;

    // then (期待する結果):
    assert_eq!(status, 200);
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn test_rooms_list_endpoint() {
    // テスト項目: /api/rooms が名前順のルーム一覧とメンバーを返す
    // given (前提条件):
    let server = TestServer::start().await;
    let _alice = joined_peer(&server, "alice", "lobby").await;
    let _bob = joined_peer(&server, "bob", "kitchen").await;

    // when (操作):
    let (status, body) = get_json(&server, "/api/rooms").await;

    // then (期待する結果):
    assert_eq!(status, 200);
    let rooms = body.as_array().expect("Response should be an array");
    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[0]["name"], "kitchen");
    assert_eq!(rooms[0]["members"], serde_json::json!(["bob"]));
    assert_eq!(rooms[1]["name"], "lobby");
    assert_eq!(rooms[1]["members"], serde_json::json!(["alice"]));
    assert!(rooms[0]["created_at"].is_string());
}

#[tokio::test]
async fn test_room_detail_endpoint_success() {
    // テスト項目: /api/rooms/{name} がメンバーの参加時刻付きで詳細を返す
    // given (前提条件):
    let server = TestServer::start().await;
    let _alice = joined_peer(&server, "alice", "lobby").await;

    // when (操作):
    let (status, body) = get_json(&server, "/api/rooms/lobby").await;

    // then (期待する結果):
    assert_eq!(status, 200);
    assert_eq!(body["name"], "lobby");
    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["username"], "alice");
    assert!(
        members[0]["joined_at"]
            .as_str()
            .unwrap()
            .ends_with("+09:00")
    );
}

#[tokio::test]
async fn test_room_detail_endpoint_not_found() {
    // テスト項目: 存在しないルームは 404 を返す
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let (status, _) = get_json(&server, "/api/rooms/nowhere").await;

    // then (期待する結果):
    assert_eq!(status, 404);
}
