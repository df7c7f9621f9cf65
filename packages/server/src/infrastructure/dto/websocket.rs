//! WebSocket frame DTOs shared by the server and the peers.
//!
//! Every frame is one JSON object tagged by `type`. Binary payloads travel as
//! lowercase hex strings.

use serde::{Deserialize, Serialize};

/// Informational result / announcement.
pub const CODE_OK: u16 = 200;
/// A member left the room.
pub const CODE_MEMBER_LEFT: u16 = 400;
/// Username already in use in the requested room.
pub const CODE_USERNAME_CONFLICT: u16 = 409;

fn code_ok() -> u16 {
    CODE_OK
}

fn code_member_left() -> u16 {
    CODE_MEMBER_LEFT
}

/// Display color hint carried by server frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageColor {
    Green,
    Red,
    Blue,
}

/// Every frame kind exchanged over the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frame {
    JoinRoom(JoinRoomFrame),
    LeaveRoom(LeaveRoomFrame),
    ChatMessage(ChatMessageFrame),
    MediaMessage(MediaMessageFrame),
    SystemMessage(SystemMessageFrame),
    UserMessage(UserMessageFrame),
}

impl Frame {
    /// Parse one text frame. Unknown `type` values are rejected.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Wire name of the frame kind, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::JoinRoom(_) => "JOIN_ROOM",
            Frame::LeaveRoom(_) => "LEAVE_ROOM",
            Frame::ChatMessage(_) => "CHAT_MESSAGE",
            Frame::MediaMessage(_) => "MEDIA_MESSAGE",
            Frame::SystemMessage(_) => "SYSTEM_MESSAGE",
            Frame::UserMessage(_) => "USER_MESSAGE",
        }
    }
}

/// Request to join (and possibly create) a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomFrame {
    pub username: String,
    pub room: String,
    #[serde(default = "code_ok")]
    pub code: u16,
    /// Peer's PKCS#1 PEM public key, plaintext
    pub public_key: String,
}

/// Explicit departure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRoomFrame {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub room: String,
    #[serde(default = "code_member_left")]
    pub code: u16,
}

/// Outgoing chat text, encrypted under the room public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageFrame {
    pub username: String,
    pub room: String,
    /// Hex ciphertext
    pub message: String,
    #[serde(default = "code_ok")]
    pub code: u16,
}

/// Binary attachment; the bytes are hex encoded but not encrypted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMessageFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<MessageColor>,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// Hex raw bytes
    pub message: String,
    pub filename: String,
    #[serde(default = "code_ok")]
    pub code: u16,
}

/// Join results and join/leave announcements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemMessageFrame {
    pub color: MessageColor,
    pub message: String,
    pub code: u16,
    /// Hex ciphertext of the room public key PEM, on join success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Hex ciphertext of the room private key PEM, on join success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    /// Departing member, on leave announcements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

impl SystemMessageFrame {
    /// Plain announcement without key material
    pub fn notice(color: MessageColor, code: u16, message: impl Into<String>) -> Self {
        Self {
            color,
            message: message.into(),
            code,
            public_key: None,
            private_key: None,
            username: None,
            room: None,
        }
    }
}

/// Relayed chat text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessageFrame {
    pub color: MessageColor,
    pub username: String,
    /// Hex ciphertext, passed through unchanged
    pub message: String,
    #[serde(default = "code_ok")]
    pub code: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_join_room_frame() {
        // テスト項目: JOIN_ROOM の JSON を型付きのフレームとして解釈できる
        // given (前提条件):
        let text = r#"{"type":"JOIN_ROOM","username":"alice","room":"lobby","code":200,"public_key":"PEM"}"#;

        // when (操作):
        let frame = Frame::from_json(text).unwrap();

        // then (期待する結果):
        assert_eq!(
            frame,
            Frame::JoinRoom(JoinRoomFrame {
                username: "alice".to_string(),
                room: "lobby".to_string(),
                code: 200,
                public_key: "PEM".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_chat_message_ignores_unknown_fields() {
        // テスト項目: 未知のフィールド（filename: null など）は無視される
        // given (前提条件):
        let text = r#"{"type":"CHAT_MESSAGE","username":"alice","room":"lobby","message":"abcd","code":200,"filename":null}"#;

        // when (操作):
        let frame = Frame::from_json(text).unwrap();

        // then (期待する結果):
        assert!(matches!(frame, Frame::ChatMessage(ref chat) if chat.message == "abcd"));
        assert_eq!(frame.kind(), "CHAT_MESSAGE");
    }

    #[test]
    fn test_parse_unknown_type_fails() {
        // テスト項目: 未知の type はプロトコルエラーとして拒否される
        // given (前提条件):
        let text = r#"{"type":"SHUTDOWN","username":"alice"}"#;

        // when (操作):
        let result = Frame::from_json(text);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_missing_field_fails() {
        // テスト項目: 必須フィールドが欠けたフレームは拒否される
        // given (前提条件): public_key が無い
        let text = r#"{"type":"JOIN_ROOM","username":"alice","room":"lobby"}"#;

        // when (操作):
        let result = Frame::from_json(text);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_system_message_serializes_without_empty_fields() {
        // テスト項目: 409 応答は鍵フィールドを含まずにシリアライズされる
        // given (前提条件):
        let frame = Frame::SystemMessage(SystemMessageFrame::notice(
            MessageColor::Red,
            CODE_USERNAME_CONFLICT,
            "taken",
        ));

        // when (操作):
        let json: serde_json::Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();

        // then (期待する結果):
        assert_eq!(json["type"], "SYSTEM_MESSAGE");
        assert_eq!(json["color"], "red");
        assert_eq!(json["code"], 409);
        assert!(json.get("public_key").is_none());
        assert!(json.get("private_key").is_none());
    }

    #[test]
    fn test_leave_room_defaults_code() {
        // テスト項目: LEAVE_ROOM の code は省略時 400 になる
        // when (操作):
        let frame = Frame::from_json(r#"{"type":"LEAVE_ROOM","username":"a","room":"r"}"#).unwrap();

        // then (期待する結果):
        assert!(matches!(frame, Frame::LeaveRoom(LeaveRoomFrame { code: 400, .. })));
    }
}
