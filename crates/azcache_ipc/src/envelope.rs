use azcache_core::{
    CacheAccess, CacheError, CacheProperties, ErrorPayload, HostMessage, KeyContainer,
    PanelMessage,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire-level protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub major: u16,
    pub minor: u16,
}

impl ProtocolVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    pub const fn is_compatible_with(self, other: Self) -> bool {
        self.major == other.major
    }
}

pub const HOST_PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::new(1, 0);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloRequest {
    pub client_name: String,
    pub client_version: String,
    pub supported_versions: Vec<ProtocolVersion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloResponse {
    pub server_name: String,
    pub server_version: String,
    pub selected_version: ProtocolVersion,
    pub cache_name: String,
}

/// Well-known error categories for envelope responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostErrorCode {
    InvalidRequest,
    VersionMismatch,
    PanelNotFound,
    Cache,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRpcError {
    pub code: HostErrorCode,
    pub message: String,
    pub retriable: bool,
}

impl From<&CacheError> for HostRpcError {
    fn from(error: &CacheError) -> Self {
        Self {
            code: HostErrorCode::Cache,
            message: error.to_string(),
            retriable: error.is_retriable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostRequestBody {
    Hello(HelloRequest),
    CacheProperties,
    ListContainers,
    OpenKeyspace {
        container: KeyContainer,
    },
    OpenKey {
        container: KeyContainer,
        key: String,
    },
    Panel {
        panel_id: Uuid,
        message: PanelMessage,
    },
    ClosePanel {
        panel_id: Uuid,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRequest {
    pub protocol_version: ProtocolVersion,
    pub request_id: u64,
    pub body: HostRequestBody,
}

impl HostRequest {
    pub fn new(request_id: u64, body: HostRequestBody) -> Self {
        Self {
            protocol_version: HOST_PROTOCOL_VERSION,
            request_id,
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostResponseBody {
    Hello(HelloResponse),
    /// Metadata plus the access key and connection strings.
    CacheProperties {
        properties: CacheProperties,
        access: CacheAccess,
    },
    Containers {
        containers: Vec<KeyContainer>,
    },
    /// Messages a panel produced for one request.
    ///
    /// `panel_id` is absent when opening the panel failed; `messages` then
    /// ends with the `Error` message for the webview.
    PanelUpdate {
        panel_id: Option<Uuid>,
        messages: Vec<HostMessage>,
        error: Option<ErrorPayload>,
    },
    PanelClosed,
    Error(HostRpcError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostResponse {
    pub protocol_version: ProtocolVersion,
    pub request_id: u64,
    pub body: HostResponseBody,
}

impl HostResponse {
    pub fn ok(request_id: u64, body: HostResponseBody) -> Self {
        Self {
            protocol_version: HOST_PROTOCOL_VERSION,
            request_id,
            body,
        }
    }

    pub fn error(request_id: u64, code: HostErrorCode, message: impl Into<String>) -> Self {
        Self::ok(
            request_id,
            HostResponseBody::Error(HostRpcError {
                code,
                message: message.into(),
                retriable: false,
            }),
        )
    }

    pub fn cache_error(request_id: u64, error: &CacheError) -> Self {
        Self::ok(request_id, HostResponseBody::Error(HostRpcError::from(error)))
    }

    pub fn panel_update(
        request_id: u64,
        panel_id: Option<Uuid>,
        messages: Vec<HostMessage>,
        error: Option<&CacheError>,
    ) -> Self {
        Self::ok(
            request_id,
            HostResponseBody::PanelUpdate {
                panel_id,
                messages,
                error: error.map(ErrorPayload::from),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minor_versions_are_compatible() {
        assert!(ProtocolVersion::new(1, 3).is_compatible_with(HOST_PROTOCOL_VERSION));
        assert!(!ProtocolVersion::new(2, 0).is_compatible_with(HOST_PROTOCOL_VERSION));
    }

    #[test]
    fn panel_request_embeds_the_webview_message() {
        let panel_id = Uuid::nil();
        let request = HostRequest::new(
            7,
            HostRequestBody::Panel {
                panel_id,
                message: PanelMessage::FilterChange("user:*".into()),
            },
        );

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "protocol_version": {"major": 1, "minor": 0},
                "request_id": 7,
                "body": {"Panel": {
                    "panel_id": "00000000-0000-0000-0000-000000000000",
                    "message": {"command": "FilterChange", "value": "user:*"}
                }}
            })
        );
    }

    #[test]
    fn open_key_request_parses() {
        let request: HostRequest = serde_json::from_value(json!({
            "protocol_version": {"major": 1, "minor": 0},
            "request_id": 3,
            "body": {"OpenKey": {
                "container": {"kind": "database", "index": 2},
                "key": "session:42"
            }}
        }))
        .unwrap();

        assert_eq!(
            request.body,
            HostRequestBody::OpenKey {
                container: KeyContainer::Database { index: 2 },
                key: "session:42".into(),
            }
        );
    }

    #[test]
    fn cache_errors_keep_retriability() {
        let response = HostResponse::cache_error(1, &CacheError::connection_failed("reset"));

        let HostResponseBody::Error(error) = response.body else {
            panic!("expected an error body");
        };
        assert_eq!(error.code, HostErrorCode::Cache);
        assert!(error.retriable);
    }
}
