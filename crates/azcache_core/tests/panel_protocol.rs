use azcache_core::{
    BrowserSettings, CacheError, CollectionElement, CollectionPayload, ErrorKind, HostMessage,
    KeyEntry, KeyType, KeyspacePayload, Panel, PanelMessage, SupportedKeyType, Target,
    WebviewView,
};
use azcache_test_support::fake_executor::FakeCommand;
use azcache_test_support::{FakeExecutor, fixtures};
use serde_json::json;

const DB: Target = Target::Database(0);

async fn open_key(fake: &FakeExecutor, key: &str) -> (Result<Panel, CacheError>, Vec<HostMessage>) {
    let mut messages = Vec::new();
    let panel = Panel::open_key(
        fake.clone().as_executor_arc(),
        DB,
        key,
        BrowserSettings::default(),
        &mut messages,
    )
    .await;
    (panel, messages)
}

#[tokio::test]
async fn opening_a_hash_sends_header_then_first_page() {
    let fake = FakeExecutor::new()
        .with_type(&DB, "h", "hash")
        .with_cardinality("HLEN", &DB, "h", 2)
        .with_hscan(&DB, "h", "0", "*", "0", &["f1", "1", "f2", "2"]);

    let (panel, messages) = open_key(&fake, "h").await;
    assert!(panel.is_ok());

    assert_eq!(
        messages,
        vec![
            HostMessage::View(WebviewView::CollectionKey),
            HostMessage::KeyType(SupportedKeyType::Hash),
            HostMessage::KeyName("h".into()),
            HostMessage::Filter("*".into()),
            HostMessage::CollectionSize(2),
            HostMessage::CollectionData(CollectionPayload {
                data: vec![
                    CollectionElement::with_id("f1", "1"),
                    CollectionElement::with_id("f2", "2"),
                ],
                clear_cache: true,
                has_more: false,
            }),
        ]
    );
}

#[tokio::test]
async fn load_more_appends_the_next_window() {
    let fake = FakeExecutor::new()
        .with_type(&DB, "l", "list")
        .with_list(&DB, "l", fixtures::numbered("v", 11));

    let (panel, _) = open_key(&fake, "l").await;
    let mut panel = panel.unwrap();

    let mut messages = Vec::new();
    panel.handle(PanelMessage::LoadMore, &mut messages).await.unwrap();

    assert_eq!(
        messages,
        vec![HostMessage::CollectionData(CollectionPayload {
            data: vec![CollectionElement::new("v10")],
            clear_cache: false,
            has_more: false,
        })]
    );
}

#[tokio::test]
async fn empty_filter_change_means_match_all() {
    let fake = FakeExecutor::new()
        .with_type(&DB, "s", "set")
        .with_cardinality("SCARD", &DB, "s", 1)
        .with_sscan(&DB, "s", "0", "*", "0", &["m"])
        .with_sscan(&DB, "s", "0", "x*", "0", &[]);

    let (panel, _) = open_key(&fake, "s").await;
    let mut panel = panel.unwrap();

    let mut messages = Vec::new();
    panel
        .handle(PanelMessage::FilterChange("x*".into()), &mut messages)
        .await
        .unwrap();
    assert_eq!(messages[0], HostMessage::Filter("x*".into()));

    messages.clear();
    panel
        .handle(PanelMessage::FilterChange(String::new()), &mut messages)
        .await
        .unwrap();

    assert_eq!(messages[0], HostMessage::Filter("*".into()));
    assert_eq!(
        messages[1],
        HostMessage::CollectionData(CollectionPayload {
            data: vec![CollectionElement::new("m")],
            clear_cache: true,
            has_more: false,
        })
    );
    assert_eq!(
        fake.executed().pop().unwrap(),
        FakeCommand::new("SSCAN", Some(&DB), &["s", "0", "*"])
    );
}

#[tokio::test]
async fn filter_change_on_a_list_is_ignored() {
    let fake = FakeExecutor::new()
        .with_type(&DB, "l", "list")
        .with_list(&DB, "l", fixtures::numbered("v", 3));

    let (panel, _) = open_key(&fake, "l").await;
    let mut panel = panel.unwrap();
    fake.clear_log();

    let mut messages = Vec::new();
    panel
        .handle(PanelMessage::FilterChange("v*".into()), &mut messages)
        .await
        .unwrap();

    assert!(messages.is_empty());
    assert!(fake.executed().is_empty());
}

#[tokio::test]
async fn refresh_recovers_after_an_error() {
    let fake = FakeExecutor::new()
        .with_type(&DB, "h", "hash")
        .with_cardinality("HLEN", &DB, "h", 2)
        .with_hscan(&DB, "h", "0", "*", "5", &["f1", "1"])
        .with_error(
            FakeCommand::new("HSCAN", Some(&DB), &["h", "5", "*"]),
            "connection reset",
        );

    let (panel, _) = open_key(&fake, "h").await;
    let mut panel = panel.unwrap();

    let mut messages = Vec::new();
    let err = panel
        .handle(PanelMessage::LoadMore, &mut messages)
        .await
        .unwrap_err();
    assert!(err.is_retriable());

    let HostMessage::Error(payload) = &messages[0] else {
        panic!("expected an error message, got {:?}", messages);
    };
    assert_eq!(payload.kind, ErrorKind::Transient);

    messages.clear();
    panel.handle(PanelMessage::Refresh, &mut messages).await.unwrap();

    assert_eq!(
        messages,
        vec![
            HostMessage::Filter("*".into()),
            HostMessage::CollectionSize(2),
            HostMessage::CollectionData(CollectionPayload {
                data: vec![CollectionElement::with_id("f1", "1")],
                clear_cache: true,
                has_more: true,
            }),
        ]
    );
}

#[tokio::test]
async fn string_key_opens_a_viewer() {
    let fake = FakeExecutor::new()
        .with_type(&DB, "greeting", "string")
        .with_string(&DB, "greeting", Some("hello"));

    let (panel, messages) = open_key(&fake, "greeting").await;
    let mut panel = panel.unwrap();

    assert_eq!(
        messages,
        vec![
            HostMessage::View(WebviewView::StringKey),
            HostMessage::KeyType(SupportedKeyType::String),
            HostMessage::KeyName("greeting".into()),
            HostMessage::StringData("hello".into()),
        ]
    );

    let mut messages = Vec::new();
    panel.handle(PanelMessage::LoadMore, &mut messages).await.unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn vanished_string_key_is_reported() {
    let fake = FakeExecutor::new()
        .with_type(&DB, "gone", "string")
        .with_string(&DB, "gone", None);

    let (panel, messages) = open_key(&fake, "gone").await;

    assert!(matches!(panel, Err(CacheError::ConnectionFailed(_))));
    assert!(matches!(messages.last(), Some(HostMessage::Error(_))));
}

#[tokio::test]
async fn unsupported_type_is_reported() {
    let fake = FakeExecutor::new().with_type(&DB, "events", "stream");

    let (panel, messages) = open_key(&fake, "events").await;

    assert!(matches!(panel, Err(CacheError::NotSupported(_))));
    let HostMessage::Error(payload) = &messages[0] else {
        panic!("expected an error message, got {:?}", messages);
    };
    assert_eq!(payload.kind, ErrorKind::Unsupported);
}

#[tokio::test]
async fn keyspace_panel_lists_classified_keys() {
    let fake = FakeExecutor::new()
        .with_scan(&DB, "0", "*", "0", &["k"])
        .with_type(&DB, "k", "set");

    let mut messages = Vec::new();
    Panel::open_keyspace(
        fake.as_executor_arc(),
        DB,
        BrowserSettings::default(),
        &mut messages,
    )
    .await
    .unwrap();

    assert_eq!(
        messages,
        vec![
            HostMessage::View(WebviewView::Keyspace),
            HostMessage::Filter("*".into()),
            HostMessage::KeyspaceData(KeyspacePayload {
                data: vec![KeyEntry::classified("k", KeyType::Set)],
                clear_cache: true,
                has_more: false,
            }),
        ]
    );
}

#[test]
fn wire_format_uses_command_and_value() {
    let message = HostMessage::CollectionData(CollectionPayload {
        data: vec![
            CollectionElement::with_id("f1", "1"),
            CollectionElement::new("m"),
        ],
        clear_cache: true,
        has_more: false,
    });

    assert_eq!(
        serde_json::to_value(&message).unwrap(),
        json!({
            "command": "CollectionData",
            "value": {
                "data": [{"id": "f1", "value": "1"}, {"value": "m"}],
                "clearCache": true,
                "hasMore": false
            }
        })
    );

    assert_eq!(
        serde_json::to_value(HostMessage::CollectionSize(15)).unwrap(),
        json!({"command": "CollectionSize", "value": 15})
    );
    assert_eq!(
        serde_json::to_value(HostMessage::View(WebviewView::CollectionKey)).unwrap(),
        json!({"command": "View", "value": "collectionKey"})
    );
    assert_eq!(
        serde_json::to_value(PanelMessage::LoadMore).unwrap(),
        json!({"command": "LoadMore"})
    );
}
