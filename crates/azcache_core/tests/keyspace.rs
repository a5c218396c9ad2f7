use azcache_core::{
    BrowserSettings, CacheError, KeyContainer, KeyEntry, KeyType, KeyspaceBrowser, Target,
    classify, list_containers,
};
use azcache_test_support::fake_executor::FakeCommand;
use azcache_test_support::{FakeExecutor, fixtures};

const DB: Target = Target::Database(0);

#[tokio::test]
async fn classify_maps_type_names() {
    let fake = FakeExecutor::new()
        .with_type(&DB, "a", "hash")
        .with_type(&DB, "b", "stream");

    assert_eq!(classify(&fake, &DB, "a").await.unwrap(), KeyType::Hash);
    assert_eq!(
        classify(&fake, &DB, "b").await.unwrap(),
        KeyType::Other("stream".to_string())
    );
}

#[tokio::test]
async fn classify_keeps_module_type_names_verbatim() {
    let fake = FakeExecutor::new().with_type(&DB, "doc", "ReJSON-RL");

    assert_eq!(
        classify(&fake, &DB, "doc").await.unwrap(),
        KeyType::Other("ReJSON-RL".to_string())
    );
}

#[tokio::test]
async fn keyspace_page_isolates_classification_failures() {
    let fake = FakeExecutor::new()
        .with_scan(&DB, "0", "*", "0", &["a", "b", "c"])
        .with_type(&DB, "a", "string")
        .with_error(FakeCommand::new("TYPE", Some(&DB), &["b"]), "READONLY")
        .with_type(&DB, "c", "zset");

    let mut browser =
        KeyspaceBrowser::new(fake.clone().as_executor_arc(), DB, BrowserSettings::default());
    let page = browser.load_next_page(true).await.unwrap();

    assert_eq!(page.entries.len(), 3);
    assert_eq!(page.entries[0], KeyEntry::classified("a", KeyType::String));
    assert_eq!(page.entries[1].key, "b");
    assert_eq!(page.entries[1].key_type, None);
    assert!(page.entries[1].error.as_deref().unwrap().contains("READONLY"));
    assert_eq!(page.entries[2], KeyEntry::classified("c", KeyType::ZSet));
    assert!(!page.has_more);
    assert_eq!(fake.call_count("TYPE"), 3);
}

#[tokio::test]
async fn keyspace_filter_restarts_the_scan() {
    let fake = FakeExecutor::new()
        .with_scan(&DB, "0", "*", "9", &["user:1"])
        .with_scan(&DB, "0", "order:*", "0", &["order:1"])
        .with_type(&DB, "user:1", "hash")
        .with_type(&DB, "order:1", "list");

    let mut browser =
        KeyspaceBrowser::new(fake.clone().as_executor_arc(), DB, BrowserSettings::default());
    let first = browser.load_next_page(false).await.unwrap();
    assert!(first.is_reset);
    assert!(first.has_more);

    assert!(browser.update_filter("order:*"));
    let page = browser.load_next_page(false).await.unwrap();

    assert!(page.is_reset);
    assert_eq!(page.entries, vec![KeyEntry::classified("order:1", KeyType::List)]);
    assert!(!browser.has_next_page());

    browser.reset();
    assert_eq!(browser.filter(), "*");
    assert!(browser.has_next_page());
}

#[tokio::test]
async fn scan_failure_fails_the_keyspace_page() {
    let fake = FakeExecutor::new().with_error(
        FakeCommand::new("SCAN", Some(&DB), &["0", "*"]),
        "NOAUTH Authentication required.",
    );

    let mut browser = KeyspaceBrowser::new(fake.as_executor_arc(), DB, BrowserSettings::default());
    let err = browser.load_next_page(true).await.unwrap_err();

    assert!(matches!(err, CacheError::ConnectionFailed(_)));
    assert!(browser.has_next_page());
}

#[tokio::test]
async fn databases_come_from_info_keyspace() {
    let fake = FakeExecutor::new().with_info_keyspace(
        "# Keyspace\r\ndb0:keys=3,expires=0,avg_ttl=0\r\ndb4:keys=1,expires=0,avg_ttl=0\r\n",
    );

    let containers = list_containers(&fake, &fixtures::sample_resource())
        .await
        .unwrap();

    assert_eq!(
        containers,
        vec![
            KeyContainer::Database { index: 0 },
            KeyContainer::Database { index: 4 },
        ]
    );
    assert_eq!(containers[1].label(), "DB 4");
    assert_eq!(fake.call_count("CLUSTER"), 0);
}

#[tokio::test]
async fn empty_cache_lists_no_databases() {
    let fake = FakeExecutor::new().with_info_keyspace("# Keyspace\r\n");

    let containers = list_containers(&fake, &fixtures::sample_resource())
        .await
        .unwrap();

    assert!(containers.is_empty());
}

#[tokio::test]
async fn shards_are_sorted_by_port() {
    let fake = FakeExecutor::new().with_cluster_nodes(vec![
        fixtures::cluster_node("n3", 13003),
        fixtures::cluster_node("n0", 13000),
        fixtures::cluster_node("n2", 13002),
        fixtures::cluster_node("n1", 13001),
    ]);

    let containers = list_containers(&fake, &fixtures::clustered_resource(2))
        .await
        .unwrap();

    let labels: Vec<String> = containers.iter().map(KeyContainer::label).collect();
    assert_eq!(labels, vec!["Shard 0", "Shard 0", "Shard 1", "Shard 1"]);
    assert_eq!(containers[0].target(), Target::Node("n0".to_string()));
    assert_eq!(fake.call_count("INFO"), 0);
}
