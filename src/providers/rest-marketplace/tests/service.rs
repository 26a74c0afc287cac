use mpc_core::model::{Node, NodeId};
use mpc_core::service::{
    describe_install_failure, InstallReport, MarketplaceService, NetworkErrorKind, SearchQuery,
    ServiceError, CONNECTION_HINT,
};
use rest_marketplace::{RestMarketplaceConfig, RestMarketplaceService};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service(server: &MockServer, token: Option<&str>) -> RestMarketplaceService {
    let mut config = RestMarketplaceConfig::new(server.uri());
    config.access_token = token.map(str::to_string);
    RestMarketplaceService::new(config).expect("service")
}

fn listing(id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "updateUrl": "https://download.example.org/updates/",
        "ius": [{"id": format!("org.example.{id}.feature.group")}],
        "tags": [{"name": "tools"}]
    })
}

#[tokio::test]
async fn fetches_listing_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/listings/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing("42", "Example")))
        .mount(&server)
        .await;

    let node = service(&server, None)
        .node(&NodeId::new("42"))
        .await
        .expect("listing");
    assert_eq!(node.name.as_deref(), Some("Example"));
    assert!(node.is_installable());
    assert_eq!(node.tags.names().collect::<Vec<_>>(), vec!["tools"]);
}

#[tokio::test]
async fn path_like_listing_ids_do_not_escape_the_listing_endpoint() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v1/user/favorites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/listings/..%2Fuser%2Ffavorites"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let service = service(&server, Some("secret"));
    let err = service
        .node(&NodeId::new("../user/favorites"))
        .await
        .expect_err("unknown listing");
    assert!(matches!(err, ServiceError::NotFound { .. }));
    assert!(service.node(&NodeId::new("..")).await.is_err());
    assert!(service
        .report_install(&NodeId::new(".."), &InstallReport::Success)
        .await
        .is_err());
}

#[tokio::test]
async fn missing_listing_is_not_found_and_skipped_in_batches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/listings/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing("1", "One")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/listings/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let service = service(&server, None);
    let err = service.node(&NodeId::new("2")).await.expect_err("404");
    assert!(matches!(err, ServiceError::NotFound { .. }));

    let nodes = service
        .nodes(&[NodeId::new("1"), NodeId::new("2")])
        .await
        .expect("batch");
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].id, Some(NodeId::new("1")));
}

#[tokio::test]
async fn search_sends_filters_and_reads_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/listings"))
        .and(query_param("q", "rust"))
        .and(query_param("marketId", "m1"))
        .and(query_param("pageSize", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [listing("1", "One"), listing("2", "Two")],
            "meta": {"totalCount": 12, "pageSize": 20, "currentPage": 0}
        })))
        .mount(&server)
        .await;

    let result = service(&server, None)
        .search(&SearchQuery::text("rust").in_market("m1"))
        .await
        .expect("search");
    assert_eq!(result.match_count, 12);
    assert_eq!(result.nodes.len(), 2);
}

#[tokio::test]
async fn markets_keep_categories() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/markets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "m1",
                "name": "Tools",
                "categories": [{"id": "c1", "name": "Editors", "count": 3}]
            }]
        })))
        .mount(&server)
        .await;

    let markets = service(&server, None).markets().await.expect("markets");
    assert_eq!(markets.len(), 1);
    let category = markets[0].category("c1").expect("category");
    assert_eq!(category.count, Some(3));
}

#[tokio::test]
async fn catalogs_carry_branding_and_news() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/catalogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "c1",
                "name": "Example Marketplace",
                "url": "https://marketplace.example.org/",
                "selfContained": true,
                "branding": {"wizardTitle": "Example", "hasRelatedTab": true},
                "news": {"shortTitle": "New!", "timestamp": 1700000000}
            }]
        })))
        .mount(&server)
        .await;

    let catalogs = service(&server, None).catalogs().await.expect("catalogs");
    let catalog = &catalogs[0];
    assert!(catalog.self_contained);
    let branding = catalog.branding.as_ref().expect("branding");
    assert!(branding.has_related_tab);
    assert!(branding.has_search_tab);
    assert_eq!(
        catalog.news.as_ref().and_then(|n| n.short_title.as_deref()),
        Some("New!")
    );
}

#[tokio::test]
async fn absent_news_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/news"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(service(&server, None).news().await.expect("news").is_none());
}

#[tokio::test]
async fn favorite_list_is_resolved_by_url() {
    let server = MockServer::start().await;
    let favorites_url = "https://marketplace.example.org/user/alice/favorites";
    Mock::given(method("GET"))
        .and(path("/api/v1/favorites"))
        .and(query_param("url", favorites_url))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "fav-1",
            "owner": "alice",
            "listings": [listing("7", "Seven")]
        })))
        .mount(&server)
        .await;

    let list = service(&server, None)
        .favorite_list(favorites_url)
        .await
        .expect("favorites");
    assert_eq!(list.owner.as_deref(), Some("alice"));
    assert!(list.contains(&Node::with_id("7")));
}

#[tokio::test]
async fn user_favorites_send_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user/favorites"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [listing("3", "Three")]
        })))
        .mount(&server)
        .await;

    let result = service(&server, Some("secret-token"))
        .user_favorites()
        .await
        .expect("favorites");
    assert_eq!(result.nodes.len(), 1);

    let err = service(&server, None)
        .user_favorites()
        .await
        .expect_err("no token");
    assert!(matches!(err, ServiceError::Authentication { .. }));
}

#[tokio::test]
async fn unauthorized_maps_to_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user/favorites"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = service(&server, Some("expired"))
        .user_favorites()
        .await
        .expect_err("401");
    assert!(matches!(err, ServiceError::Authentication { .. }));
}

#[tokio::test]
async fn updates_favorites_with_listing_refs() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/user/favorites"))
        .and(body_json(json!({"listings": [{"id": "1"}, {"id": "2"}]})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    service(&server, Some("token"))
        .update_user_favorites(&[Node::with_id("1"), Node::with_id("2"), Node::default()])
        .await
        .expect("update");
}

#[tokio::test]
async fn reports_install_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/listings/42/installs"))
        .and(body_json(json!({"success": false, "ius": ["org.example.a"]})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    service(&server, None)
        .report_install(
            &NodeId::new("42"),
            &InstallReport::Failure {
                ius: vec!["org.example.a".into()],
            },
        )
        .await
        .expect("reported");
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/categories/9"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = service(&server, None).category("9").await.expect_err("html");
    assert!(matches!(err, ServiceError::Decode { .. }));
}

#[tokio::test]
async fn server_errors_keep_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/listings/popular"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = service(&server, None).popular().await.expect_err("503");
    assert!(matches!(err, ServiceError::Http { status: 503, .. }));
}

#[tokio::test]
async fn unreachable_server_yields_connection_hint() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let uri = format!("http://{}", listener.local_addr().expect("addr"));
    drop(listener);

    let service = RestMarketplaceService::new(RestMarketplaceConfig::new(uri)).expect("service");
    let err = service.recent().await.expect_err("connection refused");
    match &err {
        ServiceError::Network { kind, .. } => assert_eq!(*kind, NetworkErrorKind::Connect),
        other => panic!("expected network error, got {other:?}"),
    }
    let status = describe_install_failure("Example", &err);
    assert!(status.message().contains(CONNECTION_HINT));
}
