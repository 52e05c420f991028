use dealdesk_cloud::{CloudConfig, CloudError, RestGateway};
use dealdesk_model::{RecordId, Table};
use dealdesk_sync::{GatewayError, RemoteGateway};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer) -> RestGateway {
    RestGateway::new(CloudConfig::new(server.uri(), "anon-key")).unwrap()
}

// --- Reads ---

#[tokio::test]
async fn select_sends_auth_headers_and_newest_first_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/deals"))
        .and(query_param("select", "*"))
        .and(query_param("order", "created_at.desc"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "d2"}, {"id": "d1"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let rows = gateway(&server).select(Table::Deals).await.unwrap();
    assert_eq!(rows, vec![json!({"id": "d2"}), json!({"id": "d1"})]);
}

#[tokio::test]
async fn select_uses_wire_table_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_moves"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    assert!(gateway(&server).select(Table::DailyMoves).await.unwrap().is_empty());
}

#[tokio::test]
async fn select_by_id_filters_on_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/debts"))
        .and(query_param("id", "eq.b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "b1"}])))
        .mount(&server)
        .await;

    let gw = gateway(&server);
    let row = gw.select_by_id(Table::Debts, &RecordId::remote("b1")).await.unwrap();
    assert_eq!(row, Some(json!({"id": "b1"})));
}

#[tokio::test]
async fn select_by_id_missing_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/debts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let row = gateway(&server)
        .select_by_id(Table::Debts, &RecordId::remote("nope"))
        .await
        .unwrap();
    assert!(row.is_none());
}

// --- Writes ---

#[tokio::test]
async fn insert_is_an_idempotent_upsert() {
    let server = MockServer::start().await;
    let record = json!({"id": "0b7c", "creditor_name": "Bank", "amount": 1000});
    Mock::given(method("POST"))
        .and(path("/rest/v1/debts"))
        .and(header_exists("prefer"))
        .and(body_json(&record))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([record])))
        .expect(2)
        .mount(&server)
        .await;

    let gw = gateway(&server);
    let first = gw.insert(Table::Debts, &record).await.unwrap();
    let second = gw.insert(Table::Debts, &record).await.unwrap();
    assert_eq!(first, record);
    assert_eq!(first, second);

    let requests = server.received_requests().await.unwrap();
    let prefer = requests[0].headers.get("prefer").unwrap().to_str().unwrap();
    assert_eq!(prefer, "return=representation,resolution=merge-duplicates");
}

#[tokio::test]
async fn update_patches_by_id_and_returns_row() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/deals"))
        .and(query_param("id", "eq.d1"))
        .and(body_json(json!({"stage": "في تفاوض"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": "d1", "stage": "في تفاوض"}])),
        )
        .mount(&server)
        .await;

    let row = gateway(&server)
        .update(Table::Deals, &RecordId::remote("d1"), &json!({"stage": "في تفاوض"}))
        .await
        .unwrap();
    assert_eq!(row["stage"], "في تفاوض");
}

#[tokio::test]
async fn update_matching_no_row_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .update(Table::Deals, &RecordId::remote("gone"), &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::NotFound("gone".into()));
}

#[tokio::test]
async fn delete_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/tasks"))
        .and(query_param("id", "eq.t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "t1"}])))
        .expect(1)
        .mount(&server)
        .await;

    gateway(&server)
        .delete(Table::Tasks, &RecordId::remote("t1"))
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_of_missing_row_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .delete(Table::Tasks, &RecordId::remote("t9"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)));
}

// --- Error mapping ---

#[tokio::test]
async fn client_error_is_rejected_with_store_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"message": "null value in column \"name\""})),
        )
        .mount(&server)
        .await;

    let err = gateway(&server)
        .insert(Table::Deals, &json!({"id": "x"}))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GatewayError::Rejected {
            status: Some(400),
            message: "null value in column \"name\"".into()
        }
    );
    assert!(!err.is_connectivity());
}

#[tokio::test]
async fn service_unavailable_counts_as_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = gateway(&server).select(Table::Jobs).await.unwrap_err();
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn http_404_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such table"))
        .mount(&server)
        .await;

    let err = gateway(&server).select(Table::Files).await.unwrap_err();
    assert_eq!(err, GatewayError::NotFound("no such table".into()));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = gateway(&server).select(Table::Calls).await.unwrap_err();
    assert!(matches!(err, GatewayError::Decode(_)));
}

#[tokio::test]
async fn refused_connection_is_unreachable() {
    let config = CloudConfig {
        base_url: "http://127.0.0.1:1".into(),
        api_key: "k".into(),
        timeout_secs: 2,
    };
    let err = RestGateway::new(config)
        .unwrap()
        .select(Table::Deals)
        .await
        .unwrap_err();
    assert!(err.is_connectivity());
}

#[test]
fn empty_base_url_is_a_config_error() {
    let err = RestGateway::new(CloudConfig::new("  ", "k")).err().unwrap();
    assert!(matches!(err, CloudError::Config(_)));
}
