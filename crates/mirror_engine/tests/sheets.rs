use mirror_core::{CellAddress, CellRange};
use mirror_engine::{CellValue, RemoteStore, SheetsSettings, SheetsStore, StoreFailureKind};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cell(text: &str) -> CellAddress {
    text.parse().unwrap()
}

fn store(server: &MockServer) -> SheetsStore {
    let settings = SheetsSettings {
        api_base: format!("{}/v4/", server.uri()),
        ..SheetsSettings::default()
    };
    SheetsStore::new(settings, "sheet-id", "token-123").unwrap()
}

#[tokio::test]
async fn read_cell_returns_first_value() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-id/values/Codes!C1"))
        .and(header("authorization", "Bearer token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "Codes!C1",
            "majorDimension": "ROWS",
            "values": [["abc123"]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let value = store(&server).read_cell("Codes", cell("C1")).await.unwrap();
    assert_eq!(value.as_deref(), Some("abc123"));
}

#[tokio::test]
async fn read_cell_without_values_is_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-id/values/Codes!C1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "Codes!C1",
            "majorDimension": "ROWS"
        })))
        .mount(&server)
        .await;

    let value = store(&server).read_cell("Codes", cell("C1")).await.unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn read_cell_renders_non_string_values() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-id/values/Codes!C1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [[42]]
        })))
        .mount(&server)
        .await;

    let value = store(&server).read_cell("Codes", cell("C1")).await.unwrap();
    assert_eq!(value.as_deref(), Some("42"));
}

#[tokio::test]
async fn write_range_puts_rows_as_user_entered() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v4/spreadsheets/sheet-id/values/Codes!A1:B2"))
        .and(query_param("valueInputOption", "USER_ENTERED"))
        .and(body_json(json!({
            "range": "Codes!A1:B2",
            "majorDimension": "ROWS",
            "values": [[404, "Not Found"], [500, "Server Error"]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let range = CellRange::from_anchor(cell("A1"), 2, 2).unwrap();
    let rows = vec![
        (CellValue::Number(404), CellValue::Text("Not Found".into())),
        (CellValue::Number(500), CellValue::Text("Server Error".into())),
    ];
    store(&server)
        .write_range("Codes", range, &rows)
        .await
        .unwrap();
}

#[tokio::test]
async fn write_cell_puts_single_value() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v4/spreadsheets/sheet-id/values/Codes!C1"))
        .and(query_param("valueInputOption", "USER_ENTERED"))
        .and(body_json(json!({
            "range": "Codes!C1",
            "majorDimension": "ROWS",
            "values": [["deadbeef"]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .write_cell("Codes", cell("C1"), "deadbeef")
        .await
        .unwrap();
}

#[tokio::test]
async fn sheet_names_with_spaces_are_quoted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-id/values/'Error%20Codes'!C1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [["x"]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let value = store(&server)
        .read_cell("Error Codes", cell("C1"))
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("x"));
}

#[tokio::test]
async fn rejected_credentials_map_to_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let err = store(&server)
        .read_cell("Codes", cell("C1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, StoreFailureKind::Auth);
    assert_eq!(err.operation, "read");
    assert_eq!(err.message, "forbidden");
}

#[tokio::test]
async fn server_errors_keep_their_status() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = store(&server)
        .write_cell("Codes", cell("C1"), "x")
        .await
        .unwrap_err();
    assert_eq!(err.kind, StoreFailureKind::HttpStatus(503));
}

#[tokio::test]
async fn unparseable_read_response_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = store(&server)
        .read_cell("Codes", cell("C1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, StoreFailureKind::MalformedResponse);
}
