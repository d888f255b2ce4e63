use loomerp_api::app::{build_app, services::AppServices};
use loomerp_core::Segment;
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory store, ephemeral port.
        let app = build_app(AppServices::in_memory(Segment::default()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap())
    }

    async fn create_item(&self, code: &str) -> String {
        let (status, body) = self
            .post(
                "/items",
                json!({
                    "code": code,
                    "name": format!("{code} 60x60"),
                    "stock_unit": "MTR",
                    "packing_unit": "ROLL"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_document(&self, path: &str, body: Value) -> Value {
        let (status, body) = self.post(path, body).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn document(no: &str, date: &str, item_id: &str, quantity: &str) -> Value {
    json!({
        "document_no": no,
        "date": date,
        "counterparty": "Sapphire Mills",
        "lines": [{ "item_id": item_id, "quantity": quantity }]
    })
}

#[tokio::test]
async fn health_uses_the_envelope() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn item_ledger_lifecycle() {
    let srv = TestServer::spawn().await;
    let item = srv.create_item("LAWN").await;

    let grn = srv
        .create_document(
            "/purchasing/goods-receipts",
            document("GRN-1", "2024-01-10", &item, "100"),
        )
        .await;

    let mut ret = document("PR-1", "2024-01-15", &item, "30");
    ret["goods_receipt_id"] = grn["header"]["id"].clone();
    srv.create_document("/purchasing/returns", ret).await;

    srv.create_document("/sales/returns", document("SR-1", "2024-01-20", &item, "5"))
        .await;

    let (status, body) = srv.get(&format!("/inventory/items/{item}/ledger")).await;
    assert_eq!(status, StatusCode::OK);

    let data = &body["data"];
    assert_eq!(data["item"]["code"], "LAWN");
    assert_eq!(data["segment"], "fabric");
    let balances: Vec<&str> = data["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["balance"].as_str().unwrap())
        .collect();
    assert_eq!(balances, vec!["100", "70", "75"]);
    assert_eq!(data["entries"][1]["source"], "purchase_return");
    assert_eq!(data["entries"][0]["date"], "2024-01-10");
    assert_eq!(data["closing_balance"], "75");
}

#[tokio::test]
async fn unknown_item_ledger_is_empty_not_missing() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv
        .get("/inventory/items/0190a0b2-6c1e-7cc3-9a31-6f1d7e3c2b10/ledger")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["item"].is_null());
    assert_eq!(body["data"]["entries"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn malformed_ids_and_bodies_are_rejected_with_envelope() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/inventory/items/not-a-uuid/ledger").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "invalid_id");

    let (status, body) = srv
        .post("/purchasing/goods-receipts", json!({ "document_no": "GRN-1" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");

    let (status, body) = srv.get("/items/0190a0b2-6c1e-7cc3-9a31-6f1d7e3c2b10").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn duplicate_document_number_is_a_conflict() {
    let srv = TestServer::spawn().await;
    let item = srv.create_item("LAWN").await;

    srv.create_document(
        "/sales/delivery-orders",
        document("DO-1", "2024-01-10", &item, "5"),
    )
    .await;
    let (status, body) = srv
        .post("/sales/delivery-orders", document("DO-1", "2024-01-11", &item, "5"))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn summary_is_segment_scoped_and_ordered_by_code() {
    let srv = TestServer::spawn().await;
    let lawn = srv.create_item("LAWN").await;
    let cotton = srv.create_item("COTTON").await;

    srv.create_document(
        "/purchasing/goods-receipts",
        document("GRN-1", "2024-01-10", &lawn, "100"),
    )
    .await;
    srv.create_document(
        "/sales/delivery-orders",
        document("DO-1", "2024-01-11", &cotton, "20"),
    )
    .await;

    let mut export = document("GRN-1", "2024-01-10", &lawn, "999");
    export["segment"] = json!("export");
    srv.create_document("/purchasing/goods-receipts", export).await;

    let (status, body) = srv.get("/inventory/summary").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["item_code"], "COTTON");
    assert_eq!(rows[0]["current_stock"], "-20");
    assert_eq!(rows[1]["item_code"], "LAWN");
    assert_eq!(rows[1]["current_stock"], "100");

    let (_, body) = srv.get("/inventory/summary?segment=export").await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["received"], "999");
}

#[tokio::test]
async fn conversions_feed_intake_and_lookup() {
    let srv = TestServer::spawn().await;
    let item = srv.create_item("LAWN").await;

    let (status, _) = srv
        .post("/units/conversions", json!({ "from": "roll", "to": "mtr", "factor": "50" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = srv.get("/units/convert?from=MTR&to=ROLL&quantity=125").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["converted"], "2.5");

    let (status, body) = srv.get("/units/convert?from=MTR&to=BALE&quantity=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let mut grn = document("GRN-1", "2024-01-10", &item, "3");
    grn["lines"][0]["unit"] = json!("ROLL");
    let created = srv.create_document("/purchasing/goods-receipts", grn).await;
    assert_eq!(created["lines"][0]["quantity"], "150");
}

#[tokio::test]
async fn invoice_reconciliation_flags_over_invoicing() {
    let srv = TestServer::spawn().await;
    let item = srv.create_item("LAWN").await;

    let grn = srv
        .create_document(
            "/purchasing/goods-receipts",
            document("GRN-1", "2024-01-10", &item, "100"),
        )
        .await;

    let invoice = srv
        .create_document(
            "/purchasing/invoices",
            json!({
                "invoice_no": "PI-1",
                "date": "2024-01-20",
                "supplier": "Sapphire Mills",
                "goods_receipt_ids": [grn["header"]["id"]],
                "lines": [{ "item_id": item, "quantity": "120", "rate": "95.5" }]
            }),
        )
        .await;

    let id = invoice["id"].as_str().unwrap();
    let (status, body) = srv
        .get(&format!("/purchasing/invoices/{id}/reconciliation"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fully_matched"], false);
    assert_eq!(body["data"]["lines"][0]["status"], "over_invoiced");
    assert_eq!(body["data"]["lines"][0]["variance"], "20");
}

#[tokio::test]
async fn invoices_report_their_total() {
    let srv = TestServer::spawn().await;
    let item = srv.create_item("LAWN").await;
    srv.post(
        "/units/conversions",
        json!({ "from": "YRD", "to": "MTR", "factor": "0.9144" }),
    )
    .await;

    let invoice = srv
        .create_document(
            "/purchasing/invoices",
            json!({
                "invoice_no": "PI-1",
                "date": "2024-01-20",
                "supplier": "Sapphire Mills",
                "lines": [
                    { "item_id": item, "quantity": "120", "rate": "95.5" },
                    { "item_id": item, "quantity": "10", "rate": "100", "unit": "YRD" }
                ]
            }),
        )
        .await;
    assert_eq!(invoice["lines"][1]["quantity"], "9.144");

    let total: f64 = invoice["total"].as_str().unwrap().parse().unwrap();
    assert!((total - 12460.0).abs() < 0.01, "total {total}");

    let (status, body) = srv.get("/purchasing/invoices").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["total"], invoice["total"]);
}

#[tokio::test]
async fn oversized_quantities_are_rejected_and_queries_keep_answering() {
    let srv = TestServer::spawn().await;
    let item = srv.create_item("LAWN").await;

    for no in ["GRN-1", "GRN-2"] {
        let (status, body) = srv
            .post(
                "/purchasing/goods-receipts",
                document(no, "2024-01-10", &item, "50000000000000000000000000000"),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["code"], "validation_error");
    }

    srv.post(
        "/units/conversions",
        json!({ "from": "BALE", "to": "MTR", "factor": "1000000" }),
    )
    .await;
    let mut bales = document("GRN-3", "2024-01-10", &item, "100000000000000000000000");
    bales["lines"][0]["unit"] = json!("BALE");
    let (status, body) = srv.post("/purchasing/goods-receipts", bales).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, body) = srv
        .post(
            "/units/conversions",
            json!({ "from": "ROLL", "to": "MTR", "factor": "1000000000" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    for no in ["GRN-4", "GRN-5"] {
        srv.create_document(
            "/purchasing/goods-receipts",
            document(no, "2024-01-11", &item, "1000000000"),
        )
        .await;
    }

    let (status, body) = srv.get(&format!("/inventory/items/{item}/ledger")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["closing_balance"], "2000000000");

    let (status, body) = srv.get("/inventory/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["received"], "2000000000");
}
