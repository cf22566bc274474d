use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use clauseguard_appcore::AppService;
use clauseguard_core::analysis::AnalysisType;
use clauseguard_core::config::AppConfig;
use clauseguard_core::contract::ContractStatus;
use clauseguard_core::risk::RiskLevel;
use clauseguard_core::route::{Route, Screen};
use clauseguard_core::toast::ToastVariant;
use clauseguard_core::types::ContractId;
use clauseguard_core::upload::{MAX_UPLOAD_BYTES, UploadRejection};
use clauseguard_engine::error::ClientError;
use clauseguard_engine::traits::MemoryVault;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn config(server: &MockServer) -> AppConfig {
    AppConfig {
        api_base: format!("{}/api/v1", server.uri()),
        supabase_url: server.uri(),
        supabase_anon_key: "anon-key".into(),
        poll_interval_ms: 1,
        ..Default::default()
    }
}

async fn mount_identity(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "user": {"id": "user-1", "email": "ann@example.com"}
        })))
        .mount(server)
        .await;
}

async fn mount_empty_list(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/contracts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"data": {"contracts": []}})),
        )
        .mount(server)
        .await;
}

async fn signed_in(server: &MockServer) -> AppService {
    let svc = AppService::new(config(server), Arc::new(MemoryVault::default())).unwrap();
    svc.init().await;
    svc.sign_in("ann@example.com", "correct horse").await.unwrap();
    svc
}

struct ProcessingTwice {
    calls: AtomicU32,
}

impl Respond for ProcessingTwice {
    fn respond(&self, _req: &Request) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let body = if n < 2 {
            serde_json::json!({"data": {"status": "processing"}})
        } else {
            serde_json::json!({"data": {
                "status": "completed",
                "risk_score": 48.6,
                "risk_level": "medium",
                "risk_factors": [
                    {"category": "Red Flags", "severity": "high", "description": "Auto-renewal"},
                    {"category": "Missing Protection", "severity": "low", "description": "No cap"}
                ],
                "key_terms": {"notice_period": "30 days"}
            }})
        };
        ResponseTemplate::new(200).set_body_json(body)
    }
}

#[tokio::test]
async fn lease_is_uploaded_and_analyzed() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    mount_empty_list(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/contracts/upload"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "data": {"contract_id": 7, "filename": "lease.pdf", "file_size": 2097152}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/contracts/7/analyze"))
        .and(body_json(serde_json::json!({"analysis_type": "individual"})))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/contracts/7/analysis"))
        .respond_with(ProcessingTwice {
            calls: AtomicU32::new(0),
        })
        .expect(3)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let lease = dir.path().join("lease.pdf");
    std::fs::write(&lease, vec![0u8; 2 * 1024 * 1024]).unwrap();

    let svc = signed_in(&server).await;
    assert_eq!(svc.screen("/upload"), Screen::Page(Route::Upload));

    let contract = svc.upload_path(&lease).await.unwrap();
    assert_eq!(contract.id, ContractId::new("7"));
    assert_eq!(contract.status, ContractStatus::Uploaded);
    assert_eq!(svc.upload_flow().state().progress.percent(), 100);

    let (screen, handle) = svc.start_analysis(contract.id.clone(), AnalysisType::Individual);
    let analysis = handle.wait().await.unwrap();
    assert_eq!(analysis.rounded_score(), 49);
    assert_eq!(analysis.level(), Some(RiskLevel::Medium));
    assert_eq!(screen.state().label(), "completed");

    let stored = svc.store().get(&contract.id).unwrap();
    assert_eq!(stored.status, ContractStatus::Analyzed);
    assert_eq!(stored.risk_level.as_deref(), Some("medium"));

    let titles: Vec<String> = svc.toasts().snapshot().into_iter().map(|t| t.title).collect();
    assert_eq!(
        titles,
        vec!["Upload Successful", "Analysis Started", "Analysis Complete"]
    );
}

#[tokio::test]
async fn executable_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    mount_empty_list(&server).await;
    Mock::given(path("/api/v1/contracts/upload"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let exe = dir.path().join("malware.exe");
    std::fs::write(&exe, b"MZ").unwrap();

    let svc = signed_in(&server).await;
    let err = svc.upload_path(&exe).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(
        svc.upload_flow().state().error.as_deref(),
        Some("Invalid file type. Please upload PDF, DOCX, DOC, or TXT files.")
    );
    assert!(svc.toasts().snapshot().is_empty());
}

#[tokio::test]
async fn oversized_pdf_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    mount_empty_list(&server).await;
    Mock::given(path("/api/v1/contracts/upload"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let big = dir.path().join("big.pdf");
    let file = std::fs::File::create(&big).unwrap();
    file.set_len(MAX_UPLOAD_BYTES + 1).unwrap();

    let svc = signed_in(&server).await;
    let err = svc.upload_path(&big).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(UploadRejection::TooLarge { .. })
    ));
    let inline = svc.upload_flow().state().error.unwrap();
    assert!(inline.starts_with("File is too large"), "{inline}");
    assert!(svc.toasts().snapshot().is_empty());
}

#[tokio::test]
async fn failed_listing_is_announced() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/contracts"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "db down"})))
        .mount(&server)
        .await;

    let svc = signed_in(&server).await;
    assert!(matches!(svc.auth_state(), clauseguard_core::auth::AuthState::SignedIn(_)));

    let err = svc.load_contracts().await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 500, .. }));
    assert_eq!(err.user_message(), "db down");

    // One toast from the listing during sign-in, one from the explicit reload.
    let toasts = svc.toasts().snapshot();
    assert_eq!(toasts.len(), 2);
    assert!(toasts.iter().all(|t| t.title == "Loading Failed"
        && t.variant == ToastVariant::Destructive
        && t.description.as_deref() == Some("db down")));
}

#[tokio::test]
async fn expired_token_on_listing_returns_to_login() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/contracts"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let svc = AppService::new(config(&server), Arc::new(MemoryVault::default())).unwrap();
    svc.init().await;

    // sign_in itself succeeds; the follow-up listing is what gets the 401.
    svc.sign_in("ann@example.com", "correct horse").await.unwrap();
    assert_eq!(svc.screen("/contracts"), Screen::Login);
    assert!(svc.store().list().is_empty());

    let err = svc.load_contracts().await.unwrap_err();
    assert!(matches!(err, ClientError::NotAuthenticated));
}

#[tokio::test]
async fn dashboard_falls_back_with_a_warning() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/contracts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {"contracts": [
            {"id": 1, "original_filename": "a.pdf", "file_size": 10, "status": "uploaded", "created_at": "2024-01-01T00:00:00"},
            {"id": 2, "original_filename": "b.pdf", "file_size": 20, "status": "analyzed", "created_at": "2024-01-02T00:00:00"}
        ]}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard/stats"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let svc = signed_in(&server).await;
    let stats = svc.dashboard().await.unwrap();
    assert_eq!(stats.total_contracts, 2);
    assert_eq!(stats.recent_activity.len(), 2);
    assert_eq!(stats.pending_review(), 0);

    let toasts = svc.toasts().snapshot();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].title, "Dashboard Stats");
    assert_eq!(toasts[0].variant, ToastVariant::Warning);
}

#[tokio::test]
async fn unreachable_dashboard_shows_an_error() {
    let identity = MockServer::start().await;
    mount_identity(&identity).await;
    mount_empty_list(&identity).await;

    let mut cfg = config(&identity);
    // Nothing listens on port 1; every backend request fails to connect.
    cfg.api_base = "http://127.0.0.1:1/api/v1".into();

    let svc = AppService::new(cfg, Arc::new(MemoryVault::default())).unwrap();
    svc.init().await;
    svc.sign_in("ann@example.com", "correct horse").await.unwrap();

    let stats = svc.dashboard().await.unwrap();
    assert_eq!(stats.total_contracts, 0);

    let last = svc.toasts().snapshot().pop().unwrap();
    assert_eq!(last.title, "Dashboard Error");
    assert_eq!(last.variant, ToastVariant::Destructive);
}

#[tokio::test]
async fn download_writes_the_document() {
    let server = MockServer::start().await;
    mount_identity(&server).await;
    mount_empty_list(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/contracts/7/download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7 lease".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out").join("lease.pdf");

    let svc = signed_in(&server).await;
    let written = svc.download_to(&ContractId::new("7"), &dest).await.unwrap();
    assert_eq!(written, 14);
    assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.7 lease");
}
