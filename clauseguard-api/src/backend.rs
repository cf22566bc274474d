use clauseguard_core::analysis::AnalysisType;
use clauseguard_core::types::ContractId;
use serde_json::json;

use crate::multipart::MultipartForm;
use crate::request::HttpRequest;

/// A file read into memory and ready to be posted to `/contracts/upload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

pub fn list_contracts_request(base: &str, token: &str) -> HttpRequest {
    HttpRequest::get(join_url(base, "/contracts"))
        .with_header("Accept", "application/json")
        .with_bearer(token)
}

pub fn upload_contract_request(base: &str, token: &str, file: &UploadFile) -> HttpRequest {
    let form = MultipartForm::new();
    let content_type = form.content_type();
    let body = form
        .file("file", &file.filename, &file.mime_type, &file.bytes)
        .finish();

    let mut req = HttpRequest::post(join_url(base, "/contracts/upload"))
        .with_header("Content-Type", content_type)
        .with_header("Accept", "application/json")
        .with_bearer(token);
    req.body = body;
    req
}

pub fn get_contract_request(base: &str, token: &str, id: &ContractId) -> HttpRequest {
    HttpRequest::get(join_url(base, &format!("/contracts/{id}")))
        .with_header("Accept", "application/json")
        .with_bearer(token)
}

pub fn delete_contract_request(base: &str, token: &str, id: &ContractId) -> HttpRequest {
    HttpRequest::delete(join_url(base, &format!("/contracts/{id}"))).with_bearer(token)
}

pub fn download_contract_request(base: &str, token: &str, id: &ContractId) -> HttpRequest {
    HttpRequest::get(join_url(base, &format!("/contracts/{id}/download"))).with_bearer(token)
}

pub fn analyze_contract_request(
    base: &str,
    token: &str,
    id: &ContractId,
    analysis_type: AnalysisType,
) -> HttpRequest {
    HttpRequest::post(join_url(base, &format!("/contracts/{id}/analyze")))
        .with_bearer(token)
        .with_json(&json!({ "analysis_type": analysis_type.as_str() }))
}

pub fn get_analysis_request(base: &str, token: &str, id: &ContractId) -> HttpRequest {
    HttpRequest::get(join_url(base, &format!("/contracts/{id}/analysis")))
        .with_header("Accept", "application/json")
        .with_bearer(token)
}

pub fn dashboard_stats_request(base: &str, token: &str) -> HttpRequest {
    HttpRequest::get(join_url(base, "/dashboard/stats"))
        .with_header("Accept", "application/json")
        .with_bearer(token)
}

pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Body;

    #[test]
    fn join_url_handles_trailing_slash() {
        assert_eq!(
            join_url("https://api.example.com/v1/", "/contracts"),
            "https://api.example.com/v1/contracts"
        );
        assert_eq!(
            join_url("https://api.example.com/v1", "contracts"),
            "https://api.example.com/v1/contracts"
        );
    }

    #[test]
    fn every_backend_call_is_authorized() {
        let id = ContractId::new("42");
        let reqs = [
            list_contracts_request("http://b", "t"),
            get_contract_request("http://b", "t", &id),
            delete_contract_request("http://b", "t", &id),
            download_contract_request("http://b", "t", &id),
            get_analysis_request("http://b", "t", &id),
            dashboard_stats_request("http://b", "t"),
        ];
        for req in reqs {
            assert_eq!(req.header("authorization"), Some("Bearer t"), "{}", req.url);
        }
    }

    #[test]
    fn analyze_posts_the_selected_type() {
        let req = analyze_contract_request(
            "http://b/api",
            "t",
            &ContractId::new("7"),
            AnalysisType::Individual,
        );
        assert_eq!(req.method, "POST");
        assert_eq!(req.url, "http://b/api/contracts/7/analyze");
        assert_eq!(
            req.json_body(),
            Some(serde_json::json!({"analysis_type": "individual"}))
        );
    }

    #[test]
    fn upload_is_multipart_with_file_field() {
        let file = UploadFile {
            filename: "lease.pdf".into(),
            mime_type: "application/pdf".into(),
            bytes: vec![1, 2, 3],
        };
        let req = upload_contract_request("http://b", "t", &file);
        assert_eq!(req.url, "http://b/contracts/upload");

        let Body::MultipartFormData { boundary, bytes } = &req.body else {
            panic!("expected multipart");
        };
        let ct = req.header("content-type").unwrap();
        assert!(ct.ends_with(&format!("boundary={boundary}")));
        assert!(String::from_utf8_lossy(bytes).contains("filename=\"lease.pdf\""));
    }
}
