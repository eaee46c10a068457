//! Integration tests for the REST API.
//!
//! Each test spins up an Axum server on a random port backed by an
//! in-memory database and a stub model, then drives it over HTTP.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use inbox_triage::api::{AppState, api_routes};
use inbox_triage::error::LlmError;
use inbox_triage::llm::{CompletionRequest, CompletionResponse, LlmProvider, ModelGateway};
use inbox_triage::pipeline::{EmailProcessor, ProcessorConfig};
use inbox_triage::store::{Database, LibSqlBackend};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Stub model that answers based on which default prompt it receives.
struct StubLlm;

#[async_trait]
impl LlmProvider for StubLlm {
    fn name(&self) -> &str {
        "stub"
    }
    fn model_name(&self) -> &str {
        "stub"
    }
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prompt = &request.prompt;
        let content = if prompt.starts_with("Categorize") {
            if prompt.contains("Tuesday") {
                "To-Do"
            } else if prompt.contains("cruise") || prompt.contains("Bahamas") {
                "Spam"
            } else if prompt.contains("Q4 report") {
                "Important"
            } else {
                "Newsletter"
            }
        } else if prompt.starts_with("Extract action items") {
            r#"```json
[{"task": "Follow up", "deadline": null}]
```"#
        } else if prompt.starts_with("Draft a polite reply") {
            "Thanks for reaching out. Could you share an agenda?"
        } else {
            "Stub agent response"
        };
        Ok(CompletionResponse {
            content: content.to_string(),
            input_tokens: 0,
            output_tokens: 0,
        })
    }
}

/// Start an Axum server on a random port, return (base url, db).
async fn start_server() -> (String, Arc<dyn Database>) {
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let gateway = Arc::new(ModelGateway::new(vec![Arc::new(StubLlm) as Arc<dyn LlmProvider>]));
    let processor = Arc::new(EmailProcessor::new(
        Arc::clone(&db),
        Arc::clone(&gateway),
        ProcessorConfig::default(),
    ));
    let app = api_routes(AppState {
        db: Arc::clone(&db),
        processor,
        gateway,
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}"), db)
}

async fn post_json(url: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let (base, _) = start_server().await;
        let body: Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn mock_ingest_then_process_inbox() {
    timeout(TEST_TIMEOUT, async {
        let (base, db) = start_server().await;

        let seeded: Value = post_json(&format!("{base}/ingest/mock"), json!({}))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(seeded["emails_created"], 5);
        assert_eq!(seeded["prompts_created"], 3);

        let report: Value = post_json(&format!("{base}/ingest/process"), json!({}))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(report["processed"], 5);
        assert_eq!(report["failed"], 0);

        // Second run finds nothing left to do.
        let rerun: Value = post_json(&format!("{base}/ingest/process"), json!({}))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(rerun["processed"], 0);

        let emails: Vec<Value> = reqwest::get(format!("{base}/emails"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(emails.len(), 5);
        let meeting = emails
            .iter()
            .find(|e| e["sender"] == "client@shipping.com")
            .unwrap();
        assert_eq!(meeting["category"], "To-Do");
        let items: Value = serde_json::from_str(meeting["action_items"].as_str().unwrap()).unwrap();
        assert_eq!(items[0]["task"], "Follow up");

        // Drafts for the Important report and the To-Do meeting only.
        let drafts: Vec<Value> = reqwest::get(format!("{base}/drafts"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(drafts.len(), 2);
        let subjects: Vec<&str> = drafts.iter().filter_map(|d| d["subject"].as_str()).collect();
        assert!(subjects.contains(&"Re: Meeting Request: Project Update"));
        assert!(subjects.contains(&"Re: Urgent: Q4 Report Due"));
        assert_eq!(db.list_drafts().await.unwrap().len(), 2);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn prompts_upsert_by_name() {
    timeout(TEST_TIMEOUT, async {
        let (base, _) = start_server().await;
        let url = format!("{base}/prompts");

        let first: Value = post_json(
            &url,
            json!({"name": "categorization", "template": "v1 {email_body}"}),
        )
        .await
        .json()
        .await
        .unwrap();
        let second: Value = post_json(
            &url,
            json!({"name": "categorization", "template": "v2 {email_body}", "description": "edited"}),
        )
        .await
        .json()
        .await
        .unwrap();
        assert_eq!(first["id"], second["id"]);

        let prompts: Vec<Value> = reqwest::get(&url).await.unwrap().json().await.unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0]["template"], "v2 {email_body}");
        assert_eq!(prompts[0]["description"], "edited");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn process_single_email_and_chat() {
    timeout(TEST_TIMEOUT, async {
        let (base, _) = start_server().await;
        post_json(&format!("{base}/ingest/mock"), json!({})).await;

        let emails: Vec<Value> = reqwest::get(format!("{base}/emails?limit=5"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let spam = emails
            .iter()
            .find(|e| e["sender"] == "spam@offers.com")
            .unwrap();
        let id = spam["id"].as_str().unwrap();

        let result: Value = post_json(&format!("{base}/emails/{id}/process"), json!({}))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(result["category"], "Spam");
        assert_eq!(result["draft_created"], false);
        assert_eq!(result["state"], "done");

        let reply: Value = post_json(
            &format!("{base}/chat"),
            json!({"query": "Is this safe?", "email_id": id}),
        )
        .await
        .json()
        .await
        .unwrap();
        assert_eq!(reply["response"], "Stub agent response");

        let missing = post_json(
            &format!("{base}/chat"),
            json!({"query": "?", "email_id": "nope"}),
        )
        .await;
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn create_hand_written_draft() {
    timeout(TEST_TIMEOUT, async {
        let (base, _) = start_server().await;
        let draft: Value = post_json(
            &format!("{base}/drafts"),
            json!({"subject": "Hello", "body": "Just checking in."}),
        )
        .await
        .json()
        .await
        .unwrap();
        assert_eq!(draft["status"], "draft");
        assert!(draft["email_id"].is_null());
    })
    .await
    .expect("test timed out");
}
