use crate::language;
use crate::record::{get_now, ProblemRecord};
use crate::SyncError;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2022-06-28";

/// Fixed label for the Platform select property.
pub const PLATFORM: &str = "GFG";

const SOLUTION_PLACEHOLDER: &str = "No solution code captured";
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    database_id: String,
}

impl NotionClient {
    pub fn new(api_key: String, database_id: String) -> Self {
        Self::with_url(api_key, database_id, DEFAULT_API_URL.to_string())
    }

    pub fn with_url(api_key: String, database_id: String, api_url: String) -> Self {
        NotionClient {
            http: reqwest::Client::new(),
            api_url,
            api_key,
            database_id,
        }
    }

    /// Creates one database page for the record. A single request, no
    /// retries; every failure is terminal for this attempt.
    pub async fn create_page(
        &self,
        record: &ProblemRecord,
        include_code: bool,
    ) -> Result<Value, SyncError> {
        let body = page_body(record, &self.database_id, include_code);
        debug!("POST {}/pages for '{}'", self.api_url, record.title);
        let response = self
            .http
            .post(format!("{}/pages", self.api_url))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await?;
        into_result(response).await
    }

    /// Fetches the target database to verify credentials and reachability.
    /// Bounded by a fixed timeout; returns the database title.
    pub async fn check_connection(&self) -> Result<String, SyncError> {
        let response = self
            .http
            .get(format!("{}/databases/{}", self.api_url, self.database_id))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .timeout(CONNECTION_TIMEOUT)
            .send()
            .await?;
        let info = into_result(response).await?;
        Ok(info["title"][0]["plain_text"]
            .as_str()
            .unwrap_or("Untitled")
            .to_string())
    }
}

async fn into_result(response: reqwest::Response) -> Result<Value, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body["message"].as_str().map(ToString::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });
    Err(SyncError::Remote {
        status: status.as_u16(),
        message,
    })
}

fn multi_select(values: &[String]) -> Value {
    Value::Array(
        values
            .iter()
            .map(|v| json!({ "name": v }))
            .collect::<Vec<_>>(),
    )
}

fn page_body(record: &ProblemRecord, database_id: &str, include_code: bool) -> Value {
    let mut body = json!({
        "parent": { "database_id": database_id },
        "properties": {
            "Question Name": {
                "title": [ { "text": { "content": record.title } } ]
            },
            "Platform": { "select": { "name": PLATFORM } },
            "Difficulty": { "select": { "name": record.difficulty.as_str() } },
            "Topic": { "multi_select": multi_select(&record.topics) },
            "Companies": { "multi_select": multi_select(&record.company_tags) },
            "Interview": { "multi_select": multi_select(&record.interview_tags) },
            "Question URL": { "url": record.url },
            "Created time": { "date": { "start": get_now().to_rfc3339() } }
        }
    });

    if include_code {
        let solution = if record.solution.is_empty() {
            SOLUTION_PLACEHOLDER
        } else {
            record.solution.as_str()
        };
        body["children"] = json!([
            {
                "object": "block",
                "type": "heading_2",
                "heading_2": {
                    "rich_text": [ { "type": "text", "text": { "content": "My Solution" } } ]
                }
            },
            {
                "object": "block",
                "type": "code",
                "code": {
                    "rich_text": [ { "type": "text", "text": { "content": solution } } ],
                    "language": language::normalize(Some(&record.language))
                }
            }
        ]);
    }

    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Difficulty;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record() -> ProblemRecord {
        ProblemRecord {
            title: "Two Sum".to_string(),
            difficulty: Difficulty::Easy,
            topics: vec!["Arrays".to_string(), "Hashing".to_string()],
            company_tags: vec!["Amazon".to_string()],
            interview_tags: vec![],
            url: "https://www.geeksforgeeks.org/problems/two-sum/1".to_string(),
            solution: "int main() {}".to_string(),
            language: "cpp".to_string(),
            timestamp: get_now(),
        }
    }

    #[test]
    fn page_body_shape() {
        let body = page_body(&record(), "db-1", true);
        assert_eq!(body["parent"]["database_id"], "db-1");
        assert_eq!(
            body["properties"]["Question Name"]["title"][0]["text"]["content"],
            "Two Sum"
        );
        assert_eq!(body["properties"]["Platform"]["select"]["name"], "GFG");
        assert_eq!(body["properties"]["Difficulty"]["select"]["name"], "Easy");
        assert_eq!(
            body["properties"]["Topic"]["multi_select"][1]["name"],
            "Hashing"
        );
        assert_eq!(
            body["properties"]["Companies"]["multi_select"][0]["name"],
            "Amazon"
        );
        assert_eq!(body["children"][0]["heading_2"]["rich_text"][0]["text"]["content"], "My Solution");
        assert_eq!(body["children"][1]["code"]["language"], "c++");
        assert_eq!(
            body["children"][1]["code"]["rich_text"][0]["text"]["content"],
            "int main() {}"
        );
    }

    #[test]
    fn page_body_without_code() {
        let body = page_body(&record(), "db-1", false);
        assert!(body.get("children").is_none());
    }

    #[test]
    fn empty_solution_gets_placeholder() {
        let mut r = record();
        r.solution = String::new();
        let body = page_body(&r, "db-1", true);
        assert_eq!(
            body["children"][1]["code"]["rich_text"][0]["text"]["content"],
            SOLUTION_PLACEHOLDER
        );
    }

    #[tokio::test]
    async fn create_page_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pages"))
            .and(header("Notion-Version", NOTION_VERSION))
            .and(header("Authorization", "Bearer secret_k"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "object": "page", "id": "page-1" })),
            )
            .mount(&server)
            .await;

        let client = NotionClient::with_url("secret_k".into(), "db-1".into(), server.uri());
        let result = client.create_page(&record(), true).await.unwrap();
        assert_eq!(result["id"], "page-1");
    }

    #[tokio::test]
    async fn create_page_unauthorized_carries_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pages"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({ "message": "API token is invalid." })),
            )
            .mount(&server)
            .await;

        let client = NotionClient::with_url("secret_k".into(), "db-1".into(), server.uri());
        let err = client.create_page(&record(), true).await.unwrap_err();
        match err {
            SyncError::Remote { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("API token is invalid."));
            }
            other => panic!("expected Remote error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn error_without_body_uses_status_phrase() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pages"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = NotionClient::with_url("secret_k".into(), "db-1".into(), server.uri());
        let err = client.create_page(&record(), true).await.unwrap_err();
        match err {
            SyncError::Remote { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not Found");
            }
            other => panic!("expected Remote error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn check_connection_returns_database_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/databases/db-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "database",
                "title": [ { "plain_text": "Problems" } ]
            })))
            .mount(&server)
            .await;

        let client = NotionClient::with_url("secret_k".into(), "db-1".into(), server.uri());
        assert_eq!(client.check_connection().await.unwrap(), "Problems");
    }

    #[tokio::test]
    async fn check_connection_untitled_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/databases/db-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "object": "database" })))
            .mount(&server)
            .await;

        let client = NotionClient::with_url("secret_k".into(), "db-1".into(), server.uri());
        assert_eq!(client.check_connection().await.unwrap(), "Untitled");
    }
}
