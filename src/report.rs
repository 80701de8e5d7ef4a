//! Report building and submission for the `show` command.
//!
//! The report endpoint accepts a JSON payload of field-pair rows and returns
//! a URL where the rendered notepad can be viewed.

use crate::error::{BotError, Result};
use serde_json::{Value, json};

/// Application name advertised in report payloads.
const APP_NAME: &str = "Notepad";

/// Build the report payload for a notepad: one row per entry, each row a
/// 1-based index field plus the message text field.
#[must_use]
pub fn build_report(entries: &[String], project_url: &str) -> Value {
    let fields: Vec<Value> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            json!([
                {"id": "idx", "name": "Message Index", "value": i + 1},
                {"id": "msg", "name": "Message", "value": entry},
            ])
        })
        .collect();

    json!({
        "appName": APP_NAME,
        "appURL": project_url,
        "fields": fields,
    })
}

/// Submit a report and return the `reportURL` from the response.
///
/// # Errors
///
/// Returns an error on transport failure, a non-2xx status, or a response
/// without a `reportURL` string.
pub async fn submit(client: &reqwest::Client, endpoint: &str, report: &Value) -> Result<String> {
    let response = client
        .post(endpoint)
        .json(report)
        .send()
        .await
        .map_err(|e| BotError::Report(format!("report submission failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(BotError::Report(format!(
            "report endpoint returned {status}"
        )));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| BotError::Report(format!("invalid report response: {e}")))?;

    body.get("reportURL")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| BotError::Report("report response missing reportURL".to_owned()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn report_rows_carry_one_based_indices() {
        let entries = vec!["buy milk".to_owned(), "walk dog".to_owned()];
        let report = build_report(&entries, "https://example.org/notepad");

        assert_eq!(report["appName"], "Notepad");
        assert_eq!(report["appURL"], "https://example.org/notepad");

        let fields = report["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0][0]["id"], "idx");
        assert_eq!(fields[0][0]["value"], 1);
        assert_eq!(fields[0][1]["id"], "msg");
        assert_eq!(fields[0][1]["value"], "buy milk");
        assert_eq!(fields[1][0]["value"], 2);
        assert_eq!(fields[1][1]["value"], "walk dog");
    }

    #[tokio::test]
    async fn submit_returns_report_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/report/create"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"reportURL": "http://x/1"})),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let report = build_report(&["a".to_owned()], "https://example.org");
        let url = submit(
            &client,
            &format!("{}/api/v2/report/create", server.uri()),
            &report,
        )
        .await
        .unwrap();
        assert_eq!(url, "http://x/1");
    }

    #[tokio::test]
    async fn submit_fails_on_non_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let report = build_report(&["a".to_owned()], "https://example.org");
        let result = submit(&client, &server.uri(), &report).await;
        assert!(matches!(result, Err(BotError::Report(_))));
    }

    #[tokio::test]
    async fn submit_fails_when_report_url_missing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let report = build_report(&[], "https://example.org");
        let result = submit(&client, &server.uri(), &report).await;
        assert!(matches!(result, Err(BotError::Report(_))));
    }
}
