use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

/// Reply shape of the RAG backend's `/query` endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    pub answer: String,
}

/// Error payload produced by the gateway itself.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
    #[serde(default)]
    pub fields: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    gateway_url: String,
}

impl GatewayClient {
    pub fn new(gateway_url: &str) -> Self {
        Self {
            client: Client::builder()
                .no_proxy()
                .build()
                .unwrap_or_else(|_| Client::new()),
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
        }
    }

    /// Send a question and return the raw relayed response.
    pub async fn ask(&self, question: &str) -> Result<Response, reqwest::Error> {
        self.client
            .post(format!("{}/api/answer", self.gateway_url))
            .json(&QuestionRequest {
                question: question.to_string(),
            })
            .send()
            .await
    }

    /// Send a question and decode the backend's answer.
    pub async fn ask_json(&self, question: &str) -> Result<AnswerResponse, Box<dyn std::error::Error>> {
        let resp = self.ask(question).await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(format!("Gateway returned error status {}: {}", status, text).into());
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// POST a raw body to the answer endpoint, for exercising validation.
    pub async fn ask_raw(&self, body: impl Into<reqwest::Body>) -> Result<Response, reqwest::Error> {
        self.client
            .post(format!("{}/api/answer", self.gateway_url))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
    }

    /// Clear the backend's document store.
    pub async fn reset(&self) -> Result<Response, reqwest::Error> {
        self.client
            .post(format!("{}/api/reset", self.gateway_url))
            .send()
            .await
    }

    /// Upload a document under the `file` field.
    pub async fn upload_document(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        data: Vec<u8>,
    ) -> Result<Response, reqwest::Error> {
        let mut part = Part::bytes(data).file_name(file_name.to_string());
        if let Some(content_type) = content_type {
            part = part.mime_str(content_type)?;
        }
        self.upload_form(Form::new().part("file", part)).await
    }

    /// Upload an arbitrary form, for exercising form validation.
    pub async fn upload_form(&self, form: Form) -> Result<Response, reqwest::Error> {
        self.client
            .post(format!("{}/api/document", self.gateway_url))
            .multipart(form)
            .send()
            .await
    }

    /// Gateway greeting.
    pub async fn info(&self) -> Result<Response, reqwest::Error> {
        self.client
            .get(format!("{}/api/", self.gateway_url))
            .send()
            .await
    }
}
