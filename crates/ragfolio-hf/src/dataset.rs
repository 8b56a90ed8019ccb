use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use ragfolio_core::traits::KnowledgeSource;
use ragfolio_core::{ProviderError, ProviderKind};

use crate::client::HfClient;

/// Static knowledge base stored as a Hugging Face dataset with a `content` column.
pub struct HfDatasetSource {
    client: HfClient,
    base_url: String,
    dataset_id: String,
}

#[derive(Debug, Deserialize)]
struct RowsResponse {
    #[serde(default)]
    rows: Vec<RowEnvelope>,
}

#[derive(Debug, Deserialize)]
struct RowEnvelope {
    row: Row,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    content: Option<String>,
}

impl HfDatasetSource {
    pub fn new(client: HfClient, base_url: impl Into<String>, dataset_id: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url, dataset_id: dataset_id.into() }
    }

    fn rows_url(&self) -> String {
        format!("{}/rows?dataset={}&config=default&split=train", self.base_url, self.dataset_id)
    }
}

fn join_rows(response: RowsResponse) -> String {
    response
        .rows
        .into_iter()
        .filter_map(|r| r.row.content)
        .filter(|c| !c.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl KnowledgeSource for HfDatasetSource {
    async fn fetch(&self) -> Result<String, ProviderError> {
        let response: RowsResponse = self.client.get_json(ProviderKind::KnowledgeBase, &self.rows_url()).await?;
        let rows = response.rows.len();
        let text = join_rows(response);
        if text.is_empty() {
            return Err(ProviderError::InvalidResponse {
                provider: ProviderKind::KnowledgeBase,
                message: format!("dataset {} has no content rows", self.dataset_id),
            });
        }
        info!(dataset = %self.dataset_id, rows, "fetched knowledge base");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_content_rows_with_blank_lines() {
        let body = r#"{"rows":[
            {"row_idx":0,"row":{"content":"Name: Ada"}},
            {"row_idx":1,"row":{"other":"x"}},
            {"row_idx":2,"row":{"content":"Skills: Rust"}}
        ]}"#;
        let response: RowsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(join_rows(response), "Name: Ada\n\nSkills: Rust");
    }

    #[test]
    fn builds_rows_url() {
        let client = HfClient::new(Some("t".into()), std::time::Duration::from_secs(1)).unwrap();
        let source = HfDatasetSource::new(client, "https://datasets-server.huggingface.co/", "me/portfolio-kb");
        assert_eq!(
            source.rows_url(),
            "https://datasets-server.huggingface.co/rows?dataset=me/portfolio-kb&config=default&split=train"
        );
    }
}
