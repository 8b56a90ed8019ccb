use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use ragfolio_core::traits::Translator;
use ragfolio_core::{Language, ProviderError, ProviderKind};

use crate::client::HfClient;

/// NLLB translation through the Inference API (`src_lang` / `tgt_lang` FLORES codes).
pub struct HfTranslator {
    client: HfClient,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct TranslationItem {
    translation_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranslationResponse {
    Many(Vec<TranslationItem>),
    One(TranslationItem),
}

impl TranslationResponse {
    fn into_text(self) -> Option<String> {
        match self {
            TranslationResponse::Many(items) => items.into_iter().next().map(|i| i.translation_text),
            TranslationResponse::One(item) => Some(item.translation_text),
        }
    }
}

impl HfTranslator {
    pub fn new(client: HfClient, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url, model: model.into() }
    }
}

#[async_trait]
impl Translator for HfTranslator {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}", self.base_url, self.model);
        let body = json!({
            "inputs": text,
            "parameters": { "src_lang": source.flores_code(), "tgt_lang": target.flores_code() }
        });
        let response: TranslationResponse = self.client.post_json(ProviderKind::Translation, &url, &body).await?;
        response.into_text().ok_or_else(|| ProviderError::InvalidResponse {
            provider: ProviderKind::Translation,
            message: "translation response held no items".into(),
        })
    }
}
