//! The deal search pipeline: query validation, prompt construction, one
//! grounded model call, and normalization of whatever JSON the model produced.

use crate::domain::contract::normalize_deals;
use crate::domain::deal::{SearchMeta, SearchResponse};
use crate::llm::json::extract_json;
use crate::llm::LlmClient;

pub const MIN_QUERY_CHARS: usize = 2;

/// Trims the raw `q` parameter and rejects queries shorter than
/// [`MIN_QUERY_CHARS`].
pub fn validate_query(raw: Option<&str>) -> Option<String> {
    let q = raw?.trim();
    if q.chars().count() < MIN_QUERY_CHARS {
        return None;
    }
    Some(q.to_string())
}

pub fn build_prompt(query: &str) -> String {
    format!(
        r#"
Sei un motore di aggregazione offerte per e-commerce in Italia.
Trova offerte reali e recenti per la query: "{query}".

Regole:
- Rispondi SOLO con JSON valido (nessun testo extra).
- Output:
{{
  "deals":[
    {{
      "title": string,
      "price": number|null,
      "originalPrice": number|null,
      "discount": number|null,
      "store": string|null,
      "url": string|null,
      "image": string|null,
      "time": string|null,
      "category": string|null
    }}
  ],
  "notes": string
}}
- Max 12 risultati.
- Se un dato non è certo, usa null.
- Preferisci risultati italiani e store noti.
"#
    )
}

/// Runs one search for an already validated query.
pub async fn search_deals(llm: &dyn LlmClient, query: &str) -> anyhow::Result<SearchResponse> {
    let prompt = build_prompt(query);
    let res = llm.generate_content(&prompt).await?;

    let text = res.text();
    let payload = extract_json(&text);
    if payload.is_none() {
        tracing::warn!(query, text_len = text.len(), "no JSON recovered from model output");
    }

    let deals = normalize_deals(payload.as_ref());
    let sources = res.sources();
    let gm = res.grounding_metadata();

    tracing::info!(
        query,
        deals = deals.len(),
        sources = sources.len(),
        grounded = gm.is_some(),
        "deal search completed"
    );

    Ok(SearchResponse {
        query: query.to_string(),
        deals,
        sources,
        meta: SearchMeta {
            model: llm.model().to_string(),
            grounded: gm.is_some(),
            web_search_queries: gm.and_then(|gm| gm.web_search_queries.clone()),
        },
    })
}
