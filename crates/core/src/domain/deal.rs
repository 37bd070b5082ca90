use serde::{Deserialize, Serialize};
use serde_json::Number;

pub const DEFAULT_TITLE: &str = "Offerta";
pub const DEFAULT_TIME: &str = "Adesso";
pub const DEFAULT_CATEGORY: &str = "generated";
pub const DEFAULT_SOURCE_TITLE: &str = "source";

/// A single normalized offer, safe to hand to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub title: String,
    /// Numbers keep the model's own formatting; only finite values survive.
    pub price: Option<Number>,
    pub original_price: Option<Number>,
    pub discount: Option<Number>,
    pub store: Option<String>,
    pub url: Option<String>,
    pub image: Option<String>,
    pub time: String,
    pub category: String,
    pub hot: bool,
}

impl Default for Deal {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            price: None,
            original_price: None,
            discount: None,
            store: None,
            url: None,
            image: None,
            time: DEFAULT_TIME.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            hot: false,
        }
    }
}

/// A web page the model cited while grounding its answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub deals: Vec<Deal>,
    pub sources: Vec<Source>,
    pub meta: SearchMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMeta {
    pub model: String,
    pub grounded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_search_queries: Option<Vec<String>>,
}
