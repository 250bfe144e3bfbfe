//! Web search tool backed by SerpApi.

use async_trait::async_trait;
use serde_json::Value;

use super::Tool;

/// Google search via SerpApi.
///
/// Prefers a direct answer (answer box or featured snippet) and falls
/// back to the top organic results so the model gets something quotable
/// either way.
pub struct WebSearchTool {
    client: reqwest::Client,
    api_key: String,
}

impl WebSearchTool {
    /// Create the tool with an explicit SerpApi key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    async fn search(&self, query: &str) -> anyhow::Result<Value> {
        let response = self
            .client
            .get("https://serpapi.com/search")
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("api_key", self.api_key.as_str()),
            ])
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("SerpApi returned HTTP {}", status));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Returns a direct answer when one exists, otherwise the top three result snippets. Input: {\"query\": \"search terms\"}"
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'query' argument"))?;
        if query.trim().is_empty() {
            return Err(anyhow::anyhow!("Search query must not be empty"));
        }

        tracing::info!(query = %query, "Web search");
        let results = self.search(query).await?;

        if let Some(answer) = extract_direct_answer(&results) {
            return Ok(answer);
        }

        let snippets = extract_organic_snippets(&results, 3);
        if !snippets.is_empty() {
            return Ok(snippets.join("\n\n"));
        }

        Ok(format!("No results found for: {}", query))
    }
}

/// Pull a direct answer out of the answer box or featured snippet.
fn extract_direct_answer(results: &Value) -> Option<String> {
    let answer_box = &results["answer_box"];
    if let Some(answer) = answer_box["answer"].as_str() {
        return Some(answer.to_string());
    }
    if let Some(snippet) = answer_box["snippet"].as_str() {
        return Some(snippet.to_string());
    }
    if let Some(snippet) = results["featured_snippet"]["snippet"].as_str() {
        return Some(snippet.to_string());
    }
    None
}

/// Format the top `top_n` organic results as `title\nsnippet\nlink`.
fn extract_organic_snippets(results: &Value, top_n: usize) -> Vec<String> {
    let Some(organic) = results["organic_results"].as_array() else {
        return Vec::new();
    };

    organic
        .iter()
        .take(top_n)
        .filter_map(|item| {
            let title = item["title"].as_str().unwrap_or("");
            let snippet = item["snippet"].as_str().unwrap_or("");
            let link = item["link"].as_str().unwrap_or("");
            if title.is_empty() || snippet.is_empty() {
                None
            } else {
                Some(format!("{}\n{}\n{}", title, snippet, link))
            }
        })
        .collect()
}
