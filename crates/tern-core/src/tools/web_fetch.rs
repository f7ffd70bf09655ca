//! Web page fetching tool

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::names::{ParamName, ToolName};
use crate::parser::ToolUseBlock;
use crate::tool::{Tool, ToolContext, ToolResponse, request_approval};

/// Hard request timeout
const FETCH_TIMEOUT_SECS: u64 = 30;
/// Cap on returned body text
const MAX_BODY_BYTES: usize = 10 * 1024;

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script>").unwrap());
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style>").unwrap());
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Tool for fetching a URL and returning readable text
pub struct WebFetchTool;

#[async_trait]
impl Tool for WebFetchTool {
    fn name(&self) -> ToolName {
        ToolName::WebFetch
    }

    fn description(&self) -> &str {
        "Fetch a URL over HTTP GET and return its text content. HTML is reduced to readable text."
    }

    fn required_params(&self) -> &[ParamName] {
        &[ParamName::Url]
    }

    async fn execute(&self, block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse {
        let url = block.param(ParamName::Url).unwrap_or_default();

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return ToolResponse::error(format!("Invalid URL: {}", url));
        }

        if let Some(denied) =
            request_approval(ctx, self.name(), &format!("Fetch URL: {}", url), false).await
        {
            return denied;
        }

        if ctx.cancel.is_cancelled() {
            return ToolResponse::error("Operation cancelled");
        }

        let client = match reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(1))
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
        {
            Ok(c) => c,
            Err(e) => return ToolResponse::error(format!("Failed to build HTTP client: {}", e)),
        };

        let response = match client.get(url).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return ToolResponse::error(format!(
                    "Request timed out after {} seconds",
                    FETCH_TIMEOUT_SECS
                ));
            }
            Err(e) => return ToolResponse::error(format!("Request failed: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            return ToolResponse::error(format!("Request failed with status {}", status.as_u16()));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("text/html"))
            .unwrap_or(false);

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return ToolResponse::error(format!("Failed to read response body: {}", e)),
        };

        let text = if is_html { strip_html(&body) } else { body };
        ToolResponse::text(truncate_body(&text))
    }
}

/// Reduce an HTML document to readable text
fn strip_html(html: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, " ");
    let without_styles = STYLE_RE.replace_all(&without_scripts, " ");
    let without_comments = COMMENT_RE.replace_all(&without_styles, " ");
    let without_tags = TAG_RE.replace_all(&without_comments, " ");

    let decoded = without_tags
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");

    decoded
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_body(text: &str) -> String {
    if text.len() <= MAX_BODY_BYTES {
        return text.to_string();
    }
    let mut cut = MAX_BODY_BYTES;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}\n\n(Content truncated at 10KB)", &text[..cut])
}
