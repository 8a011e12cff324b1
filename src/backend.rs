use std::sync::Arc;

use anyhow::{anyhow, Result};
use percent_encoding::percent_decode_str;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Url};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub sku: String,
    pub text: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ChatResponse {
    pub reply: Option<String>,
    pub cart_html: Option<String>,
    pub suggestions: Option<Vec<Suggestion>>,
}

/// Reply to a quick-add. Carries no suggestions: a quick-add leaves the
/// rendered chip row exactly as it was.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct AddResponse {
    pub reply: Option<String>,
    pub cart_html: Option<String>,
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    jar: Arc<Jar>,
    base_url: Url,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let jar = Arc::new(Jar::default());
        let client = Client::builder().cookie_provider(jar.clone()).build()?;

        Ok(Self {
            client,
            jar,
            base_url,
        })
    }

    /// Fetch the chat page once so the backend hands out its csrftoken and
    /// session cookies before the first send.
    pub async fn prime_session(&self) -> Result<()> {
        let response = self.client.get(self.base_url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Priming request failed with status: {}. Make sure the shopbot backend is running at {}",
                response.status(),
                self.base_url
            ));
        }

        Ok(())
    }

    /// Current value of the `csrftoken` cookie. Empty when the backend has
    /// not set one; the backend owns any resulting rejection.
    pub fn csrf_token(&self) -> String {
        self.jar
            .cookies(&self.base_url)
            .and_then(|header| header.to_str().map(str::to_owned).ok())
            .and_then(|header| cookie_value(&header, "csrftoken"))
            .unwrap_or_default()
    }

    pub async fn send_message(&self, text: &str) -> Result<ChatResponse> {
        let url = self.base_url.join("api/message/")?;

        let response = self
            .client
            .post(url)
            .header("X-CSRFToken", self.csrf_token())
            .form(&[("message", text)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Message request failed with status: {}",
                response.status()
            ));
        }

        let chat_response: ChatResponse = response.json().await?;
        Ok(chat_response)
    }

    pub async fn add_to_cart(&self, sku: &str) -> Result<AddResponse> {
        let url = add_url(&self.base_url, sku)?;

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Add request failed with status: {}",
                response.status()
            ));
        }

        let add_response: AddResponse = response.json().await?;
        Ok(add_response)
    }
}

/// Build the quick-add URL. Quantity is always one; the sku is
/// percent-encoded by the query serializer.
fn add_url(base: &Url, sku: &str) -> Result<Url> {
    let mut url = base.join("api/add/")?;
    url.query_pairs_mut()
        .append_pair("sku", sku)
        .append_pair("qty", "1");
    Ok(url)
}

/// Pull one cookie's decoded value out of a `Cookie` request header:
/// split on `;`, trim, match on the `name=` prefix, percent-decode.
fn cookie_value(header: &str, name: &str) -> Option<String> {
    for part in header.split(';') {
        let part = part.trim();
        if let Some(raw) = part.strip_prefix(name).and_then(|r| r.strip_prefix('=')) {
            return Some(percent_decode_str(raw).decode_utf8_lossy().into_owned());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_value_finds_named_cookie() {
        let header = "sessionid=s3ss10n; csrftoken=tok123";
        assert_eq!(cookie_value(header, "csrftoken"), Some("tok123".to_string()));
        assert_eq!(cookie_value(header, "sessionid"), Some("s3ss10n".to_string()));
    }

    #[test]
    fn cookie_value_missing_cookie_is_none() {
        assert_eq!(cookie_value("sessionid=abc", "csrftoken"), None);
        assert_eq!(cookie_value("", "csrftoken"), None);
    }

    #[test]
    fn cookie_value_decodes_percent_escapes() {
        let header = "csrftoken=a%3Db%20c";
        assert_eq!(cookie_value(header, "csrftoken"), Some("a=b c".to_string()));
    }

    #[test]
    fn cookie_value_skips_prefix_collisions() {
        let header = "csrftokenx=no; csrftoken=yes";
        assert_eq!(cookie_value(header, "csrftoken"), Some("yes".to_string()));
    }

    #[test]
    fn add_url_carries_sku_and_fixed_qty() {
        let base = Url::parse("http://localhost:8000/").unwrap();
        let url = add_url(&base, "A1").unwrap();
        assert_eq!(url.path(), "/api/add/");
        assert_eq!(url.query(), Some("sku=A1&qty=1"));
    }

    #[test]
    fn add_url_percent_encodes_sku() {
        let base = Url::parse("http://localhost:8000/").unwrap();
        let url = add_url(&base, "café 7").unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("qty=1"));
        assert!(query.contains("%C3%A9"));
        assert!(!query.contains(' '));
    }

    #[test]
    fn csrf_token_reads_jar_cookie() {
        let client = BackendClient::new("http://localhost:8000").unwrap();
        assert_eq!(client.csrf_token(), "");

        client
            .jar
            .add_cookie_str("csrftoken=abc123", &client.base_url);
        assert_eq!(client.csrf_token(), "abc123");
    }

    #[test]
    fn chat_response_fields_are_all_optional() {
        let resp: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.reply.is_none());
        assert!(resp.cart_html.is_none());
        assert!(resp.suggestions.is_none());
    }

    #[test]
    fn chat_response_parses_full_envelope() {
        let json = r#"{
            "reply": "hi",
            "cart_html": "<div>1 item</div>",
            "suggestions": [{"sku": "A1", "text": "Add A1"}]
        }"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.reply.as_deref(), Some("hi"));
        assert_eq!(resp.cart_html.as_deref(), Some("<div>1 item</div>"));
        let suggestions = resp.suggestions.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].sku, "A1");
        assert_eq!(suggestions[0].text, "Add A1");
    }

    #[test]
    fn add_response_tolerates_unknown_fields() {
        let json = r#"{"reply": "added", "suggestions": [{"sku": "X", "text": "Y"}]}"#;
        let resp: AddResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.reply.as_deref(), Some("added"));
        assert!(resp.cart_html.is_none());
    }
}
