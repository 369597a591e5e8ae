//! Company news via NewsAPI's `everything` search

use super::http::{failure, send_json};
use crate::secrets::{SecretCache, NEWSAPI_KEY};
use async_trait::async_trait;
use sdk::connector::Connector;
use sdk::types::{
    ConnectorArgs, ConnectorFailure, ConnectorOutput, ConnectorSchema, EntityScope, FailureKind,
    ParamType,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_LIMIT: i64 = 5;
/// NewsAPI rejects page sizes above this
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
struct NewsResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    source: Option<ArticleSource>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    #[serde(default)]
    name: Option<String>,
}

pub struct CompanyNewsConnector {
    client: reqwest::Client,
    base_url: String,
    secrets: Arc<SecretCache>,
    schema: ConnectorSchema,
}

impl CompanyNewsConnector {
    pub fn new(client: reqwest::Client, base_url: String, secrets: Arc<SecretCache>) -> Self {
        let schema = ConnectorSchema::new(
            "get_company_news",
            "Fetches recent news articles that mention a company",
            EntityScope::Company,
        )
        .required("company_name", ParamType::String, "Company name to search for")
        .optional(
            "limit",
            ParamType::Integer,
            "Number of news articles to fetch",
            json!(DEFAULT_LIMIT),
        );

        Self {
            client,
            base_url,
            secrets,
            schema,
        }
    }

    async fn search(&self, company: &str, limit: i64) -> Result<Value, ConnectorFailure> {
        let key = self.secrets.lookup(NEWSAPI_KEY).ok_or_else(|| {
            failure(
                FailureKind::MissingCredential,
                format!("{} is not configured", NEWSAPI_KEY),
            )
        })?;

        let url = format!("{}/everything", self.base_url.trim_end_matches('/'));
        let request = self
            .client
            .get(url)
            .header("X-Api-Key", key.unsecure())
            .query(&[
                ("q", format!("\"{}\"", company)),
                ("pageSize", limit.to_string()),
                ("sortBy", "publishedAt".to_string()),
                ("language", "en".to_string()),
            ]);

        let body = send_json("NewsAPI", request).await?;
        let response: NewsResponse = serde_json::from_value(body).map_err(|e| {
            failure(
                FailureKind::BadResponse,
                format!("NewsAPI returned an unexpected shape: {}", e),
            )
        })?;

        if response.status != "ok" {
            let code = response.code.unwrap_or_default();
            let kind = match code.as_str() {
                "apiKeyInvalid" | "apiKeyMissing" | "apiKeyDisabled" | "apiKeyExhausted" => {
                    FailureKind::MissingCredential
                }
                "rateLimited" => FailureKind::RateLimited,
                _ => FailureKind::BadResponse,
            };
            return Err(failure(
                kind,
                format!(
                    "NewsAPI error {}: {}",
                    code,
                    response.message.unwrap_or_default()
                ),
            ));
        }

        let articles: Vec<Value> = response
            .articles
            .into_iter()
            .take(limit as usize)
            .map(|a| {
                json!({
                    "title": a.title.unwrap_or_default(),
                    "source": a.source.and_then(|s| s.name).unwrap_or_default(),
                    "date": a.published_at.unwrap_or_default(),
                    "url": a.url.unwrap_or_default(),
                    "summary": a.description.unwrap_or_default(),
                })
            })
            .collect();

        Ok(json!({ "articles": articles }))
    }
}

#[async_trait]
impl Connector for CompanyNewsConnector {
    fn schema(&self) -> &ConnectorSchema {
        &self.schema
    }

    async fn invoke(&self, args: &Value) -> ConnectorOutput {
        let args = ConnectorArgs::new(args);
        let company = match args.param_str("company_name") {
            Ok(name) => name,
            Err(e) => return ConnectorOutput::fail(FailureKind::InvalidArguments, e.to_string()),
        };
        let limit = args
            .param_i64_opt("limit")
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_PAGE_SIZE);

        match self.search(company, limit).await {
            Ok(payload) => ConnectorOutput::Success(payload),
            Err(failure) => ConnectorOutput::Failure(failure),
        }
    }
}
