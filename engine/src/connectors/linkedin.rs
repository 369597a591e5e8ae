//! LinkedIn connectors backed by RapidAPI scrapers
//!
//! Person data comes from the profile host (`/api/v1/user/...`), company
//! data from the company host (`/get-company...`). Both authenticate with
//! the same `RAPIDAPI_KEY`.

use super::http::{failure, send_json};
use crate::secrets::{SecretCache, RAPIDAPI_KEY};
use async_trait::async_trait;
use regex::Regex;
use sdk::connector::Connector;
use sdk::types::{
    ConnectorArgs, ConnectorFailure, ConnectorOutput, ConnectorSchema, EntityScope, FailureKind,
    ParamType,
};
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};

const DEFAULT_ACTIVITY_LIMIT: i64 = 10;

static USERNAME_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

/// Username from a profile URL such as `https://www.linkedin.com/in/jane-doe/`
///
/// Anything that does not look like a profile URL is taken to be a username.
pub fn extract_username(linkedin_url: &str) -> String {
    let pattern = USERNAME_PATTERN.get_or_init(|| Regex::new(r"linkedin\.com/in/([^/?#]+)").ok());
    pattern
        .as_ref()
        .and_then(|re| re.captures(linkedin_url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| linkedin_url.trim().trim_end_matches('/').to_string())
}

/// Authenticated access to one RapidAPI host
#[derive(Clone)]
pub struct RapidApiClient {
    client: reqwest::Client,
    base_url: Option<String>,
    host: String,
    secrets: Arc<SecretCache>,
}

impl RapidApiClient {
    pub fn new(
        client: reqwest::Client,
        base_url: Option<String>,
        host: String,
        secrets: Arc<SecretCache>,
    ) -> Self {
        Self {
            client,
            base_url,
            host,
            secrets,
        }
    }

    fn url(&self, path: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), path),
            None => format!("https://{}{}", self.host, path),
        }
    }

    /// GET `path` and return the decoded body
    ///
    /// Bodies that carry an `error` field or `"success": false` are failures
    /// even on a 2xx status.
    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, ConnectorFailure> {
        let key = self.secrets.lookup(RAPIDAPI_KEY).ok_or_else(|| {
            failure(
                FailureKind::MissingCredential,
                format!("{} is not configured", RAPIDAPI_KEY),
            )
        })?;

        let request = self
            .client
            .get(self.url(path))
            .header("X-RapidAPI-Key", key.unsecure())
            .header("X-RapidAPI-Host", &self.host)
            .query(query);

        let body = send_json("LinkedIn API", request).await?;

        let reported_failure = body.get("error").is_some_and(|e| !e.is_null())
            || body.get("success").and_then(Value::as_bool) == Some(false);
        if reported_failure {
            let message = body
                .get("message")
                .or_else(|| body.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            let kind = if message.to_lowercase().contains("not found") {
                FailureKind::NotFound
            } else {
                FailureKind::BadResponse
            };
            return Err(failure(kind, format!("LinkedIn API error: {}", message)));
        }

        Ok(body)
    }
}

fn into_output(result: Result<Value, ConnectorFailure>) -> ConnectorOutput {
    match result {
        Ok(payload) => ConnectorOutput::Success(payload),
        Err(failure) => ConnectorOutput::Failure(failure),
    }
}

fn bad_args(err: impl std::fmt::Display) -> ConnectorOutput {
    ConnectorOutput::fail(FailureKind::InvalidArguments, err.to_string())
}

/// Profile data: headline, summary, experience, education, skills
pub struct LinkedInProfileConnector {
    api: RapidApiClient,
    schema: ConnectorSchema,
}

impl LinkedInProfileConnector {
    pub fn new(api: RapidApiClient) -> Self {
        let schema = ConnectorSchema::new(
            "get_linkedin_profile",
            "Fetches a person's LinkedIn profile: headline, summary, experience, education and skills",
            EntityScope::Profile,
        )
        .required("linkedin_url", ParamType::String, "LinkedIn profile URL");
        Self { api, schema }
    }
}

#[async_trait]
impl Connector for LinkedInProfileConnector {
    fn schema(&self) -> &ConnectorSchema {
        &self.schema
    }

    async fn invoke(&self, args: &Value) -> ConnectorOutput {
        let url = match ConnectorArgs::new(args).param_str("linkedin_url") {
            Ok(url) => url,
            Err(e) => return bad_args(e),
        };
        let username = extract_username(url);

        into_output(
            self.api
                .get("/api/v1/user/profile", &[("username", username)])
                .await,
        )
    }
}

/// Recent posts by a person, for conversation starters
pub struct LinkedInActivityConnector {
    api: RapidApiClient,
    schema: ConnectorSchema,
}

impl LinkedInActivityConnector {
    pub fn new(api: RapidApiClient) -> Self {
        let schema = ConnectorSchema::new(
            "get_linkedin_activity",
            "Fetches a person's recent LinkedIn posts and activity",
            EntityScope::Profile,
        )
        .required("linkedin_url", ParamType::String, "LinkedIn profile URL")
        .optional(
            "limit",
            ParamType::Integer,
            "Number of recent posts to fetch",
            json!(DEFAULT_ACTIVITY_LIMIT),
        );
        Self { api, schema }
    }

    async fn fetch(&self, username: String, limit: usize) -> Result<Value, ConnectorFailure> {
        // Posts are addressed by URN, which only the profile endpoint exposes
        let profile = self
            .api
            .get("/api/v1/user/profile", &[("username", username)])
            .await?;
        let urn = profile
            .pointer("/data/urn")
            .and_then(Value::as_str)
            .ok_or_else(|| failure(FailureKind::NotFound, "Profile does not expose a URN"))?
            .to_string();

        let mut posts = self
            .api
            .get(
                "/api/v1/user/posts",
                &[("urn", urn), ("page", "1".to_string())],
            )
            .await?;

        if let Some(items) = posts.get_mut("data").and_then(Value::as_array_mut) {
            items.truncate(limit);
        }
        Ok(posts)
    }
}

#[async_trait]
impl Connector for LinkedInActivityConnector {
    fn schema(&self) -> &ConnectorSchema {
        &self.schema
    }

    async fn invoke(&self, args: &Value) -> ConnectorOutput {
        let args = ConnectorArgs::new(args);
        let url = match args.param_str("linkedin_url") {
            Ok(url) => url,
            Err(e) => return bad_args(e),
        };
        let limit = args
            .param_i64_opt("limit")
            .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
            .max(0) as usize;

        into_output(self.fetch(extract_username(url), limit).await)
    }
}

/// Company page: description, size, industry, headquarters
pub struct LinkedInCompanyConnector {
    api: RapidApiClient,
    schema: ConnectorSchema,
}

impl LinkedInCompanyConnector {
    pub fn new(api: RapidApiClient) -> Self {
        let schema = ConnectorSchema::new(
            "get_linkedin_company",
            "Fetches a company's LinkedIn page: description, size, industry, headquarters and recent updates",
            EntityScope::Company,
        )
        .required("company_name", ParamType::String, "Company name to look up");
        Self { api, schema }
    }
}

#[async_trait]
impl Connector for LinkedInCompanyConnector {
    fn schema(&self) -> &ConnectorSchema {
        &self.schema
    }

    async fn invoke(&self, args: &Value) -> ConnectorOutput {
        let company = match ConnectorArgs::new(args).param_str("company_name") {
            Ok(name) => name.to_string(),
            Err(e) => return bad_args(e),
        };

        into_output(self.api.get("/get-company", &[("company", company)]).await)
    }
}

/// Recent posts from a company page
pub struct CompanyPostsConnector {
    api: RapidApiClient,
    schema: ConnectorSchema,
}

impl CompanyPostsConnector {
    pub fn new(api: RapidApiClient) -> Self {
        let schema = ConnectorSchema::new(
            "get_company_posts",
            "Fetches recent posts from a company's LinkedIn page",
            EntityScope::Company,
        )
        .required("company_name", ParamType::String, "Company name to look up");
        Self { api, schema }
    }
}

#[async_trait]
impl Connector for CompanyPostsConnector {
    fn schema(&self) -> &ConnectorSchema {
        &self.schema
    }

    async fn invoke(&self, args: &Value) -> ConnectorOutput {
        let company = match ConnectorArgs::new(args).param_str("company_name") {
            Ok(name) => name.to_string(),
            Err(e) => return bad_args(e),
        };

        into_output(
            self.api
                .get("/get-company-posts", &[("company", company)])
                .await,
        )
    }
}
