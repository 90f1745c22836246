//! Keystone v3 token issuing

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ApiError, Client};

pub const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Credentials used to obtain a token
#[derive(Debug, Clone, Default)]
pub struct AuthOptions {
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub domain_name: Option<String>,
    pub tenant_id: Option<String>,
    pub tenant_name: Option<String>,
    pub token: Option<String>,
}

impl AuthOptions {
    fn identity(&self) -> Result<serde_json::Value, ApiError> {
        if let Some(token) = &self.token {
            return Ok(json!({
                "methods": ["token"],
                "token": { "id": token },
            }));
        }

        match (&self.user_name, &self.password) {
            (Some(user), Some(password)) => {
                let mut user_obj = json!({ "name": user, "password": password });
                if let Some(domain) = &self.domain_name {
                    user_obj["domain"] = json!({ "name": domain });
                }
                Ok(json!({
                    "methods": ["password"],
                    "password": { "user": user_obj },
                }))
            }
            _ => Err(ApiError::MissingCredentials(
                "either a token or user_name and password are required".to_string(),
            )),
        }
    }

    fn scope(&self) -> Option<serde_json::Value> {
        if let Some(id) = &self.tenant_id {
            return Some(json!({ "project": { "id": id } }));
        }
        if let Some(name) = &self.tenant_name {
            let mut project = json!({ "name": name });
            if let Some(domain) = &self.domain_name {
                project["domain"] = json!({ "name": domain });
            }
            return Some(json!({ "project": project }));
        }
        self.domain_name
            .as_ref()
            .map(|domain| json!({ "domain": { "name": domain } }))
    }

    pub fn request_body(&self) -> Result<AuthRequest, ApiError> {
        let mut auth = json!({ "identity": self.identity()? });
        if let Some(scope) = self.scope() {
            auth["scope"] = scope;
        }
        Ok(AuthRequest { auth })
    }
}

#[derive(Debug, Serialize)]
pub struct AuthRequest {
    pub auth: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(default)]
    project: Option<ProjectRef>,
    #[serde(default)]
    expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectRef {
    id: String,
}

/// An issued token together with the project it is scoped to
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub project_id: Option<String>,
    pub expires_at: Option<String>,
}

pub struct IdentityApi<'a> {
    client: &'a Client,
}

impl<'a> IdentityApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /auth/tokens
    pub async fn issue_token(&self, options: &AuthOptions) -> Result<IssuedToken, ApiError> {
        let body = options.request_body()?;
        let path = "/auth/tokens";

        let response = self
            .client
            .send_with_retry(
                || async {
                    self.client
                        .http_client()
                        .post(self.client.service_url(path))
                        .json(&body)
                        .send()
                        .await
                },
                path,
            )
            .await
            .map_err(|e| match e {
                ApiError::AuthError(message) => ApiError::AuthError(format!(
                    "Keystone rejected the credentials: {}",
                    message
                )),
                other => other,
            })?;

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ApiError::AuthError(format!("response did not carry {}", SUBJECT_TOKEN_HEADER))
            })?;

        let text = response.text().await?;
        let parsed: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::ParseError(format!("Failed to parse token response: {}", e)))?;

        tracing::info!(
            project_id = ?parsed.token.project.as_ref().map(|p| &p.id),
            "Obtained Keystone token"
        );

        Ok(IssuedToken {
            token,
            project_id: parsed.token.project.map(|p| p.id),
            expires_at: parsed.token.expires_at,
        })
    }
}
