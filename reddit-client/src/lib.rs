pub mod api;
pub mod cooldown;
pub mod metrics;


use api::{RedditApiClient, REDDIT_OAUTH_BASE, REDDIT_PUBLIC_BASE};
use async_trait::async_trait;
use cooldown::{Cooldown, CooldownConfig, CooldownStatus};
use memescan_core::{CoreError, FetchRequest, FetchService, RawPost, RedditApiError, RedditSettings};
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthType, AuthUrl, ClientId, ClientSecret, ResourceOwnerPassword, ResourceOwnerUsername, Scope,
    TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Tokens this close to expiry are replaced before use.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedditOAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

impl RedditOAuth2Config {
    pub fn new(
        client_id: String,
        client_secret: String,
        username: String,
        password: String,
        user_agent: String,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            username,
            password,
            user_agent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    pub fn needs_refresh(&self) -> bool {
        SystemTime::now() + TOKEN_REFRESH_MARGIN >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// No credentials configured; requests go to the public JSON endpoints.
    Anonymous,
    NotAuthenticated,
    Authenticated { expires_at: SystemTime },
    TokenExpired { expired_at: SystemTime },
}

/// Fetch service backed by Reddit's listing endpoints.
pub struct RedditClient {
    api: RedditApiClient,
    credentials: Option<RedditOAuth2Config>,
    token: RwLock<Option<RedditToken>>,
    cooldown: Cooldown,
}

impl RedditClient {
    /// Uses the password grant against `oauth.reddit.com`.
    pub fn new(config: RedditOAuth2Config, cooldown: CooldownConfig) -> Result<Self, CoreError> {
        let api = RedditApiClient::new(config.user_agent.clone(), REDDIT_OAUTH_BASE)?;
        Ok(Self {
            api,
            credentials: Some(config),
            token: RwLock::new(None),
            cooldown: Cooldown::new(cooldown),
        })
    }

    /// Reads the public `.json` listings without logging in.
    pub fn anonymous(user_agent: String, cooldown: CooldownConfig) -> Result<Self, CoreError> {
        let api = RedditApiClient::new(user_agent, REDDIT_PUBLIC_BASE)?;
        Ok(Self {
            api,
            credentials: None,
            token: RwLock::new(None),
            cooldown: Cooldown::new(cooldown),
        })
    }

    pub fn from_settings(settings: &RedditSettings) -> Result<Self, CoreError> {
        let cooldown = CooldownConfig::new(Duration::from_millis(settings.cooldown_ms))
            .with_jitter(Duration::from_millis(settings.cooldown_jitter_ms));

        match (
            &settings.client_id,
            &settings.client_secret,
            &settings.username,
            &settings.password,
        ) {
            (Some(client_id), Some(client_secret), Some(username), Some(password)) => {
                info!("Using authenticated Reddit access as u/{}", username);
                Self::new(
                    RedditOAuth2Config::new(
                        client_id.clone(),
                        client_secret.clone(),
                        username.clone(),
                        password.clone(),
                        settings.user_agent.clone(),
                    ),
                    cooldown,
                )
            }
            _ => {
                info!("No Reddit credentials configured, using public listings");
                Self::anonymous(settings.user_agent.clone(), cooldown)
            }
        }
    }

    pub fn get_required_scopes() -> Vec<&'static str> {
        vec!["read"]
    }

    pub fn is_anonymous(&self) -> bool {
        self.credentials.is_none()
    }

    pub async fn get_auth_state(&self) -> AuthState {
        if self.is_anonymous() {
            return AuthState::Anonymous;
        }
        match self.token.read().await.as_ref() {
            None => AuthState::NotAuthenticated,
            Some(token) if token.is_expired() => AuthState::TokenExpired {
                expired_at: token.expires_at,
            },
            Some(token) => AuthState::Authenticated {
                expires_at: token.expires_at,
            },
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        matches!(self.get_auth_state().await, AuthState::Authenticated { .. })
    }

    pub async fn set_token(&self, token: RedditToken) {
        *self.token.write().await = Some(token);
    }

    /// Drops the cached token when Reddit rejected it, so the next fetch
    /// logs in again instead of reusing it until expiry.
    pub async fn discard_rejected_token(&self, error: &CoreError) {
        if matches!(error, CoreError::RedditApi(RedditApiError::InvalidToken))
            && self.token.write().await.take().is_some()
        {
            warn!("Reddit rejected the access token, it will be renewed on the next fetch");
        }
    }

    pub async fn authenticate(&self) -> Result<RedditToken, CoreError> {
        let config = self.credentials.as_ref().ok_or_else(|| {
            CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                reason: "No credentials configured".to_string(),
            })
        })?;

        let oauth_client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(auth_url_error)?,
            Some(TokenUrl::new(REDDIT_TOKEN_URL.to_string()).map_err(auth_url_error)?),
        )
        .set_auth_type(AuthType::BasicAuth);

        debug!("Requesting Reddit access token for u/{}", config.username);
        let response = oauth_client
            .exchange_password(
                &ResourceOwnerUsername::new(config.username.clone()),
                &ResourceOwnerPassword::new(config.password.clone()),
            )
            .add_scopes(
                Self::get_required_scopes()
                    .into_iter()
                    .map(|scope| Scope::new(scope.to_string())),
            )
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    reason: e.to_string(),
                })
            })?;

        let expires_in = response.expires_in().unwrap_or(Duration::from_secs(3600));
        let token = RedditToken {
            access_token: response.access_token().secret().clone(),
            expires_at: SystemTime::now() + expires_in,
            scope: response
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.as_str().to_string()).collect())
                .unwrap_or_else(|| {
                    Self::get_required_scopes()
                        .into_iter()
                        .map(str::to_string)
                        .collect()
                }),
        };

        info!("Authenticated with Reddit, token valid for {:?}", expires_in);
        self.set_token(token.clone()).await;
        Ok(token)
    }

    /// Returns a usable access token, or `None` in anonymous mode.
    pub async fn ensure_authenticated(&self) -> Result<Option<String>, CoreError> {
        if self.is_anonymous() {
            return Ok(None);
        }

        if let Some(token) = self.token.read().await.as_ref() {
            if !token.needs_refresh() {
                return Ok(Some(token.access_token.clone()));
            }
            debug!("Reddit access token expiring, requesting a new one");
        }

        let token = self.authenticate().await?;
        Ok(Some(token.access_token))
    }

    pub async fn get_api_metrics(&self) -> metrics::ApiMetrics {
        self.api.get_metrics().await
    }

    pub async fn get_cooldown_status(&self) -> CooldownStatus {
        self.cooldown.status().await
    }
}

fn auth_url_error(e: oauth2::url::ParseError) -> CoreError {
    CoreError::Internal {
        message: format!("Invalid Reddit OAuth endpoint: {}", e),
    }
}

#[async_trait]
impl FetchService for RedditClient {
    async fn fetch(
        &self,
        subreddit: &str,
        request: &FetchRequest,
    ) -> Result<Vec<RawPost>, CoreError> {
        let access_token = self.ensure_authenticated().await?;

        let result = self
            .api
            .get_subreddit_posts(access_token.as_deref(), subreddit, request, &self.cooldown)
            .await;
        if let Err(error) = &result {
            self.discard_rejected_token(error).await;
        }
        result
    }

    fn name(&self) -> &str {
        if self.is_anonymous() {
            "reddit-public"
        } else {
            "reddit-oauth"
        }
    }
}
