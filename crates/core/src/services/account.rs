//! Account service.

use hivecache_common::{generate_rsa_keypair, AppError, AppResult, Config, IdGenerator};
use hivecache_db::{entities::account, repositories::AccountRepository};
use sea_orm::Set;
use serde::Deserialize;

/// Maximum accepted username length.
const MAX_USERNAME_LEN: usize = 64;

/// Input for creating a local account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateLocalAccountInput {
    /// Username (unique among local accounts, case-insensitive).
    pub username: String,
    /// Display name.
    pub display_name: Option<String>,
    /// Profile summary.
    pub summary: Option<String>,
}

/// Account service for business logic.
#[derive(Clone)]
pub struct AccountService {
    account_repo: AccountRepository,
    server_url: String,
    id_gen: IdGenerator,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub fn new(account_repo: AccountRepository, config: &Config) -> Self {
        Self {
            account_repo,
            server_url: config.server.url.trim_end_matches('/').to_string(),
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new local account.
    ///
    /// Generates the `ActivityPub` RSA keypair and derives every endpoint
    /// URL from the configured server URL.
    pub async fn create_local(&self, input: CreateLocalAccountInput) -> AppResult<account::Model> {
        let username = input.username.trim();

        if username.is_empty() || username.len() > MAX_USERNAME_LEN {
            return Err(AppError::BadRequest("Invalid username length".to_string()));
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AppError::BadRequest(
                "Username may only contain letters, digits and underscores".to_string(),
            ));
        }

        if self
            .account_repo
            .find_by_username_and_host(username, None)
            .await?
            .is_some()
        {
            return Err(AppError::BadRequest("Username already taken".to_string()));
        }

        // Generate RSA keypair for ActivityPub
        let keypair = generate_rsa_keypair()?;

        let uri = format!("{}/ap/u/{}", self.server_url, username);

        let model = account::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(username.to_string()),
            username_lower: Set(username.to_lowercase()),
            host: Set(None),
            uri: Set(uri.clone()),
            display_name: Set(input.display_name),
            summary: Set(input.summary),
            inbox: Set(format!("{uri}/inbox")),
            shared_inbox: Set(Some(format!("{}/ap/inbox", self.server_url))),
            outbox: Set(Some(format!("{uri}/outbox"))),
            followers_url: Set(Some(format!("{uri}/followers"))),
            following_url: Set(Some(format!("{uri}/following"))),
            public_key_pem: Set(keypair.public_key_pem),
            private_key_pem: Set(Some(keypair.private_key_pem)),
            ..Default::default()
        };

        self.account_repo.create(model).await
    }

    /// Get a local account by username, creating it if absent.
    ///
    /// Used at startup for the instance service actor.
    pub async fn ensure_local(&self, username: &str) -> AppResult<account::Model> {
        if let Some(account) = self.account_repo.find_local_by_username(username).await? {
            return Ok(account);
        }

        tracing::info!(%username, "Creating local account");
        self.create_local(CreateLocalAccountInput {
            username: username.to_string(),
            ..Default::default()
        })
        .await
    }

    /// Get an account by ID.
    pub async fn get(&self, id: &str) -> AppResult<account::Model> {
        self.account_repo.get_by_id(id).await
    }

    /// Get an account by username and host.
    pub async fn get_by_username(
        &self,
        username: &str,
        host: Option<&str>,
    ) -> AppResult<account::Model> {
        self.account_repo
            .find_by_username_and_host(username, host)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(username.to_string()))
    }

    /// Find a local account by username.
    pub async fn find_local_by_username(
        &self,
        username: &str,
    ) -> AppResult<Option<account::Model>> {
        self.account_repo.find_local_by_username(username).await
    }
}
