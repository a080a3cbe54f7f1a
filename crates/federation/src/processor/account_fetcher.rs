//! Remote account resolution and caching.

use async_trait::async_trait;
use chrono::Utc;
use hivecache_common::{AppError, AppResult, IdGenerator};
use hivecache_core::AccountResolver;
use hivecache_db::entities::account;
use hivecache_db::repositories::AccountRepository;
use sea_orm::Set;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::actors::ApPerson;
use crate::client::ApClient;
use crate::convert::UrlConfig;
use crate::handle::parse_handle;
use crate::objects::WebfingerDocument;

/// Resolves actors to cached account rows, fetching over WebFinger and
/// `ActivityPub` on a miss.
#[derive(Clone)]
pub struct AccountFetcher {
    account_repo: AccountRepository,
    ap_client: ApClient,
    url_config: UrlConfig,
    id_gen: IdGenerator,
}

impl AccountFetcher {
    #[must_use]
    pub const fn new(
        account_repo: AccountRepository,
        ap_client: ApClient,
        url_config: UrlConfig,
    ) -> Self {
        Self {
            account_repo,
            ap_client,
            url_config,
            id_gen: IdGenerator::new(),
        }
    }

    /// Resolve a handle to an account.
    ///
    /// Local handles look up the local row. Remote handles are answered from
    /// the cache when the `(username, host)` pair is known, otherwise via
    /// WebFinger and an actor fetch.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadRequest`] for malformed handles,
    /// [`AppError::AccountNotFound`] for unknown local users, and
    /// [`AppError::Federation`] when the remote side cannot be resolved.
    pub async fn resolve_handle(&self, handle: &str) -> AppResult<account::Model> {
        let parsed = parse_handle(handle, self.url_config.host())?;

        if parsed.is_local(self.url_config.host()) {
            return self
                .account_repo
                .find_local_by_username(&parsed.username)
                .await?
                .ok_or_else(|| AppError::AccountNotFound(parsed.username.clone()));
        }

        if let Some(account) = self
            .account_repo
            .find_by_username_and_host(&parsed.username, Some(&parsed.host))
            .await?
        {
            debug!(username = %parsed.username, host = %parsed.host, "Account found in cache");
            return Ok(account);
        }

        info!(
            username = %parsed.username,
            host = %parsed.host,
            "Resolving remote account via WebFinger"
        );
        let jrd_value = self
            .ap_client
            .webfinger(&parsed.username, &parsed.host)
            .await
            .map_err(|e| AppError::Federation(format!("WebFinger lookup failed for {handle}: {e}")))?;
        let jrd: WebfingerDocument = serde_json::from_value(jrd_value)
            .map_err(|e| AppError::Federation(format!("Invalid WebFinger document for {handle}: {e}")))?;

        let actor_link = jrd.actor_link().ok_or_else(|| {
            AppError::Federation(format!("WebFinger document for {handle} has no actor link"))
        })?;
        let actor_url = Url::parse(actor_link).map_err(|e| {
            AppError::Federation(format!("Invalid actor URL in WebFinger document: {e}"))
        })?;

        self.fetch_and_store(&actor_url).await
    }

    /// Get the account for an actor URI, fetching the actor document when
    /// the URI is not cached yet.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Federation`] when the actor cannot be fetched or
    /// its document is unusable.
    pub async fn find_or_fetch(&self, actor_url: &Url) -> AppResult<account::Model> {
        if let Some(account) = self.account_repo.find_by_uri(actor_url.as_str()).await? {
            debug!(uri = %actor_url, "Account found in cache");
            return Ok(account);
        }

        info!(uri = %actor_url, "Fetching remote actor");
        self.fetch_and_store(actor_url).await
    }

    async fn fetch_and_store(&self, actor_url: &Url) -> AppResult<account::Model> {
        let actor_json = self
            .ap_client
            .fetch_actor(actor_url.as_str())
            .await
            .map_err(|e| AppError::Federation(format!("Failed to fetch actor {actor_url}: {e}")))?;

        self.store_actor(&actor_json, actor_url).await
    }

    /// Persist a fetched actor document, refreshing an already-known
    /// `(username, host)` row in place.
    async fn store_actor(&self, actor: &Value, actor_url: &Url) -> AppResult<account::Model> {
        let host = actor_url
            .host_str()
            .ok_or_else(|| AppError::Federation(format!("Actor URL {actor_url} has no host")))?
            .to_string();

        let person: ApPerson = serde_json::from_value(actor.clone()).map_err(|e| {
            AppError::Federation(format!("Invalid actor document from {actor_url}: {e}"))
        })?;

        let shared_inbox = person.shared_inbox().map(ToString::to_string);
        let public_key_pem = person
            .public_key
            .as_ref()
            .map(|key| key.public_key_pem.clone())
            .ok_or_else(|| AppError::Federation(format!("Actor {actor_url} has no public key")))?;

        if let Some(existing) = self
            .account_repo
            .find_by_username_and_host(&person.preferred_username, Some(&host))
            .await?
        {
            debug!(account_id = %existing.id, "Refreshing known remote account");
            let mut active: account::ActiveModel = existing.into();
            active.uri = Set(actor_url.to_string());
            active.display_name = Set(person.name.clone());
            active.summary = Set(person.summary.clone());
            active.inbox = Set(person.inbox.to_string());
            active.shared_inbox = Set(shared_inbox);
            active.public_key_pem = Set(public_key_pem);
            active.last_fetched_at = Set(Some(Utc::now().into()));
            active.updated_at = Set(Some(Utc::now().into()));
            return self.account_repo.update(active).await;
        }

        let model = account::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(person.preferred_username.clone()),
            username_lower: Set(person.preferred_username.to_lowercase()),
            host: Set(Some(host.clone())),
            uri: Set(actor_url.to_string()),
            display_name: Set(person.name.clone()),
            summary: Set(person.summary.clone()),
            inbox: Set(person.inbox.to_string()),
            shared_inbox: Set(shared_inbox),
            outbox: Set(person.outbox.as_ref().map(ToString::to_string)),
            followers_url: Set(person.followers.as_ref().map(ToString::to_string)),
            following_url: Set(person.following.as_ref().map(ToString::to_string)),
            public_key_pem: Set(public_key_pem),
            private_key_pem: Set(None),
            last_fetched_at: Set(Some(Utc::now().into())),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        match self.account_repo.create(model).await {
            Ok(created) => {
                info!(
                    account_id = %created.id,
                    username = %created.username,
                    host = %host,
                    "Created remote account"
                );
                Ok(created)
            }
            Err(AppError::Conflict(_)) => {
                debug!(
                    username = %person.preferred_username,
                    host = %host,
                    "Remote account created concurrently, re-reading"
                );
                self.account_repo
                    .find_by_username_and_host(&person.preferred_username, Some(&host))
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal(format!(
                            "Account {}@{host} missing after conflicting insert",
                            person.preferred_username
                        ))
                    })
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl AccountResolver for AccountFetcher {
    async fn resolve(&self, handle: &str) -> AppResult<account::Model> {
        self.resolve_handle(handle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn test_fetcher(db: Arc<sea_orm::DatabaseConnection>) -> AccountFetcher {
        AccountFetcher::new(
            AccountRepository::new(db),
            ApClient::new("hivecache-test/0.1").unwrap(),
            UrlConfig::new(Url::parse("https://bookmarks.example").unwrap()),
        )
    }

    fn local_account(id: &str, username: &str) -> account::Model {
        account::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            host: None,
            uri: format!("https://bookmarks.example/ap/u/{username}"),
            display_name: None,
            summary: None,
            inbox: format!("https://bookmarks.example/ap/u/{username}/inbox"),
            shared_inbox: Some("https://bookmarks.example/ap/inbox".to_string()),
            outbox: None,
            followers_url: None,
            following_url: None,
            public_key_pem: "pem".to_string(),
            private_key_pem: Some("private pem".to_string()),
            last_fetched_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn remote_account(id: &str, username: &str) -> account::Model {
        account::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            host: Some("remote.example".to_string()),
            uri: format!("https://remote.example/users/{username}"),
            display_name: None,
            summary: None,
            inbox: format!("https://remote.example/users/{username}/inbox"),
            shared_inbox: Some("https://remote.example/inbox".to_string()),
            outbox: None,
            followers_url: None,
            following_url: None,
            public_key_pem: "pem".to_string(),
            private_key_pem: None,
            last_fetched_at: Some(Utc::now().into()),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn actor_document(username: &str) -> Value {
        serde_json::json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "type": "Person",
            "id": format!("https://remote.example/users/{username}"),
            "preferredUsername": username,
            "inbox": format!("https://remote.example/users/{username}/inbox"),
            "endpoints": { "sharedInbox": "https://remote.example/inbox" },
            "publicKey": {
                "id": format!("https://remote.example/users/{username}#main-key"),
                "owner": format!("https://remote.example/users/{username}"),
                "publicKeyPem": "-----BEGIN PUBLIC KEY-----\nkey\n-----END PUBLIC KEY-----"
            }
        })
    }

    #[tokio::test]
    async fn test_resolve_local_handle() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[local_account("a1", "alice")]])
                .into_connection(),
        );

        let account = test_fetcher(db).resolve_handle("@alice").await.unwrap();
        assert_eq!(account.username, "alice");
        assert!(account.is_local());
    }

    #[tokio::test]
    async fn test_resolve_unknown_local_handle() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<account::Model>::new()])
                .into_connection(),
        );

        let result = test_fetcher(db).resolve_handle("ghost").await;
        assert!(matches!(result, Err(AppError::AccountNotFound(_))));
    }

    #[tokio::test]
    async fn test_resolve_remote_handle_from_cache() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[remote_account("a2", "bob")]])
                .into_connection(),
        );

        let account = test_fetcher(db)
            .resolve_handle("bob@remote.example")
            .await
            .unwrap();
        assert_eq!(account.host.as_deref(), Some("remote.example"));
    }

    #[tokio::test]
    async fn test_find_or_fetch_prefers_cached_uri() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[remote_account("a2", "bob")]])
                .into_connection(),
        );

        let url = Url::parse("https://remote.example/users/bob").unwrap();
        let account = test_fetcher(db).find_or_fetch(&url).await.unwrap();
        assert_eq!(account.id, "a2");
    }

    #[tokio::test]
    async fn test_store_actor_creates_account() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<account::Model>::new()])
                .append_query_results([[remote_account("a3", "bob")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let url = Url::parse("https://remote.example/users/bob").unwrap();
        let account = test_fetcher(db)
            .store_actor(&actor_document("bob"), &url)
            .await
            .unwrap();

        assert_eq!(account.username, "bob");
        assert_eq!(account.host.as_deref(), Some("remote.example"));
    }

    #[tokio::test]
    async fn test_store_actor_requires_public_key() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let mut actor = actor_document("bob");
        actor.as_object_mut().unwrap().remove("publicKey");

        let url = Url::parse("https://remote.example/users/bob").unwrap();
        let result = test_fetcher(db).store_actor(&actor, &url).await;

        assert!(matches!(result, Err(AppError::Federation(_))));
    }

    #[tokio::test]
    async fn test_store_actor_refreshes_known_account() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[remote_account("a2", "bob")]])
                .append_query_results([[remote_account("a2", "bob")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let url = Url::parse("https://remote.example/users/bob").unwrap();
        let account = test_fetcher(db)
            .store_actor(&actor_document("bob"), &url)
            .await
            .unwrap();

        assert_eq!(account.id, "a2");
    }
}
