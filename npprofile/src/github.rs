//! Vitrine des dépôts GitHub
//!
//! Une requête GraphQL liste les dépôts les plus récents du compte, puis une
//! requête REST par dépôt détermine l'URL publiée :
//!
//! - GitHub Pages construit : statut `BUILT`
//! - sinon la homepage déclarée : statut `CUSTOM`
//! - sinon aucune
//!
//! Le résultat complet est mis en cache une heure.

use crate::config_ext::GitHubSettings;
use crate::error::{ProfileError, Result};
use futures::future::join_all;
use npcache::TieredCache;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

const CACHE_KEY: &str = "repositories";
const USER_AGENT: &str = "npsite";

const REPOSITORIES_QUERY: &str = r#"
query($login: String!, $first: Int!) {
  user(login: $login) {
    repositories(first: $first, orderBy: { field: CREATED_AT, direction: DESC }) {
      nodes {
        id
        name
        description
        url
        homepageUrl
        primaryLanguage { name }
        languages(first: 5) { nodes { name } }
      }
    }
  }
}
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum PagesStatus {
    Built,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pages {
    pub status: PagesStatus,
    pub url: String,
}

/// Dépôt tel que présenté sur le site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    /// URL publiée (Pages ou homepage), identique à `pages.url`
    pub homepage_url: Option<String>,
    pub primary_language: Option<String>,
    pub languages: Vec<String>,
    pub pages: Option<Pages>,
}

// ============ Réponse GraphQL ============

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    user: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    repositories: Connection<RawRepository>,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct NamedNode {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRepository {
    id: String,
    name: String,
    description: Option<String>,
    url: String,
    homepage_url: Option<String>,
    primary_language: Option<NamedNode>,
    languages: Option<Connection<NamedNode>>,
}

#[derive(Debug, Deserialize)]
struct RawPages {
    html_url: Option<String>,
}

pub struct GitHubClient {
    http: Client,
    settings: GitHubSettings,
    cache: TieredCache<Vec<Repository>>,
}

impl GitHubClient {
    pub fn new(settings: GitHubSettings, cache: TieredCache<Vec<Repository>>) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            settings,
            cache,
        })
    }

    pub fn settings(&self) -> &GitHubSettings {
        &self.settings
    }

    pub fn is_configured(&self) -> bool {
        self.settings.token.is_some()
    }

    /// Dernière liste en cache, sans appel réseau
    pub async fn cached(&self) -> Option<Vec<Repository>> {
        self.cache.get(CACHE_KEY).await
    }

    /// Dépôts récents, depuis le cache si possible
    pub async fn repositories(&self) -> Result<Vec<Repository>> {
        let token = self
            .settings
            .token
            .as_deref()
            .ok_or(ProfileError::MissingConfig("github.token"))?;

        if let Some(repositories) = self.cached().await {
            debug!("GitHub repositories served from cache");
            return Ok(repositories);
        }

        let raw = self.fetch_repositories(token).await?;
        let lookups = raw.into_iter().map(|repo| self.with_pages(token, repo));
        let repositories: Vec<Repository> = join_all(lookups).await;

        self.cache.put(CACHE_KEY, repositories.clone()).await;
        info!(
            "Fetched {} GitHub repositories for {}",
            repositories.len(),
            self.settings.login
        );
        Ok(repositories)
    }

    async fn fetch_repositories(&self, token: &str) -> Result<Vec<RawRepository>> {
        let body = json!({
            "query": REPOSITORIES_QUERY,
            "variables": {
                "login": self.settings.login,
                "first": self.settings.repositories,
            }
        });

        let response = self
            .http
            .post(&self.settings.graphql_url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProfileError::Upstream {
                service: "GitHub",
                code: status.as_u16(),
                message,
            });
        }

        let payload: GraphQlResponse = response.json().await?;
        if let Some(errors) = payload.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(ProfileError::GraphQl(messages.join("; ")));
        }

        payload
            .data
            .and_then(|d| d.user)
            .map(|u| u.repositories.nodes)
            .ok_or_else(|| ProfileError::GraphQl(format!("user {} not found", self.settings.login)))
    }

    async fn with_pages(&self, token: &str, repo: RawRepository) -> Repository {
        let pages = match self.pages_url(token, &repo.name).await {
            Some(url) => Some(Pages {
                status: PagesStatus::Built,
                url,
            }),
            None => repo
                .homepage_url
                .as_ref()
                .filter(|h| !h.is_empty())
                .map(|h| Pages {
                    status: PagesStatus::Custom,
                    url: h.clone(),
                }),
        };

        Repository {
            id: repo.id,
            name: repo.name,
            description: repo.description,
            url: repo.url,
            homepage_url: pages.as_ref().map(|p| p.url.clone()),
            primary_language: repo.primary_language.map(|l| l.name),
            languages: repo
                .languages
                .map(|c| c.nodes.into_iter().map(|l| l.name).collect())
                .unwrap_or_default(),
            pages,
        }
    }

    /// URL GitHub Pages si le site est publié
    async fn pages_url(&self, token: &str, name: &str) -> Option<String> {
        let url = format!(
            "{}/repos/{}/{}/pages",
            self.settings.api_base_url.trim_end_matches('/'),
            self.settings.login,
            name
        );

        let response = match self
            .http
            .get(&url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("GitHub Pages lookup failed for {}: {}", name, e);
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            return None;
        }

        let fallback = format!("https://{}.github.io/{}/", self.settings.login, name);
        match response.json::<RawPages>().await {
            Ok(pages) => Some(pages.html_url.unwrap_or(fallback)),
            Err(e) => {
                warn!("Unexpected GitHub Pages payload for {}: {}", name, e);
                Some(fallback)
            }
        }
    }
}
