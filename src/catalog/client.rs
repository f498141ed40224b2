//! Spotify Web API HTTP client

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::models::*;

const ACCOUNTS_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Refresh slack so a token never expires mid-request
const TOKEN_EXPIRY_SLACK: Duration = Duration::from_secs(60);

/// Spotify app client id/secret pair
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub client_id: String,
    pub client_secret: String,
}

struct BearerToken {
    value: String,
    expires_at: Instant,
}

/// Client for the catalog metadata API using the client-credentials flow
pub struct CatalogClient {
    http: Client,
    credentials: AppCredentials,
    token: Mutex<Option<BearerToken>>,
}

impl CatalogClient {
    pub fn new(credentials: AppCredentials) -> Result<Self> {
        let http = Client::builder()
            .user_agent("tunegrab/0.1.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            credentials,
            token: Mutex::new(None),
        })
    }

    /// Fetch a token right away, verifying the app credentials
    pub async fn authenticate(&self) -> Result<()> {
        info!("Connecting to catalog API");
        let token = self.fetch_token().await?;
        *self.token.lock().await = Some(token);
        info!("Connected to catalog API");
        Ok(())
    }

    async fn fetch_token(&self) -> Result<BearerToken> {
        debug!("Requesting client-credentials token");

        let response = self
            .http
            .post(ACCOUNTS_TOKEN_URL)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("Failed to reach the token endpoint")?
            .error_for_status()
            .context("Catalog API rejected the app credentials")?;

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        Ok(BearerToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }

    /// Current bearer token, refreshed when (nearly) expired
    async fn bearer(&self) -> Result<String> {
        let mut slot = self.token.lock().await;
        match &*slot {
            Some(token) if token.expires_at > Instant::now() + TOKEN_EXPIRY_SLACK => {
                Ok(token.value.clone())
            }
            _ => {
                let token = self.fetch_token().await?;
                let value = token.value.clone();
                *slot = Some(token);
                Ok(value)
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let bearer = self.bearer().await?;
        debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .bearer_auth(bearer)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("Catalog API error for {url}"))?;

        response
            .json()
            .await
            .context("Failed to parse catalog response")
    }

    pub async fn track(&self, id: &str) -> Result<TrackObject> {
        self.get_json(&format!("{API_BASE_URL}/tracks/{id}")).await
    }

    pub async fn album(&self, id: &str) -> Result<AlbumWithTracks> {
        self.get_json(&format!("{API_BASE_URL}/albums/{id}")).await
    }

    /// All items of a playlist, following pagination
    pub async fn playlist_items(&self, id: &str) -> Result<Vec<PlaylistItem>> {
        let mut url = format!("{API_BASE_URL}/playlists/{id}/tracks");
        let mut items = Vec::new();

        loop {
            let page: PlaylistItemsPage = self.get_json(&url).await?;
            items.extend(page.items);
            match page.next {
                Some(next) => url = next,
                None => break,
            }
        }

        debug!("Playlist {} has {} items", id, items.len());
        Ok(items)
    }

    pub async fn artist_top_tracks(&self, id: &str) -> Result<Vec<TrackObject>> {
        let response: TopTracksResponse = self
            .get_json(&format!("{API_BASE_URL}/artists/{id}/top-tracks?market=US"))
            .await?;
        Ok(response.tracks)
    }

    /// Free-text track search
    pub async fn search_tracks(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TrackObject>> {
        let url = url::Url::parse_with_params(
            &format!("{API_BASE_URL}/search"),
            &[
                ("q", query),
                ("type", "track"),
                ("limit", &limit.to_string()),
                ("offset", &offset.to_string()),
            ],
        )
        .context("Failed to build search URL")?;

        let response: SearchResponse = self.get_json(url.as_str()).await?;
        Ok(response.tracks.map(|page| page.items).unwrap_or_default())
    }
}
