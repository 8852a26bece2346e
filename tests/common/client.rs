//! Thin HTTP client for the test server.

use reqwest::Response;

pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub async fn home(&self) -> Response {
        self.client
            .get(&self.base_url)
            .send()
            .await
            .expect("home request failed")
    }

    /// `query` is the raw query string, e.g. "limit=5&exploration=false".
    pub async fn recommendations(&self, user_id: &str, query: &str) -> Response {
        self.client
            .get(format!("{}/v1/recommendations?{}", self.base_url, query))
            .header("X-User-Id", user_id)
            .send()
            .await
            .expect("recommendations request failed")
    }

    pub async fn recommendations_without_user(&self) -> Response {
        self.client
            .get(format!("{}/v1/recommendations", self.base_url))
            .send()
            .await
            .expect("recommendations request failed")
    }

    pub async fn post_interaction(&self, user_id: &str, body: serde_json::Value) -> Response {
        self.client
            .post(format!("{}/v1/interaction", self.base_url))
            .header("X-User-Id", user_id)
            .json(&body)
            .send()
            .await
            .expect("interaction request failed")
    }

    pub async fn get_profile(&self, user_id: &str) -> Response {
        self.client
            .get(format!("{}/v1/profile", self.base_url))
            .header("X-User-Id", user_id)
            .send()
            .await
            .expect("profile request failed")
    }

    pub async fn put_profile(&self, user_id: &str, body: serde_json::Value) -> Response {
        self.client
            .put(format!("{}/v1/profile", self.base_url))
            .header("X-User-Id", user_id)
            .json(&body)
            .send()
            .await
            .expect("profile update request failed")
    }

    pub async fn trending(&self, query: &str) -> Response {
        self.client
            .get(format!("{}/v1/trending?{}", self.base_url, query))
            .send()
            .await
            .expect("trending request failed")
    }
}
