//! Admin client for the upstream commerce platform's GraphQL API.
//!
//! Setup tooling only: creates, lists, and deletes the webhook subscriptions
//! that point the platform at this service. None of this runs on the webhook
//! hot path, and it is the one place where a failure should terminate the
//! process, since it runs interactively.

use reqwest::Client;
use serde_json::{Value, json};

use crate::error::{AppError, Result};

/// Webhook topics this service consumes, with the endpoint each should be
/// delivered to.
pub const WEBHOOK_TOPICS: [(&str, &str); 6] = [
    ("products/create", "/webhooks/products"),
    ("products/update", "/webhooks/products"),
    ("products/delete", "/webhooks/products"),
    ("collections/create", "/webhooks/collections"),
    ("collections/update", "/webhooks/collections"),
    ("collections/delete", "/webhooks/collections"),
];

const CREATE_MUTATION: &str = r#"
mutation webhookSubscriptionCreate($topic: WebhookSubscriptionTopic!, $callbackUrl: URL!) {
  webhookSubscriptionCreate(topic: $topic, webhookSubscription: { callbackUrl: $callbackUrl, format: JSON }) {
    webhookSubscription { id topic callbackUrl }
    userErrors { field message }
  }
}
"#;

const LIST_QUERY: &str = r#"
query {
  webhookSubscriptions(first: 100) {
    edges { node { id topic callbackUrl } }
  }
}
"#;

const DELETE_MUTATION: &str = r#"
mutation webhookSubscriptionDelete($id: ID!) {
  webhookSubscriptionDelete(id: $id) {
    deletedWebhookSubscriptionId
    userErrors { field message }
  }
}
"#;

#[derive(Debug, Clone)]
pub struct WebhookSubscription {
    pub id: String,
    pub topic: String,
    pub callback_url: String,
}

#[derive(Debug, Clone)]
pub struct AdminClient {
    client: Client,
    endpoint: String,
    access_token: String,
}

impl AdminClient {
    pub fn new(domain: &str, access_token: &str, api_version: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("https://{}/admin/api/{}/graphql.json", domain, api_version),
            access_token: access_token.to_string(),
        }
    }

    async fn graphql(&self, query: &str, variables: Value) -> Result<Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Access-Token", &self.access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| AppError::UpstreamApi(format!("GraphQL request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamApi(format!(
                "GraphQL request failed: {}",
                error_text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamApi(format!("Invalid GraphQL response: {}", e)))?;

        if let Some(errors) = body.get("errors").and_then(|e| e.as_array())
            && !errors.is_empty()
        {
            return Err(AppError::UpstreamApi(format!("GraphQL errors: {}", Value::from(errors.clone()))));
        }

        Ok(body)
    }

    /// Fail on mutation-level userErrors, which arrive with a 200.
    fn check_user_errors(payload: &Value) -> Result<()> {
        let errors = payload
            .get("userErrors")
            .and_then(|e| e.as_array())
            .map(|errs| {
                errs.iter()
                    .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .unwrap_or_default();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::UpstreamApi(errors))
        }
    }

    fn subscription_from_node(node: &Value) -> Option<WebhookSubscription> {
        Some(WebhookSubscription {
            id: node.get("id")?.as_str()?.to_string(),
            topic: node.get("topic")?.as_str()?.to_string(),
            callback_url: node.get("callbackUrl")?.as_str()?.to_string(),
        })
    }

    pub async fn create_webhook_subscription(
        &self,
        topic: &str,
        callback_url: &str,
    ) -> Result<WebhookSubscription> {
        // GraphQL enum form: products/create -> PRODUCTS_CREATE
        let topic_enum = topic.replace('/', "_").to_uppercase();
        let body = self
            .graphql(
                CREATE_MUTATION,
                json!({ "topic": topic_enum, "callbackUrl": callback_url }),
            )
            .await?;

        let payload = &body["data"]["webhookSubscriptionCreate"];
        Self::check_user_errors(payload)?;

        Self::subscription_from_node(&payload["webhookSubscription"]).ok_or_else(|| {
            AppError::UpstreamApi("webhookSubscriptionCreate returned no subscription".to_string())
        })
    }

    pub async fn list_webhook_subscriptions(&self) -> Result<Vec<WebhookSubscription>> {
        let body = self.graphql(LIST_QUERY, json!({})).await?;

        let edges = body["data"]["webhookSubscriptions"]["edges"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        Ok(edges
            .iter()
            .filter_map(|edge| Self::subscription_from_node(&edge["node"]))
            .collect())
    }

    pub async fn delete_webhook_subscription(&self, id: &str) -> Result<()> {
        let body = self.graphql(DELETE_MUTATION, json!({ "id": id })).await?;
        Self::check_user_errors(&body["data"]["webhookSubscriptionDelete"])?;
        Ok(())
    }
}
