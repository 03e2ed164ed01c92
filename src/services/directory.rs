//! Subaccount credential directory.
//!
//! The provider exposes one API key pair per subaccount through a key
//! listing endpoint. [`resolve_all`] fetches the whole directory once per
//! run with master credentials; a failure here is fatal to the run since no
//! subaccount can be processed without its scoped credential.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::SubaccountId;
use crate::providers::{ApiError, Credential, Endpoint, ListFilters, ProviderApi, Result};
use crate::services::fetcher::fetch_all;

/// One entry of the provider's key directory.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyRecord {
    /// Subaccount name; the join key against the report configuration.
    #[serde(rename = "Name")]
    pub name: String,
    /// Provider-assigned subaccount id; the watermark key.
    #[serde(rename = "ID")]
    pub id: i64,
    /// Scoped API key.
    #[serde(rename = "APIKey")]
    pub api_key: String,
    /// Scoped API secret.
    #[serde(rename = "SecretKey")]
    pub secret_key: String,
}

impl ApiKeyRecord {
    /// The scoped credential for this subaccount.
    pub fn credential(&self) -> Credential {
        Credential::new(self.api_key.clone(), self.secret_key.clone())
    }

    /// The watermark key for this subaccount.
    pub fn subaccount_id(&self) -> SubaccountId {
        SubaccountId::from(self.id)
    }
}

/// Fetches the full key directory, keyed by subaccount name.
pub async fn resolve_all(
    api: &dyn ProviderApi,
    master: &Credential,
) -> Result<BTreeMap<String, ApiKeyRecord>> {
    let records = fetch_all(api, Endpoint::ApiKeys, master, &ListFilters::default()).await?;

    let mut directory = BTreeMap::new();
    for value in records {
        let record: ApiKeyRecord = serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("malformed key record: {e}")))?;
        directory.insert(record.name.clone(), record);
    }
    Ok(directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Page, PageQuery, SendRequest};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct KeyListApi {
        responses: Mutex<Vec<Result<Page>>>,
    }

    #[async_trait]
    impl ProviderApi for KeyListApi {
        async fn fetch_page(
            &self,
            endpoint: Endpoint,
            _credential: &Credential,
            _query: &PageQuery,
        ) -> Result<Page> {
            assert_eq!(endpoint, Endpoint::ApiKeys);
            self.responses.lock().unwrap().remove(0)
        }

        async fn send_message(&self, _credential: &Credential, _request: &SendRequest) -> Result<()> {
            Err(ApiError::Connection("not a send test".to_string()))
        }
    }

    fn key_record(name: &str, id: i64) -> serde_json::Value {
        serde_json::json!({
            "Name": name,
            "ID": id,
            "APIKey": format!("key-{name}"),
            "SecretKey": format!("secret-{name}"),
        })
    }

    #[tokio::test]
    async fn resolves_directory_by_name() {
        let api = KeyListApi {
            responses: Mutex::new(vec![
                Ok(Page {
                    count: 2,
                    data: vec![],
                }),
                Ok(Page {
                    count: 2,
                    data: vec![key_record("shop", 42), key_record("news", 43)],
                }),
            ]),
        };

        let directory = resolve_all(&api, &Credential::new("m", "s")).await.unwrap();

        assert_eq!(directory.len(), 2);
        let shop = &directory["shop"];
        assert_eq!(shop.id, 42);
        assert_eq!(shop.subaccount_id(), crate::domain::SubaccountId::from(42));
        assert_eq!(shop.credential().api_key, "key-shop");
    }

    #[tokio::test]
    async fn malformed_record_fails_resolution() {
        let api = KeyListApi {
            responses: Mutex::new(vec![
                Ok(Page {
                    count: 1,
                    data: vec![],
                }),
                Ok(Page {
                    count: 1,
                    data: vec![serde_json::json!({ "Name": "shop" })],
                }),
            ]),
        };

        let result = resolve_all(&api, &Credential::new("m", "s")).await;
        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let api = KeyListApi {
            responses: Mutex::new(vec![Err(ApiError::Connection("refused".to_string()))]),
        };

        let result = resolve_all(&api, &Credential::new("m", "s")).await;
        assert!(matches!(result, Err(ApiError::Connection(_))));
    }
}
