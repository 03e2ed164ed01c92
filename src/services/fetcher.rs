//! Paginated retrieval of counted list endpoints.
//!
//! The provider's list endpoints are offset-paginated with a reserved
//! `countOnly` parameter for probing the total. [`fetch_all`] wraps the
//! probe-then-page protocol into a single complete result set and fails
//! closed: any transport error or malformed page anywhere aborts the whole
//! fetch so the caller never reports on incomplete data.

use serde_json::Value;

use crate::providers::{Credential, Endpoint, ListFilters, PageQuery, ProviderApi, Result};

/// Fixed page size for list fetches.
pub const BATCH_LIMIT: u32 = 200;

/// Fetches the complete record set matching `filters`.
///
/// Issues one count probe, then pages of [`BATCH_LIMIT`] at increasing
/// offsets until a page comes back empty or the accumulated offset reaches
/// the probed count. Records are returned in server order.
///
/// A zero probed count is a valid empty result, not an error.
pub async fn fetch_all(
    api: &dyn ProviderApi,
    endpoint: Endpoint,
    credential: &Credential,
    filters: &ListFilters,
) -> Result<Vec<Value>> {
    let probe = api
        .fetch_page(endpoint, credential, &PageQuery::count_probe(filters.clone()))
        .await?;
    let total = probe.count;

    let mut records = Vec::new();
    let mut offset = 0u64;
    while offset < total {
        let page = api
            .fetch_page(
                endpoint,
                credential,
                &PageQuery::page(BATCH_LIMIT, offset, filters.clone()),
            )
            .await?;
        let batch = page.data.len() as u64;
        if batch == 0 {
            break;
        }
        records.extend(page.data);
        offset += batch;
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ApiError, Page, SendRequest};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a scripted sequence of page responses and records every
    /// query it sees.
    struct ScriptedApi {
        responses: Mutex<VecDeque<Result<Page>>>,
        seen: Mutex<Vec<PageQuery>>,
    }

    impl ScriptedApi {
        fn new(responses: Vec<Result<Page>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn queries(&self) -> Vec<PageQuery> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProviderApi for ScriptedApi {
        async fn fetch_page(
            &self,
            _endpoint: Endpoint,
            _credential: &Credential,
            query: &PageQuery,
        ) -> Result<Page> {
            self.seen.lock().unwrap().push(query.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Connection("script exhausted".to_string())))
        }

        async fn send_message(&self, _credential: &Credential, _request: &SendRequest) -> Result<()> {
            Err(ApiError::Connection("not a send test".to_string()))
        }
    }

    fn records(from: u64, count: u64) -> Vec<Value> {
        (from..from + count)
            .map(|n| serde_json::json!({ "ID": n }))
            .collect()
    }

    fn page(count: u64, data: Vec<Value>) -> Result<Page> {
        Ok(Page { count, data })
    }

    fn credential() -> Credential {
        Credential::new("key", "secret")
    }

    #[tokio::test]
    async fn fetches_all_pages_in_order() {
        // Server reports 450 records: expect pages at offsets 0, 200, 400.
        let api = ScriptedApi::new(vec![
            page(450, vec![]),
            page(200, records(0, 200)),
            page(200, records(200, 200)),
            page(50, records(400, 50)),
        ]);

        let result = fetch_all(&api, Endpoint::Messages, &credential(), &ListFilters::default())
            .await
            .unwrap();

        assert_eq!(result.len(), 450);
        // Server order is preserved across page boundaries.
        for (index, record) in result.iter().enumerate() {
            assert_eq!(record["ID"], index as u64);
        }

        let queries = api.queries();
        assert_eq!(queries.len(), 4);
        assert!(queries[0].count_only);
        assert_eq!(queries[1].offset, Some(0));
        assert_eq!(queries[2].offset, Some(200));
        assert_eq!(queries[3].offset, Some(400));
    }

    #[tokio::test]
    async fn zero_count_is_empty_not_error() {
        let api = ScriptedApi::new(vec![page(0, vec![])]);

        let result = fetch_all(&api, Endpoint::Messages, &credential(), &ListFilters::default())
            .await
            .unwrap();

        assert!(result.is_empty());
        // Only the probe was issued.
        assert_eq!(api.queries().len(), 1);
    }

    #[tokio::test]
    async fn empty_page_stops_early() {
        // Probe overcounts; an empty page ends the fetch.
        let api = ScriptedApi::new(vec![
            page(400, vec![]),
            page(200, records(0, 200)),
            page(0, vec![]),
        ]);

        let result = fetch_all(&api, Endpoint::Messages, &credential(), &ListFilters::default())
            .await
            .unwrap();
        assert_eq!(result.len(), 200);
    }

    #[tokio::test]
    async fn probe_failure_is_an_error() {
        let api = ScriptedApi::new(vec![Err(ApiError::Status { status: 500 })]);

        let result =
            fetch_all(&api, Endpoint::Messages, &credential(), &ListFilters::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn page_failure_discards_partial_results() {
        let api = ScriptedApi::new(vec![
            page(400, vec![]),
            page(200, records(0, 200)),
            Err(ApiError::Connection("reset".to_string())),
        ]);

        let result =
            fetch_all(&api, Endpoint::Messages, &credential(), &ListFilters::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn filters_reach_probe_and_pages() {
        let filters = ListFilters {
            from_ts: Some(1_000),
            to_ts: Some(2_000),
            show_subject: true,
            show_contact_alt: true,
        };
        let api = ScriptedApi::new(vec![page(1, vec![]), page(1, records(0, 1))]);

        fetch_all(&api, Endpoint::Messages, &credential(), &filters)
            .await
            .unwrap();

        for query in api.queries() {
            assert_eq!(query.filters, filters);
        }
    }
}
