//! Business logic for the AppBehaviour entity.

use crate::adapters::http::HttpClient;
use crate::core::table::Table;
use crate::utils::cache::MemoCache;
use crate::utils::error::Result;

pub struct AppBehaviourBO {
    table: Table,
    http: HttpClient,
    sources: MemoCache<String, String>,
}

impl AppBehaviourBO {
    pub fn new(table: Table, http: HttpClient, sources: MemoCache<String, String>) -> Self {
        Self {
            table,
            http,
            sources,
        }
    }

    pub fn table_name(&self) -> &str {
        self.table.name()
    }

    /// The application's behaviour text.
    ///
    /// A source starting with `http` is a document location and its body is
    /// returned; any other source is the behaviour itself.
    pub async fn get_behaviour_content(&self, app_id: &str) -> Result<Option<String>> {
        let Some(source) = self.get_behaviour_source(app_id).await? else {
            return Ok(None);
        };

        if source.starts_with("http") {
            return self.http.get_text(&source).await;
        }
        Ok(Some(source))
    }

    /// `behaviour_source` of the application's first row. Memoized.
    pub async fn get_behaviour_source(&self, app_id: &str) -> Result<Option<String>> {
        let table = &self.table;
        self.sources
            .get_or_try_insert_with(app_id.to_string(), move || async move {
                let rows = table.get_by_partition_key("app_id", app_id).await?;
                Ok(rows
                    .first()
                    .and_then(|row| row.get_str("behaviour_source"))
                    .filter(|source| !source.is_empty())
                    .map(str::to_string))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::model::AppBehaviour;
    use crate::domain::topology;
    use httpmock::prelude::*;
    use std::sync::Arc;

    fn bo_with(rows: &[AppBehaviour]) -> (AppBehaviourBO, InMemoryStore) {
        let store = InMemoryStore::new();
        store
            .create_table_from_spec("behaviours", &topology::app_behaviour_table())
            .unwrap();
        for row in rows {
            store.insert("behaviours", row.to_record()).unwrap();
        }
        let table = Table::new("behaviours", Arc::new(store.clone()));
        (
            AppBehaviourBO::new(table, HttpClient::default(), MemoCache::default()),
            store,
        )
    }

    #[tokio::test]
    async fn test_inline_behaviour_is_returned_as_is() {
        let (bo, _) = bo_with(&[AppBehaviour {
            app_id: "app-1".to_string(),
            behaviour_source: "Answer in French.".to_string(),
        }]);

        let content = bo.get_behaviour_content("app-1").await.unwrap();
        assert_eq!(content.as_deref(), Some("Answer in French."));
    }

    #[tokio::test]
    async fn test_url_behaviour_is_fetched() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/behaviour.txt");
            then.status(200).body("Be brief.");
        });
        let (bo, _) = bo_with(&[AppBehaviour {
            app_id: "app-1".to_string(),
            behaviour_source: server.url("/behaviour.txt"),
        }]);

        let content = bo.get_behaviour_content("app-1").await.unwrap();

        mock.assert();
        assert_eq!(content.as_deref(), Some("Be brief."));
    }

    #[tokio::test]
    async fn test_unknown_app_has_no_behaviour() {
        let (bo, _) = bo_with(&[]);
        assert_eq!(bo.get_behaviour_content("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_source_counts_as_missing() {
        let (bo, _) = bo_with(&[AppBehaviour {
            app_id: "app-1".to_string(),
            behaviour_source: String::new(),
        }]);
        assert_eq!(bo.get_behaviour_source("app-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_source_is_memoized() {
        let (bo, store) = bo_with(&[AppBehaviour {
            app_id: "app-1".to_string(),
            behaviour_source: "v1".to_string(),
        }]);
        assert_eq!(bo.get_behaviour_source("app-1").await.unwrap().as_deref(), Some("v1"));

        store
            .insert(
                "behaviours",
                AppBehaviour {
                    app_id: "app-1".to_string(),
                    behaviour_source: "v2".to_string(),
                }
                .to_record(),
            )
            .unwrap();

        assert_eq!(bo.get_behaviour_source("app-1").await.unwrap().as_deref(), Some("v1"));
    }
}
