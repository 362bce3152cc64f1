//! Business logic for the AppRole entity.

use crate::adapters::http::HttpClient;
use crate::core::table::Table;
use crate::utils::cache::MemoCache;
use crate::utils::error::Result;
use crate::utils::validation::validate_url;

pub struct AppRoleBO {
    table: Table,
    http: HttpClient,
    sources: MemoCache<String, String>,
}

impl AppRoleBO {
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

    /// Content of the document the role source points at.
    pub async fn get_role_content(&self, app_id: &str) -> Result<Option<String>> {
        let Some(source) = self.get_role_source(app_id).await? else {
            return Ok(None);
        };

        validate_url("role_source", &source)?;
        self.http.get_text(&source).await
    }

    pub async fn get_role_source(&self, app_id: &str) -> Result<Option<String>> {
        let table = &self.table;
        self.sources
            .get_or_try_insert_with(app_id.to_string(), move || async move {
                let rows = table.get_by_partition_key("app_id", app_id).await?;
                Ok(rows
                    .first()
                    .and_then(|row| row.get_str("role_source"))
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
    use crate::domain::model::AppRole;
    use crate::domain::topology;
    use crate::utils::error::KnowledgeError;
    use httpmock::prelude::*;
    use std::sync::Arc;

    fn bo_with(role_source: Option<String>) -> AppRoleBO {
        let store = InMemoryStore::new();
        store
            .create_table_from_spec("roles", &topology::app_role_table())
            .unwrap();
        if let Some(role_source) = role_source {
            store
                .insert(
                    "roles",
                    AppRole {
                        app_id: "app-1".to_string(),
                        role_source,
                    }
                    .to_record(),
                )
                .unwrap();
        }
        let table = Table::new("roles", Arc::new(store));
        AppRoleBO::new(table, HttpClient::default(), MemoCache::default())
    }

    #[tokio::test]
    async fn test_role_content_is_fetched_once_per_call() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/roles/tutor.md");
            then.status(200).body("You are a patient maths tutor.");
        });
        let bo = bo_with(Some(server.url("/roles/tutor.md")));

        let first = bo.get_role_content("app-1").await.unwrap();
        let second = bo.get_role_content("app-1").await.unwrap();

        assert_eq!(first.as_deref(), Some("You are a patient maths tutor."));
        assert_eq!(first, second);
        // The source row is memoized, the document is not.
        mock.assert_hits(2);
    }

    #[tokio::test]
    async fn test_missing_role() {
        let bo = bo_with(None);
        assert_eq!(bo.get_role_content("app-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_role_source_must_be_a_url() {
        let bo = bo_with(Some("inline role".to_string()));
        let err = bo.get_role_content("app-1").await.unwrap_err();

        assert!(matches!(
            err,
            KnowledgeError::InvalidConfigValueError { field, .. } if field == "role_source"
        ));
    }
}
