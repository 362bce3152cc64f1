//! Business logic for the UserLongTermMemory entity.

use crate::core::table::Table;
use crate::domain::model::UserLongTermMemory;
use crate::utils::cache::MemoCache;
use crate::utils::error::Result;

pub struct UserLongTermMemoryBO {
    table: Table,
    last: MemoCache<String, UserLongTermMemory>,
}

impl UserLongTermMemoryBO {
    pub fn new(table: Table, last: MemoCache<String, UserLongTermMemory>) -> Self {
        Self { table, last }
    }

    pub fn table_name(&self) -> &str {
        self.table.name()
    }

    /// The user's newest memory record. Memoized.
    pub async fn get_last_memory(&self, user_id: &str) -> Result<Option<UserLongTermMemory>> {
        let table = &self.table;
        self.last
            .get_or_try_insert_with(user_id.to_string(), move || async move {
                let rows = table.get_last_items_by_key("user_id", user_id, 1).await?;
                Ok(rows.first().and_then(UserLongTermMemory::from_record))
            })
            .await
    }

    /// Writes a new record stamped with the current time and makes it the
    /// memoized last memory.
    pub async fn add_memory(&self, user_id: &str, memory: &str) -> Result<UserLongTermMemory> {
        let record = UserLongTermMemory::new(user_id, memory);
        self.table.add(record.to_record()).await?;
        self.last.put(user_id.to_string(), record.clone()).await;
        Ok(record)
    }
}
