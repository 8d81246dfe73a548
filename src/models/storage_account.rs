//! ARM storage account
//!
//! ARM resource ids are case-insensitive; the id is declared as an
//! identifier so two payloads differing only in casing compare equal.

use crate::record::{FieldKind, Model, Record, Schema};
use std::sync::OnceLock;

fn storage_account_properties_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::builder("StorageAccountProperties")
            .field("provisioningState", FieldKind::String)
            .field("creationTime", FieldKind::DateTime)
            .field("primaryLocation", FieldKind::String)
            .field("primaryEndpoints", FieldKind::Json)
            .build()
    })
}

/// A storage account linked to a Batch account
#[derive(Debug, Clone, PartialEq)]
pub struct StorageAccount {
    record: Record,
}

impl Model for StorageAccount {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("StorageAccount")
                .field("id", FieldKind::Identifier)
                .field("name", FieldKind::String)
                .field("location", FieldKind::String)
                .field("kind", FieldKind::String)
                .field("properties", FieldKind::Nested(storage_account_properties_schema))
                .build()
        })
    }

    fn from_record(record: Record) -> Self {
        Self { record }
    }

    fn record(&self) -> &Record {
        &self.record
    }
}

impl StorageAccount {
    /// Lowercased resource id
    pub fn id(&self) -> Option<&str> {
        self.record.str("id")
    }

    /// Account name
    pub fn name(&self) -> Option<&str> {
        self.record.str("name")
    }

    /// Resource group parsed from the id
    /// (`/subscriptions/{sub}/resourceGroups/{rg}/...`)
    pub fn resource_group(&self) -> Option<&str> {
        let mut segments = self.id()?.split('/');
        segments.find(|s| *s == "resourcegroups")?;
        segments.next().filter(|s| !s.is_empty())
    }

    /// Blob endpoint
    pub fn blob_endpoint(&self) -> Option<&str> {
        match self.record.record("properties")?.get("primaryEndpoints")? {
            crate::record::FieldValue::Json(endpoints) => endpoints.get("blob")?.as_str(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_differing_in_case_compare_equal() {
        let a = StorageAccount::from_json(&json!({"id": "sub-1/My-Resource-GrOUP/storage-1"}));
        let b = StorageAccount::from_json(&json!({"id": "sub-1/my-resource-group/storage-1"}));
        assert_eq!(a, b);
        assert_eq!(a.id(), Some("sub-1/my-resource-group/storage-1"));
    }

    #[test]
    fn test_resource_group_and_endpoint() {
        let account = StorageAccount::from_json(&json!({
            "id": "/subscriptions/sub-1/resourceGroups/My-RG/providers/Microsoft.Storage/storageAccounts/store",
            "name": "store",
            "properties": {"primaryEndpoints": {"blob": "https://store.blob.core.windows.net/"}}
        }));
        assert_eq!(account.resource_group(), Some("my-rg"));
        assert_eq!(account.blob_endpoint(), Some("https://store.blob.core.windows.net/"));
    }

    #[test]
    fn test_same_input_twice_is_equal() {
        let raw = json!({"id": "sub-1/rg/storage-1", "name": "storage-1", "location": "westus"});
        assert_eq!(StorageAccount::from_json(&raw), StorageAccount::from_json(&raw));
    }
}
