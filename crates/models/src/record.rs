use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::server_list::ServerListState;

pub type AppId = u32;
pub type PackageId = u32;

/// Ordered app -> packages mapping, the shape written to disk.
pub type AppPackages = BTreeMap<AppId, BTreeSet<PackageId>>;

/// Full persisted snapshot of the global database.
///
/// Every field is mandatory: a file lacking any of them (or holding `null`)
/// fails to decode rather than producing a partial record. Field names match
/// the established on-disk layout so existing files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseRecord {
    #[serde(rename = "AppIDsToPackageIDs")]
    pub app_ids_to_package_ids: AppPackages,
    #[serde(rename = "Guid")]
    pub guid: Uuid,
    #[serde(rename = "ServerListProvider")]
    pub server_list: ServerListState,
    #[serde(rename = "_CellID")]
    pub cell_id: u32,
}

impl DatabaseRecord {
    /// Empty record with a newly generated GUID and no cell.
    pub fn fresh() -> Self {
        Self {
            app_ids_to_package_ids: AppPackages::new(),
            guid: Uuid::new_v4(),
            server_list: ServerListState::default(),
            cell_id: 0,
        }
    }

    pub fn to_json_pretty(&self) -> Result<Vec<u8>, ModelError> {
        serde_json::to_vec_pretty(self).map_err(ModelError::Encode)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(ModelError::Validation("database file is empty".into()));
        }
        serde_json::from_slice(bytes).map_err(ModelError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_list::ServerRecord;

    const SAMPLE: &str = r#"{
        "AppIDsToPackageIDs": { "440": [2, 1], "730": [7] },
        "Guid": "4d3f0b62-8c1e-4a5e-9a77-0c1f6d2b9e10",
        "ServerListProvider": { "Servers": [ { "endpoint": "cm0.example:27017", "protocol": 1 } ] },
        "_CellID": 3
    }"#;

    #[test]
    fn decodes_string_keys_into_app_ids() -> Result<(), anyhow::Error> {
        let record = DatabaseRecord::from_slice(SAMPLE.as_bytes())?;
        assert_eq!(record.cell_id, 3);
        assert_eq!(record.app_ids_to_package_ids[&440], BTreeSet::from([1, 2]));
        assert_eq!(record.app_ids_to_package_ids[&730], BTreeSet::from([7]));
        assert_eq!(record.server_list.servers, vec![ServerRecord::new("cm0.example:27017", 1)]);
        Ok(())
    }

    #[test]
    fn each_field_is_required() {
        for field in ["AppIDsToPackageIDs", "Guid", "ServerListProvider", "_CellID"] {
            let mut value: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
            value.as_object_mut().unwrap().remove(field);
            let bytes = serde_json::to_vec(&value).unwrap();
            assert!(
                matches!(DatabaseRecord::from_slice(&bytes), Err(ModelError::Decode(_))),
                "record without {field} must not decode"
            );
        }
    }

    #[test]
    fn null_fields_are_rejected() {
        let mut value: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        value["AppIDsToPackageIDs"] = serde_json::Value::Null;
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(DatabaseRecord::from_slice(&bytes).is_err());
    }

    #[test]
    fn blank_input_is_a_validation_error() {
        assert!(matches!(DatabaseRecord::from_slice(b"  \n"), Err(ModelError::Validation(_))));
    }

    #[test]
    fn encoding_is_ordered_and_keeps_layout() -> Result<(), anyhow::Error> {
        let mut record = DatabaseRecord::fresh();
        record.app_ids_to_package_ids.insert(20, BTreeSet::from([9, 3]));
        record.app_ids_to_package_ids.insert(10, BTreeSet::from([5]));

        let text = String::from_utf8(record.to_json_pretty()?)?;
        assert!(text.find("\"10\"").unwrap() < text.find("\"20\"").unwrap());
        assert!(text.contains("\"_CellID\": 0"));
        assert_eq!(DatabaseRecord::from_slice(text.as_bytes())?, record);
        Ok(())
    }
}
