#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::models::{id_string, opt_string, Farmer};

/// Logged-in user persisted between launches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(alias = "_id", alias = "id", deserialize_with = "id_string")]
    pub user_id: String,
    #[serde(default, alias = "fullName")]
    pub name: String,
    #[serde(default, alias = "phoneNumber", alias = "mobile", deserialize_with = "opt_string")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub village: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub taluka: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub district: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub pincode: Option<String>,
}

impl SessionRecord {
    /// Name shown in greetings, falling back to the phone number.
    pub fn display_name(&self) -> String {
        let name = self.name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
        self.contact
            .clone()
            .unwrap_or_else(|| "Farmer".to_string())
    }

    /// Build a session for a freshly registered farmer.
    pub fn from_farmer(farmer: &Farmer, token: Option<String>) -> Self {
        Self {
            user_id: farmer.id.clone(),
            name: farmer.name.clone(),
            contact: farmer.contact.clone(),
            token,
            role: Some("farmer".to_string()),
            village: farmer.village.clone(),
            taluka: farmer.taluka.clone(),
            district: farmer.district.clone(),
            state: farmer.state.clone(),
            pincode: farmer.pincode.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_backend_user_and_round_trips() {
        let record: SessionRecord = serde_json::from_value(json!({
            "_id": "u1",
            "name": "Sita",
            "phoneNumber": "9123456780",
            "role": "farmer",
            "pincode": 560001
        }))
        .unwrap();
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.contact.as_deref(), Some("9123456780"));
        assert_eq!(record.pincode.as_deref(), Some("560001"));

        let encoded = serde_json::to_string(&record).unwrap();
        let decoded: SessionRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn display_name_falls_back_to_contact() {
        let record: SessionRecord =
            serde_json::from_value(json!({"userId": 3, "contact": "9000000000"})).unwrap();
        assert_eq!(record.display_name(), "9000000000");
    }
}
