use serde::{Deserialize, Serialize};

use super::{id_string, opt_string};

/// Registered farmer profile as returned by `GET /farmer/:id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Farmer {
    #[serde(alias = "_id", deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, alias = "fullName")]
    pub name: String,
    #[serde(default, alias = "phoneNumber", alias = "mobile", deserialize_with = "opt_string")]
    pub contact: Option<String>,
    #[serde(default, alias = "aadhaarNumber", deserialize_with = "opt_string")]
    pub aadhaar: Option<String>,
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

impl Farmer {
    /// Comma-separated address, skipping empty parts.
    pub fn address_line(&self) -> String {
        let parts: Vec<&str> = [
            self.village.as_deref(),
            self.taluka.as_deref(),
            self.district.as_deref(),
            self.state.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
        let mut line = parts.join(", ");
        if let Some(pincode) = self.pincode.as_deref().filter(|p| !p.is_empty()) {
            if line.is_empty() {
                line = pincode.to_string();
            } else {
                line = format!("{line} - {pincode}");
            }
        }
        line
    }

    /// Aadhaar with all but the last four digits hidden.
    pub fn masked_aadhaar(&self) -> Option<String> {
        let aadhaar = self.aadhaar.as_deref()?.trim();
        let count = aadhaar.chars().count();
        if count <= 4 {
            return Some(aadhaar.to_string());
        }
        let visible: String = aadhaar.chars().skip(count - 4).collect();
        Some(format!("XXXX XXXX {visible}"))
    }
}

/// Body for `POST /farmer/register`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
    pub name: String,
    pub contact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aadhaar_number: Option<String>,
    pub village: String,
    pub taluka: String,
    pub district: String,
    pub state: String,
    pub pincode: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_profile_with_aliases() {
        let farmer: Farmer = serde_json::from_value(json!({
            "_id": "f1",
            "fullName": "Ramesh Patil",
            "phoneNumber": 9876543210u64,
            "aadhaarNumber": "123412341234",
            "village": "Shirur",
            "district": "Pune",
            "state": "Maharashtra",
            "pincode": 412210
        }))
        .unwrap();

        assert_eq!(farmer.name, "Ramesh Patil");
        assert_eq!(farmer.contact.as_deref(), Some("9876543210"));
        assert_eq!(farmer.address_line(), "Shirur, Pune, Maharashtra - 412210");
        assert_eq!(farmer.masked_aadhaar().as_deref(), Some("XXXX XXXX 1234"));
    }

    #[test]
    fn masks_multibyte_aadhaar_by_character() {
        let farmer: Farmer = serde_json::from_value(json!({
            "id": "f2",
            "aadhaarNumber": "१२३४१२३४१२३४"
        }))
        .unwrap();
        assert_eq!(farmer.masked_aadhaar().as_deref(), Some("XXXX XXXX १२३४"));

        let short: Farmer = serde_json::from_value(json!({"id": "f3", "aadhaar": "१२"})).unwrap();
        assert_eq!(short.masked_aadhaar().as_deref(), Some("१२"));
    }
}
