use std::fmt;

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{id_string, opt_date, opt_string};

/// Units offered by the crop form.
pub const AREA_UNITS: [&str; 4] = ["acres", "hectares", "bigha", "guntha"];

/// Cultivated area. Older records carry a free-form string, newer ones a
/// value/unit pair; both render the same way.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Area {
    Measured { value: f64, unit: String },
    Text(String),
}

impl<'de> Deserialize<'de> for Area {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let unit_of = |object: &serde_json::Map<String, Value>| {
            object
                .get("unit")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        match Value::deserialize(deserializer)? {
            Value::String(text) => Ok(Area::Text(text)),
            Value::Number(number) => Ok(Area::Text(number.to_string())),
            Value::Object(object) => {
                let unit = unit_of(&object);
                match object.get("value") {
                    Some(Value::Number(number)) => match number.as_f64() {
                        Some(value) => Ok(Area::Measured { value, unit }),
                        None => Ok(Area::Text(format!("{number} {unit}"))),
                    },
                    Some(Value::String(raw)) => match raw.trim().parse::<f64>() {
                        Ok(value) if value.is_finite() => Ok(Area::Measured { value, unit }),
                        _ => Ok(Area::Text(format!("{raw} {unit}"))),
                    },
                    _ => Err(de::Error::custom("area object without a value")),
                }
            }
            other => Err(de::Error::custom(format!(
                "expected area text or value/unit object, got {other}"
            ))),
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Area::Measured { value, unit } => {
                let unit = unit.trim();
                if unit.is_empty() {
                    write!(f, "{}", format_quantity(*value))
                } else {
                    write!(f, "{} {}", format_quantity(*value), unit)
                }
            }
            Area::Text(text) => {
                let words: Vec<&str> = text.split_whitespace().collect();
                write!(f, "{}", words.join(" "))
            }
        }
    }
}

fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let rendered = format!("{value:.2}");
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// Verification state assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CropStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

impl CropStatus {
    /// Lenient parse; anything unrecognised is treated as pending review.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "verified" | "approved" => CropStatus::Verified,
            "rejected" => CropStatus::Rejected,
            _ => CropStatus::Pending,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CropStatus::Pending => "Pending",
            CropStatus::Verified => "Verified",
            CropStatus::Rejected => "Rejected",
        }
    }
}

impl<'de> Deserialize<'de> for CropStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(CropStatus::parse).unwrap_or_default())
    }
}

/// Expected harvest period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarvestWindow {
    #[serde(default, deserialize_with = "opt_date")]
    pub start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "opt_date")]
    pub end: Option<NaiveDate>,
}

impl HarvestWindow {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// A planting entry belonging to a farmer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crop {
    #[serde(alias = "_id", deserialize_with = "id_string")]
    pub id: String,
    pub crop_name: String,
    #[serde(default, deserialize_with = "opt_string")]
    pub crop_type: Option<String>,
    #[serde(default)]
    pub area: Option<Area>,
    #[serde(default, deserialize_with = "opt_date")]
    pub sowing_date: Option<NaiveDate>,
    #[serde(default, alias = "harvestPeriod")]
    pub harvest_window: Option<HarvestWindow>,
    #[serde(default)]
    pub status: CropStatus,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub farmer_id: Option<String>,
}

impl Crop {
    pub fn area_label(&self) -> String {
        self.area
            .as_ref()
            .map(|area| area.to_string())
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| "Not specified".to_string())
    }

    pub fn sowing_label(&self) -> String {
        self.sowing_date
            .map(|date| date.format("%d %b %Y").to_string())
            .unwrap_or_else(|| "Not set".to_string())
    }

    pub fn harvest_label(&self) -> String {
        let Some(window) = self.harvest_window.as_ref().filter(|w| !w.is_empty()) else {
            return "Not set".to_string();
        };
        let fmt = |date: Option<NaiveDate>| {
            date.map(|d| d.format("%d %b %Y").to_string())
                .unwrap_or_else(|| "?".to_string())
        };
        format!("{} – {}", fmt(window.start), fmt(window.end))
    }

    /// One-line label used by list rows.
    pub fn display_name(&self) -> String {
        match self.crop_type.as_deref() {
            Some(kind) if !kind.trim().is_empty() => format!("{} · {}", self.crop_name, kind),
            _ => self.crop_name.clone(),
        }
    }
}

/// Body sent when creating or editing a crop.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CropPayload {
    pub crop_name: String,
    pub crop_type: String,
    pub area: Area,
    pub sowing_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harvest_window: Option<HarvestWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farmer_id: Option<String>,
}

/// Per-status tallies shown on the home screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CropSummary {
    pub total: usize,
    pub pending: usize,
    pub verified: usize,
    pub rejected: usize,
}

impl CropSummary {
    pub fn from_crops(crops: &[Crop]) -> Self {
        crops.iter().fold(Self::default(), |mut summary, crop| {
            summary.total += 1;
            match crop.status {
                CropStatus::Pending => summary.pending += 1,
                CropStatus::Verified => summary.verified += 1,
                CropStatus::Rejected => summary.rejected += 1,
            }
            summary
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn measured_and_text_areas_render_identically() {
        let measured: Area = serde_json::from_value(json!({"value": 10, "unit": "acres"})).unwrap();
        let text: Area = serde_json::from_value(json!("10 acres")).unwrap();
        assert_eq!(measured.to_string(), "10 acres");
        assert_eq!(text.to_string(), "10 acres");

        let fractional = Area::Measured {
            value: 2.5,
            unit: "hectares".to_string(),
        };
        assert_eq!(fractional.to_string(), "2.5 hectares");
        assert_eq!(Area::Text("  4   bigha ".to_string()).to_string(), "4 bigha");
    }

    #[test]
    fn crop_list_tolerates_mixed_area_shapes() {
        let crops: Vec<Crop> = serde_json::from_value(json!([
            {"_id": "a", "cropName": "Wheat", "area": {"value": 10, "unit": "acres"}},
            {"_id": "b", "cropName": "Rice", "area": {"value": "10", "unit": "acres"}},
            {"_id": "c", "cropName": "Jowar", "area": "10 acres"},
            {"_id": "d", "cropName": "Bajra", "area": {"value": 3}},
            {"_id": "e", "cropName": "Cotton", "area": {"value": "about 2", "unit": "bigha"}}
        ]))
        .unwrap();

        let labels: Vec<String> = crops.iter().map(Crop::area_label).collect();
        assert_eq!(labels, ["10 acres", "10 acres", "10 acres", "3", "about 2 bigha"]);
        assert_eq!(
            crops[1].area,
            Some(Area::Measured {
                value: 10.0,
                unit: "acres".to_string()
            })
        );
    }

    #[test]
    fn decodes_backend_crop_shape() {
        let crop: Crop = serde_json::from_value(json!({
            "_id": "c1",
            "cropName": "Wheat",
            "cropType": "Rabi",
            "area": {"value": 3, "unit": "acres"},
            "sowingDate": "2024-11-05T00:00:00.000Z",
            "harvestWindow": {"start": "2025-03-01", "end": "2025-03-20"},
            "status": "VERIFIED",
            "images": ["crops/wheat.jpg"],
            "farmerId": 42
        }))
        .unwrap();

        assert_eq!(crop.id, "c1");
        assert_eq!(crop.status, CropStatus::Verified);
        assert_eq!(crop.farmer_id.as_deref(), Some("42"));
        assert_eq!(crop.area_label(), "3 acres");
        assert_eq!(crop.sowing_label(), "05 Nov 2024");
        assert_eq!(crop.harvest_label(), "01 Mar 2025 – 20 Mar 2025");
        assert_eq!(crop.display_name(), "Wheat · Rabi");
    }

    #[test]
    fn missing_optional_fields_fall_back() {
        let crop: Crop = serde_json::from_value(json!({"id": 7, "cropName": "Rice"})).unwrap();
        assert_eq!(crop.id, "7");
        assert_eq!(crop.status, CropStatus::Pending);
        assert_eq!(crop.area_label(), "Not specified");
        assert_eq!(crop.harvest_label(), "Not set");
        assert!(crop.images.is_empty());
    }

    #[test]
    fn summary_counts_statuses() {
        let crop = |status| Crop {
            id: "x".to_string(),
            crop_name: "Cotton".to_string(),
            crop_type: None,
            area: None,
            sowing_date: None,
            harvest_window: None,
            status,
            images: Vec::new(),
            farmer_id: None,
        };
        let crops = vec![
            crop(CropStatus::Pending),
            crop(CropStatus::Verified),
            crop(CropStatus::Verified),
            crop(CropStatus::Rejected),
        ];
        let summary = CropSummary::from_crops(&crops);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.verified, 2);
        assert_eq!(CropSummary::from_crops(&[]), CropSummary::default());
    }
}
