use chrono::NaiveDate;

use super::{required, ValidationError};
use crate::models::{parse_date, Area, Crop, CropPayload, HarvestWindow, AREA_UNITS};

/// Raw text of the add/edit crop form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropForm {
    /// Required crop name.
    pub crop_name: String,
    /// Required crop type or season.
    pub crop_type: String,
    /// Positive number.
    pub area_value: String,
    /// One of [`AREA_UNITS`].
    pub area_unit: String,
    /// `YYYY-MM-DD`, required.
    pub sowing_date: String,
    /// `YYYY-MM-DD`, optional.
    pub harvest_start: String,
    /// `YYYY-MM-DD`, optional; not before `harvest_start`.
    pub harvest_end: String,
}

impl Default for CropForm {
    fn default() -> Self {
        Self {
            crop_name: String::new(),
            crop_type: String::new(),
            area_value: String::new(),
            area_unit: AREA_UNITS[0].to_string(),
            sowing_date: String::new(),
            harvest_start: String::new(),
            harvest_end: String::new(),
        }
    }
}

/// Addressable input of [`CropForm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum CropField {
    CropName,
    CropType,
    AreaValue,
    AreaUnit,
    SowingDate,
    HarvestStart,
    HarvestEnd,
}

impl CropField {
    /// Inputs in display order.
    pub const ALL: [CropField; 7] = [
        CropField::CropName,
        CropField::CropType,
        CropField::AreaValue,
        CropField::AreaUnit,
        CropField::SowingDate,
        CropField::HarvestStart,
        CropField::HarvestEnd,
    ];

    /// Caption shown next to the input.
    pub fn label(&self) -> &'static str {
        match self {
            CropField::CropName => "Crop name",
            CropField::CropType => "Crop type",
            CropField::AreaValue => "Area",
            CropField::AreaUnit => "Unit",
            CropField::SowingDate => "Sowing date (YYYY-MM-DD)",
            CropField::HarvestStart => "Harvest from (optional)",
            CropField::HarvestEnd => "Harvest to (optional)",
        }
    }
}

impl CropForm {
    /// Pre-fill the form from an existing record for editing.
    pub fn from_crop(crop: &Crop) -> Self {
        let (area_value, area_unit) = match &crop.area {
            Some(Area::Measured { value, unit }) => (value.to_string(), unit.clone()),
            Some(Area::Text(text)) => split_area_text(text),
            None => (String::new(), AREA_UNITS[0].to_string()),
        };
        let date = |value: Option<NaiveDate>| {
            value
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };
        let window = crop.harvest_window.clone().unwrap_or_default();
        Self {
            crop_name: crop.crop_name.clone(),
            crop_type: crop.crop_type.clone().unwrap_or_default(),
            area_value,
            area_unit,
            sowing_date: date(crop.sowing_date),
            harvest_start: date(window.start),
            harvest_end: date(window.end),
        }
    }

    /// Text of `field`.
    pub fn get(&self, field: CropField) -> &str {
        match field {
            CropField::CropName => &self.crop_name,
            CropField::CropType => &self.crop_type,
            CropField::AreaValue => &self.area_value,
            CropField::AreaUnit => &self.area_unit,
            CropField::SowingDate => &self.sowing_date,
            CropField::HarvestStart => &self.harvest_start,
            CropField::HarvestEnd => &self.harvest_end,
        }
    }

    /// Editable text of `field`.
    pub fn get_mut(&mut self, field: CropField) -> &mut String {
        match field {
            CropField::CropName => &mut self.crop_name,
            CropField::CropType => &mut self.crop_type,
            CropField::AreaValue => &mut self.area_value,
            CropField::AreaUnit => &mut self.area_unit,
            CropField::SowingDate => &mut self.sowing_date,
            CropField::HarvestStart => &mut self.harvest_start,
            CropField::HarvestEnd => &mut self.harvest_end,
        }
    }

    /// Rotate the unit through [`AREA_UNITS`].
    pub fn cycle_unit(&mut self, delta: isize) {
        let len = AREA_UNITS.len() as isize;
        let current = AREA_UNITS
            .iter()
            .position(|unit| unit.eq_ignore_ascii_case(self.area_unit.trim()))
            .unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.area_unit = AREA_UNITS[next].to_string();
    }

    /// Validate and build the request body.
    pub fn payload(&self, farmer_id: Option<String>) -> Result<CropPayload, ValidationError> {
        let crop_name = required("cropName", "Crop name", &self.crop_name)?;
        let crop_type = required("cropType", "Crop type", &self.crop_type)?;

        let value: f64 = self
            .area_value
            .trim()
            .parse()
            .ok()
            .filter(|value: &f64| value.is_finite() && *value > 0.0)
            .ok_or_else(|| ValidationError::new("area", "Area must be a positive number"))?;
        let unit = AREA_UNITS
            .iter()
            .find(|unit| unit.eq_ignore_ascii_case(self.area_unit.trim()))
            .ok_or_else(|| {
                ValidationError::new(
                    "areaUnit",
                    format!("Unit must be one of {}", AREA_UNITS.join(", ")),
                )
            })?;

        let sowing_date = date_field("sowingDate", "Sowing date", &self.sowing_date)?
            .ok_or_else(|| ValidationError::new("sowingDate", "Sowing date is required"))?;
        let start = date_field("harvestStart", "Harvest start", &self.harvest_start)?;
        let end = date_field("harvestEnd", "Harvest end", &self.harvest_end)?;

        if let Some(start) = start {
            if start < sowing_date {
                return Err(ValidationError::new(
                    "harvestStart",
                    "Harvest cannot start before sowing",
                ));
            }
        }
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(ValidationError::new(
                    "harvestEnd",
                    "Harvest end must be after harvest start",
                ));
            }
        }
        let window = HarvestWindow { start, end };

        Ok(CropPayload {
            crop_name,
            crop_type,
            area: Area::Measured {
                value,
                unit: unit.to_string(),
            },
            sowing_date,
            harvest_window: (!window.is_empty()).then_some(window),
            farmer_id,
        })
    }
}

fn date_field(
    field: &'static str,
    label: &str,
    input: &str,
) -> Result<Option<NaiveDate>, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_date(trimmed)
        .map(Some)
        .ok_or_else(|| ValidationError::new(field, format!("{label} must be YYYY-MM-DD")))
}

fn split_area_text(text: &str) -> (String, String) {
    let mut parts = text.split_whitespace();
    let value = parts.next().unwrap_or_default().to_string();
    let unit = parts.collect::<Vec<_>>().join(" ");
    if unit.is_empty() {
        (value, AREA_UNITS[0].to_string())
    } else {
        (value, unit)
    }
}
