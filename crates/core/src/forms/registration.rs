use super::{required, validate_aadhaar, validate_mobile, validate_pincode, ValidationError};
use crate::models::RegistrationPayload;

/// Raw text of every registration input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    /// Full name.
    pub name: String,
    /// Ten-digit mobile number.
    pub contact: String,
    /// Optional Aadhaar number; spaces are allowed.
    pub aadhaar: String,
    /// Village.
    pub village: String,
    /// Taluka.
    pub taluka: String,
    /// District.
    pub district: String,
    /// State.
    pub state: String,
    /// Six-digit pincode.
    pub pincode: String,
}

/// Addressable input of [`RegistrationForm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RegistrationField {
    Name,
    Contact,
    Aadhaar,
    Village,
    Taluka,
    District,
    State,
    Pincode,
}

impl RegistrationField {
    /// Caption shown next to the input.
    pub fn label(&self) -> &'static str {
        match self {
            RegistrationField::Name => "Full name",
            RegistrationField::Contact => "Mobile number",
            RegistrationField::Aadhaar => "Aadhaar (optional)",
            RegistrationField::Village => "Village",
            RegistrationField::Taluka => "Taluka",
            RegistrationField::District => "District",
            RegistrationField::State => "State",
            RegistrationField::Pincode => "Pincode",
        }
    }
}

impl RegistrationForm {
    /// Form pre-filled with the number entered on the login screen.
    pub fn with_contact(contact: impl Into<String>) -> Self {
        Self {
            contact: contact.into(),
            ..Self::default()
        }
    }

    /// Text of `field`.
    pub fn get(&self, field: RegistrationField) -> &str {
        match field {
            RegistrationField::Name => &self.name,
            RegistrationField::Contact => &self.contact,
            RegistrationField::Aadhaar => &self.aadhaar,
            RegistrationField::Village => &self.village,
            RegistrationField::Taluka => &self.taluka,
            RegistrationField::District => &self.district,
            RegistrationField::State => &self.state,
            RegistrationField::Pincode => &self.pincode,
        }
    }

    /// Editable text of `field`.
    pub fn get_mut(&mut self, field: RegistrationField) -> &mut String {
        match field {
            RegistrationField::Name => &mut self.name,
            RegistrationField::Contact => &mut self.contact,
            RegistrationField::Aadhaar => &mut self.aadhaar,
            RegistrationField::Village => &mut self.village,
            RegistrationField::Taluka => &mut self.taluka,
            RegistrationField::District => &mut self.district,
            RegistrationField::State => &mut self.state,
            RegistrationField::Pincode => &mut self.pincode,
        }
    }

    fn validate_personal(&self) -> Result<(), ValidationError> {
        required("name", "Name", &self.name)?;
        validate_mobile(&self.contact)?;
        validate_aadhaar(&self.aadhaar)?;
        Ok(())
    }

    fn validate_address(&self) -> Result<(), ValidationError> {
        required("village", "Village", &self.village)?;
        required("taluka", "Taluka", &self.taluka)?;
        required("district", "District", &self.district)?;
        required("state", "State", &self.state)?;
        validate_pincode(&self.pincode)?;
        Ok(())
    }

    /// Validate every step and build the request body.
    pub fn payload(&self) -> Result<RegistrationPayload, ValidationError> {
        self.validate_personal()?;
        self.validate_address()?;
        Ok(RegistrationPayload {
            name: required("name", "Name", &self.name)?,
            contact: validate_mobile(&self.contact)?,
            aadhaar_number: validate_aadhaar(&self.aadhaar)?,
            village: self.village.trim().to_string(),
            taluka: self.taluka.trim().to_string(),
            district: self.district.trim().to_string(),
            state: self.state.trim().to_string(),
            pincode: validate_pincode(&self.pincode)?,
        })
    }
}

/// Wizard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    /// Name, number and Aadhaar.
    Personal,
    /// Village through pincode.
    Address,
    /// Read-only summary before submitting.
    Review,
}

impl RegistrationStep {
    /// Page heading.
    pub fn title(&self) -> &'static str {
        match self {
            RegistrationStep::Personal => "Personal details",
            RegistrationStep::Address => "Address",
            RegistrationStep::Review => "Review",
        }
    }

    /// One-based page number.
    pub fn number(&self) -> usize {
        match self {
            RegistrationStep::Personal => 1,
            RegistrationStep::Address => 2,
            RegistrationStep::Review => 3,
        }
    }

    /// Inputs edited on this page; the review page has none.
    pub fn fields(&self) -> &'static [RegistrationField] {
        match self {
            RegistrationStep::Personal => &[
                RegistrationField::Name,
                RegistrationField::Contact,
                RegistrationField::Aadhaar,
            ],
            RegistrationStep::Address => &[
                RegistrationField::Village,
                RegistrationField::Taluka,
                RegistrationField::District,
                RegistrationField::State,
                RegistrationField::Pincode,
            ],
            RegistrationStep::Review => &[],
        }
    }
}

/// Three-page registration form; each page is validated before moving on.
#[derive(Debug, Clone)]
pub struct RegistrationWizard {
    step: RegistrationStep,
    /// Inputs across all pages.
    pub form: RegistrationForm,
}

impl RegistrationWizard {
    /// Start on the first page.
    pub fn new(form: RegistrationForm) -> Self {
        Self {
            step: RegistrationStep::Personal,
            form,
        }
    }

    /// Page currently shown.
    pub fn step(&self) -> RegistrationStep {
        self.step
    }

    /// Validate the current page and advance. Returns the new step.
    pub fn next(&mut self) -> Result<RegistrationStep, ValidationError> {
        self.step = match self.step {
            RegistrationStep::Personal => {
                self.form.validate_personal()?;
                RegistrationStep::Address
            }
            RegistrationStep::Address => {
                self.form.validate_address()?;
                RegistrationStep::Review
            }
            RegistrationStep::Review => RegistrationStep::Review,
        };
        Ok(self.step)
    }

    /// Go back one page. Returns `false` on the first page.
    pub fn back(&mut self) -> bool {
        match self.step {
            RegistrationStep::Personal => false,
            RegistrationStep::Address => {
                self.step = RegistrationStep::Personal;
                true
            }
            RegistrationStep::Review => {
                self.step = RegistrationStep::Address;
                true
            }
        }
    }

    /// Final submission; only allowed from the review page.
    pub fn submit(&self) -> Result<RegistrationPayload, ValidationError> {
        if self.step != RegistrationStep::Review {
            return Err(ValidationError::new(
                "step",
                "Complete every step before submitting",
            ));
        }
        self.form.payload()
    }
}
