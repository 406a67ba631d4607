use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Wizard steps in the order the applicant walks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WizardStep {
    BasicDetails,
    ConditionalFields,
    Review,
    Payment,
    Submitted,
}

impl WizardStep {
    /// One-based index shown by steppers; `Submitted` sits past the last step.
    pub const fn index(self) -> u8 {
        match self {
            WizardStep::BasicDetails => 1,
            WizardStep::ConditionalFields => 2,
            WizardStep::Review => 3,
            WizardStep::Payment => 4,
            WizardStep::Submitted => 5,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            WizardStep::BasicDetails => "Fill Basic Details",
            WizardStep::ConditionalFields => "Upload Details",
            WizardStep::Review => "Review & Confirm",
            WizardStep::Payment => "Confirm & Pay",
            WizardStep::Submitted => "Submitted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

/// Reservation category captured for council records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocialCategory {
    #[serde(rename = "Open Category")]
    Open,
    #[serde(rename = "Backward Classes")]
    BackwardClasses,
    #[serde(rename = "Scheduled Castes")]
    ScheduledCastes,
    #[serde(rename = "Scheduled Tribes")]
    ScheduledTribes,
}

impl SocialCategory {
    pub const fn label(self) -> &'static str {
        match self {
            SocialCategory::Open => "Open Category",
            SocialCategory::BackwardClasses => "Backward Classes",
            SocialCategory::ScheduledCastes => "Scheduled Castes",
            SocialCategory::ScheduledTribes => "Scheduled Tribes",
        }
    }
}

/// How the registration certificate is delivered; drives the fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RegistrationType {
    #[serde(rename = "Regular (By Post - Fee includes postal charges)")]
    RegularByPost,
    #[serde(rename = "Tatkal (By Hand)")]
    TatkalByHand,
}

impl RegistrationType {
    pub const fn label(self) -> &'static str {
        match self {
            RegistrationType::RegularByPost => "Regular (By Post - Fee includes postal charges)",
            RegistrationType::TatkalByHand => "Tatkal (By Hand)",
        }
    }
}

impl fmt::Display for RegistrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The three documents every application carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttachmentKind {
    Pan,
    Aadhaar,
    Signature,
}

impl AttachmentKind {
    pub const REQUIRED: [AttachmentKind; 3] = [
        AttachmentKind::Pan,
        AttachmentKind::Aadhaar,
        AttachmentKind::Signature,
    ];

    /// Multipart field name expected by the registration endpoint.
    pub const fn field_name(self) -> &'static str {
        match self {
            AttachmentKind::Pan => "pan_upload",
            AttachmentKind::Aadhaar => "aadhaar_upload",
            AttachmentKind::Signature => "sign_upload",
        }
    }

    pub const fn missing_message(self) -> &'static str {
        match self {
            AttachmentKind::Pan => "PAN PDF is required",
            AttachmentKind::Aadhaar => "Aadhaar PDF is required",
            AttachmentKind::Signature => "Signature PDF is required",
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Binary upload held in memory until the final multipart submission.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: mime::Mime,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, content_type: mime::Mime, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(file_name, mime::APPLICATION_PDF, bytes)
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

// Keeps document contents out of logs.
impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type.essence_str())
            .field("size", &self.bytes.len())
            .finish()
    }
}

pub type Attachments = BTreeMap<AttachmentKind, Attachment>;

/// Step-1 form input as the applicant typed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicDetails {
    pub regcategory_id: String,
    pub nationality_id: String,
    #[serde(rename = "f_name")]
    pub first_name: String,
    #[serde(rename = "m_name", default)]
    pub middle_name: Option<String>,
    #[serde(rename = "l_name")]
    pub last_name: String,
    pub gender: Gender,
    pub father_name: String,
    pub mother_name: String,
    pub place: String,
    #[serde(rename = "dob")]
    pub date_of_birth: String,
    pub category: SocialCategory,
    pub email: String,
    pub mobile_number: String,
    #[serde(default)]
    pub telephone_number: Option<String>,
    pub address: String,
    pub pan_number: String,
    pub aadhaar_number: String,
    pub regtype: RegistrationType,
    #[serde(rename = "registrationCategory")]
    pub registration_category: String,
}

impl BasicDetails {
    /// Wire names of every step-1 field; step 2 may not reuse them.
    pub const FIELD_NAMES: [&'static str; 19] = [
        "regcategory_id",
        "nationality_id",
        "f_name",
        "m_name",
        "l_name",
        "gender",
        "father_name",
        "mother_name",
        "place",
        "dob",
        "category",
        "email",
        "mobile_number",
        "telephone_number",
        "address",
        "pan_number",
        "aadhaar_number",
        "regtype",
        "registrationCategory",
    ];

    /// Strip surrounding whitespace from every text field so what is
    /// validated is exactly what gets submitted. Blank optionals become `None`.
    pub fn normalized(self) -> Self {
        fn trim(value: String) -> String {
            let trimmed = value.trim();
            if trimmed.len() == value.len() {
                value
            } else {
                trimmed.to_string()
            }
        }

        Self {
            regcategory_id: trim(self.regcategory_id),
            nationality_id: trim(self.nationality_id),
            first_name: trim(self.first_name),
            middle_name: non_empty(&self.middle_name),
            last_name: trim(self.last_name),
            father_name: trim(self.father_name),
            mother_name: trim(self.mother_name),
            place: trim(self.place),
            date_of_birth: trim(self.date_of_birth),
            email: trim(self.email),
            mobile_number: trim(self.mobile_number),
            telephone_number: non_empty(&self.telephone_number),
            address: trim(self.address),
            pan_number: trim(self.pan_number),
            aadhaar_number: trim(self.aadhaar_number),
            registration_category: trim(self.registration_category),
            ..self
        }
    }

    pub fn applicant_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            "Applicant".to_string()
        } else {
            name.to_string()
        }
    }

    /// Text fields in submission order, skipping empty optionals.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("regcategory_id", self.regcategory_id.clone()),
            ("nationality_id", self.nationality_id.clone()),
            ("f_name", self.first_name.clone()),
        ];
        if let Some(middle) = non_empty(&self.middle_name) {
            fields.push(("m_name", middle));
        }
        fields.extend([
            ("l_name", self.last_name.clone()),
            ("gender", self.gender.label().to_string()),
            ("father_name", self.father_name.clone()),
            ("mother_name", self.mother_name.clone()),
            ("place", self.place.clone()),
            ("dob", self.date_of_birth.clone()),
            ("category", self.category.label().to_string()),
            ("email", self.email.clone()),
            ("mobile_number", self.mobile_number.clone()),
        ]);
        if let Some(telephone) = non_empty(&self.telephone_number) {
            fields.push(("telephone_number", telephone));
        }
        fields.extend([
            ("address", self.address.clone()),
            ("pan_number", self.pan_number.clone()),
            ("aadhaar_number", self.aadhaar_number.clone()),
            ("regtype", self.regtype.label().to_string()),
            ("registrationCategory", self.registration_category.clone()),
        ]);
        fields.retain(|(_, value)| !value.trim().is_empty());
        fields
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|inner| inner.trim())
        .filter(|inner| !inner.is_empty())
        .map(str::to_string)
}

/// Step-2 input: category-specific fields keyed by wire name.
pub type ConditionalDetails = BTreeMap<String, String>;

/// Everything collected so far. Sections stay `None` until their step completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub basic: Option<BasicDetails>,
    pub attachments: Attachments,
    pub conditional: ConditionalDetails,
    pub amount: Option<u32>,
}

impl Draft {
    pub fn registration_category(&self) -> Option<&str> {
        self.basic
            .as_ref()
            .map(|basic| basic.registration_category.as_str())
    }

    pub fn missing_attachments(&self) -> Vec<AttachmentKind> {
        AttachmentKind::REQUIRED
            .into_iter()
            .filter(|kind| !self.attachments.contains_key(kind))
            .collect()
    }
}
