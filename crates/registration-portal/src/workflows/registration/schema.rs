use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{BasicDetails, ConditionalDetails};
use super::validation::{is_iso_date, is_year, ValidationErrors};

/// Shape a conditional field's value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Year,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRequirement {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
}

impl FieldRequirement {
    pub fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
        }
    }

    fn check(&self, value: Option<&str>, errors: &mut ValidationErrors) {
        let value = value.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            errors.add(&self.name, format!("{} is required", self.label));
            return;
        }
        match self.kind {
            FieldKind::Text => {}
            FieldKind::Year if !is_year(value) => {
                errors.add(&self.name, format!("{} must be a 4-digit year", self.label))
            }
            FieldKind::Date if !is_iso_date(value) => {
                errors.add(&self.name, format!("{} must be YYYY-MM-DD", self.label))
            }
            FieldKind::Year | FieldKind::Date => {}
        }
    }
}

/// Registration category → fields step 2 must collect for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalFieldSchema {
    categories: BTreeMap<String, Vec<FieldRequirement>>,
}

impl ConditionalFieldSchema {
    pub fn new(categories: BTreeMap<String, Vec<FieldRequirement>>) -> Self {
        Self { categories }
    }

    pub fn with_category(mut self, category: &str, fields: Vec<FieldRequirement>) -> Self {
        self.categories.insert(category.to_string(), fields);
        self
    }

    pub fn knows(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn requirements(&self, category: &str) -> Option<&[FieldRequirement]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    /// The single validation routine for step 2, whatever the category.
    pub fn validate(
        &self,
        category: &str,
        details: &ConditionalDetails,
    ) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let Some(requirements) = self.requirements(category) else {
            errors.add(
                "registrationCategory",
                format!("Unsupported registration category '{category}'"),
            );
            return Err(errors);
        };

        for key in details.keys() {
            if BasicDetails::FIELD_NAMES.contains(&key.as_str()) {
                errors.add(key.as_str(), "Field belongs to basic details");
            }
        }

        for requirement in requirements {
            requirement.check(details.get(&requirement.name).map(String::as_str), &mut errors);
        }

        errors.into_result()
    }
}

impl Default for ConditionalFieldSchema {
    fn default() -> Self {
        use FieldKind::{Date, Text, Year};

        Self::new(BTreeMap::new())
            .with_category(
                "Regular",
                vec![
                    FieldRequirement::new("qualification", "Qualification", Text),
                    FieldRequirement::new("university", "University", Text),
                    FieldRequirement::new("college_name", "College name", Text),
                    FieldRequirement::new("year_of_passing", "Year of passing", Year),
                ],
            )
            .with_category(
                "Provisional",
                vec![
                    FieldRequirement::new("qualification", "Qualification", Text),
                    FieldRequirement::new("university", "University", Text),
                    FieldRequirement::new("college_name", "College name", Text),
                    FieldRequirement::new("internship_start_date", "Internship start date", Date),
                ],
            )
            .with_category(
                "Additional Qualification",
                vec![
                    FieldRequirement::new(
                        "existing_registration_number",
                        "Existing registration number",
                        Text,
                    ),
                    FieldRequirement::new("qualification", "Qualification", Text),
                    FieldRequirement::new("university", "University", Text),
                    FieldRequirement::new("year_of_passing", "Year of passing", Year),
                ],
            )
    }
}
