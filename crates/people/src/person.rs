use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rollcall_core::{DomainError, DomainResult, PersonId};

/// A person in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub phone: String,
    /// Business key (e.g. national id). Unique across people.
    pub document: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Person {
    pub fn register(new: NewPerson, now: DateTime<Utc>) -> Self {
        Self {
            id: PersonId::new(),
            name: new.name,
            phone: new.phone,
            document: new.document,
            created_at: now,
            updated_at: now,
        }
    }

    /// The requested document when it differs from the current one.
    pub fn document_change<'a>(&self, patch: &'a PersonPatch) -> Option<&'a str> {
        patch
            .document
            .as_deref()
            .filter(|document| *document != self.document)
    }

    pub fn apply(&mut self, patch: PersonPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(document) = patch.document {
            self.document = document;
        }
        self.updated_at = now;
    }
}

/// Validated input for registering a person. All fields are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub name: String,
    pub phone: String,
    pub document: String,
}

impl NewPerson {
    pub fn validate(
        name: Option<String>,
        phone: Option<String>,
        document: Option<String>,
    ) -> DomainResult<Self> {
        Ok(Self {
            name: required("name", name)?,
            phone: required("phone", phone)?,
            document: required("document", document)?,
        })
    }
}

fn required(field: &str, value: Option<String>) -> DomainResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DomainError::validation(format!("{field} is required"))),
    }
}

/// A single field-level validation failure, shaped for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub value: Option<String>,
}

impl ValidationIssue {
    pub fn not_empty(path: &str, value: &str) -> Self {
        Self {
            message: format!("Validation notEmpty on {path} failed"),
            kind: "Validation error".to_string(),
            path: path.to_string(),
            value: Some(value.to_string()),
        }
    }

    /// The request body itself could not be read as a change request.
    pub fn malformed_body() -> Self {
        Self {
            message: "Validation failed. Malformed request body".to_string(),
            kind: "Validation error".to_string(),
            path: "body".to_string(),
            value: None,
        }
    }

    pub fn unique(path: &str, value: &str) -> Self {
        Self {
            message: format!("{path} must be unique"),
            kind: "unique violation".to_string(),
            path: path.to_string(),
            value: Some(value.to_string()),
        }
    }
}

/// Raw partial update as received from a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonChangeRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
}

/// Validated partial update. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
}

impl PersonPatch {
    /// Fields are checked in declaration order; only the first issue is reported.
    pub fn validate(req: PersonChangeRequest) -> Result<Self, ValidationIssue> {
        Ok(Self {
            name: non_empty("name", req.name)?,
            phone: non_empty("phone", req.phone)?,
            document: non_empty("document", req.document)?,
        })
    }
}

fn non_empty(path: &str, value: Option<String>) -> Result<Option<String>, ValidationIssue> {
    match value {
        None => Ok(None),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                Err(ValidationIssue::not_empty(path, &raw))
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
    }
}
