use serde::Serialize;

/// Field carrying the administrator-assigned identifier used to name the Drive folder.
pub const UNIQUE_IDENTIFIER_FIELD: &str = "uniqueIdentifier";
pub const PASSWORD_FIELD: &str = "password";
pub const FOLDER_NAME_PREFIX: &str = "[지원서] ";

/// Single text field as it arrived in the multipart stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub key: String,
    pub value: String,
}

/// Text fields in arrival order with mapping semantics: a repeated key keeps its
/// original position and takes the latest value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    entries: Vec<FormField>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|field| field.key == key) {
            Some(existing) => existing.value = value,
            None => self.entries.push(FormField { key, value }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|field| field.key == key)
            .map(|field| field.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormField> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn unique_identifier(&self) -> Option<&str> {
        self.get(UNIQUE_IDENTIFIER_FIELD)
    }
}

impl<K, V> FromIterator<(K, V)> for FormFields
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = FormFields::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

/// Uploaded file part, fully buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub field_name: String,
    pub filename: String,
    pub mime_type: String,
    pub encoding: String,
    pub content: Vec<u8>,
}

/// Result of draining a multipart body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestedForm {
    pub fields: FormFields,
    pub files: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub parent_id: String,
}

pub fn folder_name(unique_identifier: &str) -> String {
    format!("{FOLDER_NAME_PREFIX}{unique_identifier}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantMapping {
    pub role: String,
    pub name: String,
    pub signing_method: SigningMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigningMethod {
    #[serde(rename = "type")]
    pub kind: SigningMethodKind,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SigningMethodKind {
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequesterInputMapping {
    pub data_label: String,
    pub value: String,
}

/// Document request sent to the signing service. Serializes to the `document` object
/// of the create-from-template call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningRequest {
    #[serde(skip)]
    pub template_id: String,
    pub title: String,
    pub participant_mappings: Vec<ParticipantMapping>,
    pub requester_input_mappings: Vec<RequesterInputMapping>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigningRequestId(pub String);
