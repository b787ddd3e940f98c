use super::domain::{
    FormFields, ParticipantMapping, RequesterInputMapping, SigningMethod, SigningMethodKind,
    SigningRequest, PASSWORD_FIELD, UNIQUE_IDENTIFIER_FIELD,
};

/// Role name configured on the signing template for the applicant.
pub const APPLICANT_ROLE: &str = "지원자";
/// Data label carrying the applicant's display name.
pub const APPLICANT_NAME_LABEL: &str = "지원자명";
/// Data label carrying the applicant's email address.
pub const APPLICANT_EMAIL_LABEL: &str = "이메일";

/// Fields that never reach the document as requester inputs.
pub const RESERVED_FIELDS: [&str; 2] = [PASSWORD_FIELD, UNIQUE_IDENTIFIER_FIELD];

pub fn is_reserved(key: &str) -> bool {
    RESERVED_FIELDS.contains(&key)
}

/// Maps submitted fields onto a template signing request. Missing fields become empty
/// strings; there is no failure path.
#[derive(Debug, Clone)]
pub struct SigningRequestBuilder {
    template_id: String,
}

impl SigningRequestBuilder {
    pub fn new(template_id: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
        }
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn build(&self, title: &str, fields: &FormFields) -> SigningRequest {
        SigningRequest {
            template_id: self.template_id.clone(),
            title: title.to_string(),
            participant_mappings: build_participant_mappings(fields),
            requester_input_mappings: build_requester_input_mappings(fields),
        }
    }
}

pub fn build_participant_mappings(fields: &FormFields) -> Vec<ParticipantMapping> {
    vec![ParticipantMapping {
        role: APPLICANT_ROLE.to_string(),
        name: fields
            .get(APPLICANT_NAME_LABEL)
            .unwrap_or_default()
            .to_string(),
        signing_method: SigningMethod {
            kind: SigningMethodKind::Email,
            value: fields
                .get(APPLICANT_EMAIL_LABEL)
                .unwrap_or_default()
                .to_string(),
        },
    }]
}

pub fn build_requester_input_mappings(fields: &FormFields) -> Vec<RequesterInputMapping> {
    fields
        .iter()
        .filter(|field| !is_reserved(&field.key))
        .map(|field| RequesterInputMapping {
            data_label: field.key.clone(),
            value: field.value.clone(),
        })
        .collect()
}
