use super::domain::{Attachment, AttachmentKind, Draft};
use crate::gateway::VerifiedPayment;

/// Final multipart body for the registration endpoint.
///
/// Assembled once from the draft and the verified payment; there are no
/// mutating methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    fields: Vec<(String, String)>,
    attachments: Vec<(AttachmentKind, Attachment)>,
}

impl SubmissionPayload {
    /// Fails with the attachments that are no longer in the draft.
    pub fn assemble(
        draft: &Draft,
        payment: &VerifiedPayment,
    ) -> Result<Self, Vec<AttachmentKind>> {
        let missing = draft.missing_attachments();
        if !missing.is_empty() {
            return Err(missing);
        }

        let mut fields: Vec<(String, String)> = Vec::new();
        if let Some(basic) = &draft.basic {
            fields.extend(
                basic
                    .form_fields()
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value)),
            );
        }
        fields.extend(
            draft
                .conditional
                .iter()
                .filter(|(_, value)| !value.trim().is_empty())
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        if let Some(amount) = draft.amount {
            fields.push(("amount".to_string(), amount.to_string()));
        }
        fields.push(("payment_id".to_string(), payment.payment_id.clone()));
        fields.push(("order_id".to_string(), payment.order_id.clone()));
        fields.push(("payment_status".to_string(), "completed".to_string()));

        let attachments = AttachmentKind::REQUIRED
            .into_iter()
            .filter_map(|kind| {
                draft
                    .attachments
                    .get(&kind)
                    .map(|attachment| (kind, attachment.clone()))
            })
            .collect();

        Ok(Self {
            fields,
            attachments,
        })
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attachments(&self) -> &[(AttachmentKind, Attachment)] {
        &self.attachments
    }

    pub fn total_bytes(&self) -> usize {
        self.attachments
            .iter()
            .map(|(_, attachment)| attachment.size())
            .sum()
    }
}
