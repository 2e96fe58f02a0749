//! Contact form submission.

use tracing::{debug, info};

use super::validation::{validate_contact, ContactInput, ValidContact};
use super::{Rejection, SubmitOutcome, WritePath};
use crate::mailer::OutgoingEmail;
use crate::monitoring::ReportContext;
use crate::rate_limit::Category;

pub struct ContactService {
    write: WritePath,
}

impl ContactService {
    pub fn new(write: WritePath) -> Self {
        Self { write }
    }

    /// Validate, admit, and forward a contact message to the site inbox.
    pub async fn submit(&self, input: &ContactInput, identity: &str) -> SubmitOutcome<()> {
        let contact = match validate_contact(input) {
            Ok(contact) => contact,
            Err(errors) => {
                debug!(fields = errors.len(), "Contact form rejected");
                return SubmitOutcome::Rejected(Rejection::Invalid(errors));
            }
        };

        if let Err(rejection) = self.write.admit(identity, Category::Contact) {
            info!(identity, "Contact form rate limited");
            return SubmitOutcome::Rejected(rejection);
        }

        let email = self.compose(&contact);
        let mailer = self.write.mailer.as_ref();
        let context = ReportContext::new("contact.send").tag("form", "contact");

        match self.write.perform(context, || mailer.send(&email)).await {
            Ok(()) => {
                info!(from = %contact.email, "Contact message delivered");
                SubmitOutcome::Success(())
            }
            Err(classified) => SubmitOutcome::Failed(classified),
        }
    }

    fn compose(&self, contact: &ValidContact) -> OutgoingEmail {
        let subject = match &contact.subject {
            Some(subject) => format!("[{}] {}", self.write.site.name, subject),
            None => format!("[{}] New message from {}", self.write.site.name, contact.name),
        };

        let mut text = format!("Name: {}\nEmail: {}\n", contact.name, contact.email);
        if let Some(phone) = &contact.phone {
            text.push_str(&format!("Phone: {}\n", phone));
        }
        text.push('\n');
        text.push_str(&contact.message);
        text.push('\n');

        OutgoingEmail {
            to: self.write.site.contact_recipient.clone(),
            reply_to: Some(contact.email.clone()),
            subject,
            text,
        }
    }
}
