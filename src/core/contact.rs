//! Contact form leads from the public site.

use crate::{
    core::profile::{is_valid_email, non_empty},
    entities::{Lead, lead},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Contact form submission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    /// Sender name
    pub name: Option<String>,
    /// Reply address
    pub email: Option<String>,
    /// Message body
    #[serde(default)]
    pub message: String,
}

/// Stores a contact form submission as a lead.
pub async fn submit_lead(db: &DatabaseConnection, form: ContactForm) -> Result<lead::Model> {
    let message = form.message.trim();
    if message.is_empty() {
        return Err(Error::validation("Message cannot be empty"));
    }
    let email = non_empty(form.email).map(|e| e.to_lowercase());
    if let Some(email) = email.as_deref()
        && !is_valid_email(email)
    {
        return Err(Error::validation(format!("Invalid email address: {email}")));
    }

    let model = lead::ActiveModel {
        name: Set(non_empty(form.name)),
        email: Set(email),
        message: Set(message.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = model.insert(db).await?;
    tracing::info!(lead_id = created.id, "Stored contact lead");
    Ok(created)
}

/// All leads, newest first.
pub async fn list_leads(db: &DatabaseConnection) -> Result<Vec<lead::Model>> {
    Lead::find()
        .order_by_desc(lead::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_submit_lead() -> Result<()> {
        let db = setup_test_db().await?;
        let lead = submit_lead(
            &db,
            ContactForm {
                name: Some(" Ravi ".to_string()),
                email: Some("Ravi@Example.com".to_string()),
                message: "Looking for a freight partner".to_string(),
            },
        )
        .await?;
        assert_eq!(lead.name.as_deref(), Some("Ravi"));
        assert_eq!(lead.email.as_deref(), Some("ravi@example.com"));
        assert_eq!(list_leads(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_lead_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let empty = submit_lead(&db, ContactForm::default()).await;
        assert!(matches!(empty, Err(Error::Validation { .. })));

        let bad_email = submit_lead(
            &db,
            ContactForm {
                email: Some("nope".to_string()),
                message: "hi".to_string(),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(bad_email, Err(Error::Validation { .. })));

        // Anonymous messages are accepted
        let anonymous = submit_lead(
            &db,
            ContactForm {
                message: "hi".to_string(),
                ..Default::default()
            },
        )
        .await?;
        assert!(anonymous.email.is_none());
        Ok(())
    }
}
