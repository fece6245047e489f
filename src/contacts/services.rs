use anyhow::{anyhow, Context};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{CreateContactRequest, ReplyRequest},
    repo::{Contact, ContactFilter, ContactStatus},
};
use crate::{
    auth::services::Identity,
    error::{AppError, AppResult},
    mailer::OutgoingMail,
    resources::{
        find_or_404, paginate,
        validate::{self, Required},
        ListQuery, Page,
    },
    state::AppState,
};

pub const DEFAULT_LIMIT: u32 = 10;

pub async fn list(state: &AppState, query: &ListQuery) -> AppResult<Page<Contact>> {
    let filter = ContactFilter {
        status: validate::enum_filter(query.status.as_deref()),
    };
    Ok(paginate(state.contacts.as_ref(), &filter, query.page_request(DEFAULT_LIMIT)).await?)
}

pub async fn get(state: &AppState, id: Uuid) -> AppResult<Contact> {
    find_or_404(state.contacts.as_ref(), id).await
}

pub async fn create(
    state: &AppState,
    sender: Option<&Identity>,
    req: CreateContactRequest,
) -> AppResult<Contact> {
    Required::new()
        .text("name", &req.name)
        .text("email", &req.email)
        .text("message", &req.message)
        .check()?;
    let email = req.email.unwrap_or_default().trim().to_lowercase();
    if !validate::is_valid_email(&email) {
        return Err(AppError::validation("Please provide a valid email"));
    }
    let website = validate::optional_text(req.website);
    validate::optional_url("website", website.as_deref())?;

    let now = OffsetDateTime::now_utc();
    let contact = state
        .contacts
        .insert(Contact {
            id: Uuid::new_v4(),
            user_id: sender.map(|s| s.id),
            name: req.name.unwrap_or_default().trim().to_string(),
            email,
            subject: validate::optional_text(req.subject),
            message: req.message.unwrap_or_default(),
            phone: validate::optional_text(req.phone),
            company: validate::optional_text(req.company),
            website,
            status: ContactStatus::New,
            read: false,
            created_at: now,
            updated_at: now,
        })
        .await?;
    info!(contact_id = %contact.id, signed_in = sender.is_some(), "contact message received");
    Ok(contact)
}

pub async fn mark_read(state: &AppState, id: Uuid) -> AppResult<Contact> {
    let store = state.contacts.as_ref();
    let mut contact = find_or_404(store, id).await?;
    contact.read = true;
    contact.status = ContactStatus::Read;
    contact.updated_at = OffsetDateTime::now_utc();
    Ok(store.update(contact).await?)
}

fn reply_subject(original: Option<&str>) -> String {
    match original {
        Some(subject) => format!("Re: {subject}"),
        None => "Re: your message".to_string(),
    }
}

/// Emails the sender, then marks the message replied. Nothing changes if the
/// mail cannot be sent.
pub async fn reply(state: &AppState, id: Uuid, req: ReplyRequest) -> AppResult<Contact> {
    Required::new().text("reply", &req.reply).check()?;
    let store = state.contacts.as_ref();
    let mut contact = find_or_404(store, id).await?;

    let mailer = state
        .mailer
        .as_ref()
        .ok_or_else(|| AppError::Internal(anyhow!("outgoing mail is not configured")))?;
    let mail = OutgoingMail {
        to: contact.email.clone(),
        subject: reply_subject(contact.subject.as_deref()),
        body: req.reply.unwrap_or_default(),
    };
    if let Err(e) = mailer.send(mail).await {
        warn!(contact_id = %id, error = %e, "reply not sent");
        return Err(AppError::Internal(anyhow::Error::new(e).context("sending contact reply")));
    }

    contact.status = ContactStatus::Replied;
    contact.read = true;
    contact.updated_at = OffsetDateTime::now_utc();
    let contact = store.update(contact).await.context("recording reply")?;
    info!(contact_id = %id, "contact replied");
    Ok(contact)
}

pub async fn delete(state: &AppState, id: Uuid) -> AppResult<()> {
    let store = state.contacts.as_ref();
    find_or_404(store, id).await?;
    if !store.delete(id).await? {
        return Err(AppError::not_found("Message not found"));
    }
    Ok(())
}
