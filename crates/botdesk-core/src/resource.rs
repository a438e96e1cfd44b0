// ── Resource and service seams ──
//
// `EntityQueries` is written once against these two traits. `Resource`
// knows how a record is addressed and how to fake one locally from a
// create or update payload; `ResourceService` is the remote half.

use std::future::Future;

use botdesk_api::{ApiClient, Bot, CreateBot, EntityId, ListParams, Page, UpdateBot};
use chrono::{DateTime, Utc};

use crate::error::CoreError;

/// A cacheable entity with optimistic create/update support.
pub trait Resource: Clone + Send + Sync + 'static {
    type Create: Send + Sync;
    type Update: Send + Sync;

    /// Cache namespace, e.g. `"bots"`.
    const KIND: &'static str;

    /// Singular display name used in notifications.
    const LABEL: &'static str;

    fn id(&self) -> &EntityId;

    /// Human-readable name used in notifications.
    fn title(&self) -> &str;

    fn validate_create(input: &Self::Create) -> Result<(), CoreError>;

    fn validate_update(input: &Self::Update) -> Result<(), CoreError>;

    /// Synthetic record shown while a create is in flight.
    fn draft(input: &Self::Create, id: EntityId, now: DateTime<Utc>) -> Self;

    /// This record with `input` applied locally.
    fn patched(&self, input: &Self::Update, now: DateTime<Utc>) -> Self;
}

/// Remote CRUD operations for one resource kind.
pub trait ResourceService<R: Resource>: Send + Sync + 'static {
    fn list(&self, params: &ListParams)
    -> impl Future<Output = Result<Page<R>, CoreError>> + Send;

    fn get(&self, id: &EntityId) -> impl Future<Output = Result<R, CoreError>> + Send;

    fn create(&self, input: &R::Create) -> impl Future<Output = Result<R, CoreError>> + Send;

    fn update(
        &self,
        id: &EntityId,
        input: &R::Update,
    ) -> impl Future<Output = Result<R, CoreError>> + Send;

    fn delete(&self, id: &EntityId) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Returns how many records the backend removed.
    fn bulk_delete(&self, ids: &[EntityId])
    -> impl Future<Output = Result<u64, CoreError>> + Send;
}

// ── Bot ──────────────────────────────────────────────────────────────

pub const BOT_NAME_MAX: usize = 100;
pub const BOT_DESCRIPTION_MAX: usize = 500;

fn validate_name(name: &str) -> Result<(), CoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::invalid("Bot name is required"));
    }
    if name.chars().count() > BOT_NAME_MAX {
        return Err(CoreError::invalid(format!(
            "Bot name must be at most {BOT_NAME_MAX} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), CoreError> {
    match description {
        Some(d) if d.chars().count() > BOT_DESCRIPTION_MAX => Err(CoreError::invalid(format!(
            "Bot description must be at most {BOT_DESCRIPTION_MAX} characters"
        ))),
        _ => Ok(()),
    }
}

impl Resource for Bot {
    type Create = CreateBot;
    type Update = UpdateBot;

    const KIND: &'static str = "bots";
    const LABEL: &'static str = "Bot";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn validate_create(input: &CreateBot) -> Result<(), CoreError> {
        validate_name(&input.name)?;
        validate_description(input.description.as_deref())
    }

    fn validate_update(input: &UpdateBot) -> Result<(), CoreError> {
        if input.is_empty() {
            return Err(CoreError::invalid("Nothing to update"));
        }
        if let Some(ref name) = input.name {
            validate_name(name)?;
        }
        validate_description(input.description.as_deref())
    }

    fn draft(input: &CreateBot, id: EntityId, now: DateTime<Utc>) -> Self {
        Bot {
            id,
            name: input.name.trim().to_owned(),
            description: input.description.clone(),
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    fn patched(&self, input: &UpdateBot, now: DateTime<Utc>) -> Self {
        let mut bot = self.clone();
        if let Some(ref name) = input.name {
            bot.name = name.trim().to_owned();
        }
        if let Some(ref description) = input.description {
            bot.description = Some(description.clone());
        }
        if let Some(is_active) = input.is_active {
            bot.is_active = is_active;
        }
        bot.updated_at = now;
        bot
    }
}

impl ResourceService<Bot> for ApiClient {
    async fn list(&self, params: &ListParams) -> Result<Page<Bot>, CoreError> {
        Ok(self.list_bots(params).await?)
    }

    async fn get(&self, id: &EntityId) -> Result<Bot, CoreError> {
        self.get_bot(id).await.map_err(|e| not_found_as(e, id))
    }

    async fn create(&self, input: &CreateBot) -> Result<Bot, CoreError> {
        Ok(self.create_bot(input).await?)
    }

    async fn update(&self, id: &EntityId, input: &UpdateBot) -> Result<Bot, CoreError> {
        self.update_bot(id, input)
            .await
            .map_err(|e| not_found_as(e, id))
    }

    async fn delete(&self, id: &EntityId) -> Result<(), CoreError> {
        self.delete_bot(id).await.map_err(|e| not_found_as(e, id))
    }

    async fn bulk_delete(&self, ids: &[EntityId]) -> Result<u64, CoreError> {
        Ok(self.bulk_delete_bots(ids).await?.deleted)
    }
}

fn not_found_as(err: botdesk_api::Error, id: &EntityId) -> CoreError {
    if err.is_not_found() {
        CoreError::NotFound {
            entity: Bot::LABEL.into(),
            identifier: id.to_string(),
        }
    } else {
        err.into()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn create(name: &str) -> CreateBot {
        CreateBot {
            name: name.into(),
            description: None,
            is_active: true,
        }
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert!(Bot::validate_create(&create("Support")).is_ok());
        assert!(Bot::validate_create(&create("   ")).is_err());
        assert!(Bot::validate_create(&create(&"x".repeat(BOT_NAME_MAX))).is_ok());
        assert!(Bot::validate_create(&create(&"x".repeat(BOT_NAME_MAX + 1))).is_err());
    }

    #[test]
    fn long_descriptions_are_rejected() {
        let mut input = create("Support");
        input.description = Some("d".repeat(BOT_DESCRIPTION_MAX + 1));
        let err = Bot::validate_create(&input).unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(Bot::validate_update(&UpdateBot::default()).is_err());
        let rename = UpdateBot {
            name: Some(String::new()),
            ..UpdateBot::default()
        };
        assert!(Bot::validate_update(&rename).is_err());
    }

    #[test]
    fn draft_and_patch_stamp_times() {
        let now = Utc::now();
        let draft = Bot::draft(&create("  Support "), EntityId::temporary(), now);
        assert!(draft.id.is_temporary());
        assert_eq!(draft.name, "Support");
        assert_eq!(draft.created_at, now);

        let later = now + chrono::Duration::seconds(5);
        let patched = draft.patched(
            &UpdateBot {
                is_active: Some(false),
                ..UpdateBot::default()
            },
            later,
        );
        assert!(!patched.is_active);
        assert_eq!(patched.name, "Support");
        assert_eq!(patched.created_at, now);
        assert_eq!(patched.updated_at, later);
    }
}
