//! Conversation lifecycle and participant management.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    conversation::ConversationUpdate, participant::ParticipantUpdate, Conversation,
    ConversationKind, Message, MessageKind, Participant, UserProfile,
};
use crate::services::directory::UserDirectory;
use crate::store::Store;

#[derive(Debug, Deserialize)]
pub struct NewConversation {
    #[serde(rename = "type")]
    pub kind: ConversationKind,
    #[serde(default)]
    pub participant_ids: Vec<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub faculty: Option<String>,
    pub academic_level: Option<String>,
    pub auditorium_id: Option<Uuid>,
    pub course_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantView {
    #[serde(flatten)]
    pub participant: Participant,
    pub profile: Option<UserProfile>,
}

/// A conversation as seen by one participant.
#[derive(Debug, Serialize)]
pub struct ConversationView {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub my_participation: Participant,
    pub participants: Vec<ParticipantView>,
}

/// One row of `GET /conversations`.
#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub unread_count: i64,
    pub last_message: Option<Message>,
    /// The counterpart's profile, direct chats only.
    pub other_participant: Option<UserProfile>,
    pub is_muted: bool,
    pub is_pinned: bool,
}

pub struct ConversationService;

impl ConversationService {
    pub async fn create(
        store: &dyn Store,
        creator: Uuid,
        req: NewConversation,
    ) -> AppResult<ConversationView> {
        match req.kind {
            ConversationKind::Direct => Self::create_direct(store, creator, &req).await,
            ConversationKind::Group | ConversationKind::Broadcast => {
                Self::create_managed(store, creator, req).await
            }
        }
    }

    async fn create_direct(
        store: &dyn Store,
        creator: Uuid,
        req: &NewConversation,
    ) -> AppResult<ConversationView> {
        let [other] = req.participant_ids[..] else {
            return Err(AppError::InvalidArgument(
                "a direct conversation takes exactly one other participant".into(),
            ));
        };
        if other == creator {
            return Err(AppError::InvalidArgument(
                "cannot start a direct conversation with yourself".into(),
            ));
        }
        if store.is_blocked_pair(creator, other).await? {
            return Err(AppError::forbidden(
                "cannot create a conversation with this user",
            ));
        }

        // Idempotent: one active direct conversation per pair.
        if let Some(existing) = store.find_active_direct_between(creator, other).await? {
            return Self::get(store, existing.id, creator).await;
        }

        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            kind: ConversationKind::Direct,
            name: None,
            description: None,
            avatar_url: None,
            faculty: None,
            academic_level: None,
            auditorium_id: None,
            course_code: None,
            created_by: creator,
            only_admins_can_send: false,
            only_admins_can_edit_info: false,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_message_at: None,
        };
        store.insert_conversation(&conversation).await?;
        store
            .insert_participant(&Participant::creator(
                conversation.id,
                creator,
                ConversationKind::Direct,
            ))
            .await?;
        store
            .insert_participant(&Participant::member(conversation.id, other, creator))
            .await?;

        tracing::info!(conversation_id = %conversation.id, "direct conversation created");
        Self::get(store, conversation.id, creator).await
    }

    async fn create_managed(
        store: &dyn Store,
        creator: Uuid,
        req: NewConversation,
    ) -> AppResult<ConversationView> {
        let name = match req.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(AppError::InvalidArgument(
                    "group conversations require a name".into(),
                ))
            }
        };

        // Auditorium-scoped groups: every listed member, the creator
        // included, must belong to the auditorium.
        if let Some(auditorium_id) = req.auditorium_id {
            let auditorium = store
                .get_auditorium(auditorium_id)
                .await?
                .ok_or(AppError::NotFound("auditorium"))?;
            UserDirectory::verify_auditorium_access(store, &auditorium, creator).await?;
            for &user_id in &req.participant_ids {
                UserDirectory::verify_auditorium_access(store, &auditorium, user_id).await?;
            }
        }

        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            kind: req.kind,
            name: Some(name),
            description: req.description,
            avatar_url: req.avatar_url,
            faculty: req.faculty,
            academic_level: req.academic_level,
            auditorium_id: req.auditorium_id,
            course_code: req.course_code,
            created_by: creator,
            only_admins_can_send: req.kind == ConversationKind::Broadcast,
            only_admins_can_edit_info: false,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_message_at: None,
        };
        store.insert_conversation(&conversation).await?;
        store
            .insert_participant(&Participant::creator(conversation.id, creator, req.kind))
            .await?;
        for &user_id in &req.participant_ids {
            if user_id == creator {
                continue;
            }
            store
                .insert_participant(&Participant::member(conversation.id, user_id, creator))
                .await?;
        }

        let creator_name = UserDirectory::display_name(store, creator).await?;
        Self::append_system_message(
            store,
            conversation.id,
            creator,
            format!("Group created by {creator_name}"),
        )
        .await?;

        tracing::info!(
            conversation_id = %conversation.id,
            kind = conversation.kind.as_str(),
            members = req.participant_ids.len() + 1,
            "conversation created"
        );
        Self::get(store, conversation.id, creator).await
    }

    pub async fn get(store: &dyn Store, id: Uuid, requester: Uuid) -> AppResult<ConversationView> {
        let conversation = store
            .get_conversation(id)
            .await?
            .ok_or(AppError::NotFound("conversation"))?;
        let me = Self::require_active_participant(store, id, requester).await?;

        let participants = store.list_participants(id).await?;
        let active: Vec<Participant> = participants.into_iter().filter(|p| p.is_active()).collect();
        let ids: Vec<Uuid> = active.iter().map(|p| p.user_id).collect();
        let mut profiles = UserDirectory::profiles(store, &ids).await?;

        Ok(ConversationView {
            conversation,
            my_participation: me,
            participants: active
                .into_iter()
                .map(|p| {
                    let profile = profiles.remove(&p.user_id);
                    ParticipantView {
                        participant: p,
                        profile,
                    }
                })
                .collect(),
        })
    }

    pub async fn update(
        store: &dyn Store,
        id: Uuid,
        requester: Uuid,
        update: ConversationUpdate,
    ) -> AppResult<ConversationView> {
        if update.is_empty() {
            return Err(AppError::InvalidArgument("no fields to update".into()));
        }
        let conversation = store
            .get_conversation(id)
            .await?
            .ok_or(AppError::NotFound("conversation"))?;
        if conversation.kind == ConversationKind::Direct {
            return Err(AppError::InvalidArgument(
                "direct conversations have no editable info".into(),
            ));
        }
        let me = Self::require_active_participant(store, id, requester).await?;
        me.require_edit_info()?;
        if conversation.only_admins_can_edit_info {
            me.require_manage_participants()?;
        }

        store.update_conversation_info(id, &update, Utc::now()).await?;
        Self::get(store, id, requester).await
    }

    /// Direct chats and creator-initiated deletes deactivate the whole
    /// conversation; everyone else just leaves.
    pub async fn delete(store: &dyn Store, id: Uuid, requester: Uuid) -> AppResult<()> {
        let conversation = store
            .get_conversation(id)
            .await?
            .ok_or(AppError::NotFound("conversation"))?;
        Self::require_active_participant(store, id, requester).await?;

        if conversation.kind == ConversationKind::Direct || conversation.created_by == requester {
            store.set_conversation_active(id, false).await?;
            tracing::info!(conversation_id = %id, "conversation deactivated");
        } else {
            store.mark_participant_left(id, requester, Utc::now()).await?;
            let name = UserDirectory::display_name(store, requester).await?;
            Self::append_system_message(store, id, requester, format!("{name} left the group"))
                .await?;
        }
        Ok(())
    }

    pub async fn list(store: &dyn Store, requester: Uuid) -> AppResult<Vec<ConversationSummary>> {
        let participations = store.list_participations(requester).await?;
        let mut summaries = Vec::with_capacity(participations.len());

        for p in participations {
            let Some(conversation) = store.get_conversation(p.conversation_id).await? else {
                continue;
            };
            if !conversation.is_active {
                continue;
            }

            let unread_count = store
                .count_messages_after(conversation.id, p.last_read_at)
                .await?;
            let last_message = store.last_message(conversation.id).await?;

            let other_participant = if conversation.kind == ConversationKind::Direct {
                let mut other = None;
                for member in store.list_participants(conversation.id).await? {
                    if member.user_id != requester && member.is_active() {
                        other = store.get_profile(member.user_id).await?;
                        break;
                    }
                }
                other
            } else {
                None
            };

            summaries.push(ConversationSummary {
                conversation,
                unread_count,
                last_message,
                other_participant,
                is_muted: p.is_muted,
                is_pinned: p.is_pinned,
            });
        }

        // Most recently active first; untouched conversations sort by age.
        summaries.sort_by(|a, b| {
            let at = |s: &ConversationSummary| {
                s.conversation
                    .last_message_at
                    .unwrap_or(s.conversation.created_at)
            };
            at(b).cmp(&at(a))
        });
        Ok(summaries)
    }

    pub async fn add_participants(
        store: &dyn Store,
        conversation_id: Uuid,
        requester: Uuid,
        user_ids: Vec<Uuid>,
    ) -> AppResult<ConversationView> {
        if user_ids.is_empty() {
            return Err(AppError::InvalidArgument("no participants to add".into()));
        }
        let conversation = store
            .get_conversation(conversation_id)
            .await?
            .ok_or(AppError::NotFound("conversation"))?;
        if !conversation.kind.is_managed() {
            return Err(AppError::InvalidArgument(
                "cannot add participants to a direct conversation".into(),
            ));
        }
        let me = Self::require_active_participant(store, conversation_id, requester).await?;
        me.require_add_members()?;

        let auditorium = match conversation.auditorium_id {
            Some(id) => store.get_auditorium(id).await?,
            None => None,
        };

        let mut added_names = Vec::new();
        for &user_id in &user_ids {
            if let Some(auditorium) = &auditorium {
                UserDirectory::verify_auditorium_access(store, auditorium, user_id).await?;
            }
            if let Some(existing) = store.get_participant(conversation_id, user_id).await? {
                if existing.is_active() {
                    continue; // already a participant
                }
            }
            store
                .insert_participant(&Participant::member(conversation_id, user_id, requester))
                .await?;
            added_names.push(UserDirectory::display_name(store, user_id).await?);
        }

        if !added_names.is_empty() {
            Self::append_system_message(
                store,
                conversation_id,
                requester,
                format!("{} joined the group", added_names.join(", ")),
            )
            .await?;
        }
        Self::get(store, conversation_id, requester).await
    }

    pub async fn remove_participant(
        store: &dyn Store,
        conversation_id: Uuid,
        requester: Uuid,
        user_id: Uuid,
    ) -> AppResult<()> {
        if user_id == requester {
            // Removing yourself is just leaving.
            return Self::delete(store, conversation_id, requester).await;
        }
        let conversation = store
            .get_conversation(conversation_id)
            .await?
            .ok_or(AppError::NotFound("conversation"))?;
        if !conversation.kind.is_managed() {
            return Err(AppError::InvalidArgument(
                "cannot remove participants from a direct conversation".into(),
            ));
        }
        let me = Self::require_active_participant(store, conversation_id, requester).await?;
        me.require_remove_members()?;
        if user_id == conversation.created_by {
            return Err(AppError::forbidden("cannot remove the conversation creator"));
        }
        let target = store
            .get_participant(conversation_id, user_id)
            .await?
            .filter(Participant::is_active)
            .ok_or(AppError::NotFound("participant"))?;

        store
            .mark_participant_left(conversation_id, target.user_id, Utc::now())
            .await?;
        let name = UserDirectory::display_name(store, user_id).await?;
        Self::append_system_message(
            store,
            conversation_id,
            requester,
            format!("{name} was removed from the group"),
        )
        .await?;
        Ok(())
    }

    pub async fn update_participant(
        store: &dyn Store,
        conversation_id: Uuid,
        requester: Uuid,
        user_id: Uuid,
        update: ParticipantUpdate,
    ) -> AppResult<Participant> {
        let me = Self::require_active_participant(store, conversation_id, requester).await?;
        // Participants manage their own mute/pin flags; everything else
        // needs an admin role.
        if !(user_id == requester && update.only_personal_flags()) {
            me.require_manage_participants()?;
        }
        store
            .get_participant(conversation_id, user_id)
            .await?
            .filter(Participant::is_active)
            .ok_or(AppError::NotFound("participant"))?;

        store
            .update_participant(conversation_id, user_id, &update)
            .await?;
        store
            .get_participant(conversation_id, user_id)
            .await?
            .ok_or(AppError::NotFound("participant"))
    }

    pub(crate) async fn require_active_participant(
        store: &dyn Store,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Participant> {
        store
            .get_participant(conversation_id, user_id)
            .await?
            .filter(Participant::is_active)
            .ok_or_else(|| AppError::forbidden("not a participant in this conversation"))
    }

    async fn append_system_message(
        store: &dyn Store,
        conversation_id: Uuid,
        actor: Uuid,
        content: String,
    ) -> AppResult<()> {
        let now = Utc::now();
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: actor,
            kind: MessageKind::System,
            content: Some(content),
            media_url: None,
            reply_to_message_id: None,
            latitude: None,
            longitude: None,
            location_name: None,
            is_edited: false,
            edited_at: None,
            is_deleted: false,
            deleted_at: None,
            deleted_for_everyone: false,
            created_at: now,
        };
        store.insert_message(&message).await?;
        store.touch_last_message(conversation_id, now).await?;
        Ok(())
    }
}
