//! Profile lookups and auditorium eligibility checks.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Auditorium, UserProfile};
use crate::store::Store;

pub struct UserDirectory;

impl UserDirectory {
    pub async fn profile(store: &dyn Store, user_id: Uuid) -> AppResult<UserProfile> {
        store
            .get_profile(user_id)
            .await?
            .ok_or(AppError::NotFound("user"))
    }

    /// Batched lookup for response enrichment; unknown ids are simply
    /// absent from the result.
    pub async fn profiles(
        store: &dyn Store,
        user_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, UserProfile>> {
        let mut out = HashMap::with_capacity(user_ids.len());
        for &id in user_ids {
            if out.contains_key(&id) {
                continue;
            }
            if let Some(profile) = store.get_profile(id).await? {
                out.insert(id, profile);
            }
        }
        Ok(out)
    }

    pub async fn display_name(store: &dyn Store, user_id: Uuid) -> AppResult<String> {
        Ok(store
            .get_profile(user_id)
            .await?
            .map(|p| p.full_name)
            .unwrap_or_else(|| user_id.to_string()))
    }

    /// A user may join an auditorium-scoped conversation only when their
    /// faculty and academic level both match. The rejection names the
    /// ineligible user so group creation failures are actionable.
    pub async fn verify_auditorium_access(
        store: &dyn Store,
        auditorium: &Auditorium,
        user_id: Uuid,
    ) -> AppResult<()> {
        let profile = Self::profile(store, user_id).await?;
        let eligible = profile.faculty.as_deref() == Some(auditorium.faculty.as_str())
            && profile.academic_level.as_deref() == Some(auditorium.academic_level.as_str());
        if !eligible {
            return Err(AppError::forbidden(format!(
                "{} is not eligible for auditorium '{}'",
                profile.full_name, auditorium.name
            )));
        }
        Ok(())
    }
}
