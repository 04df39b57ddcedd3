//! Typed view over the raw preference store.

use std::sync::Arc;

use tracing::debug;

use crate::application::ports::{PreferenceKey, PreferenceStore};
use crate::domain::flip::{FlipSettings, flag_literal, parse_flag};
use crate::domain::profiles::ProfileId;

#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PreferenceStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Persisted profile id. Stale ids are returned unchanged.
    pub fn selected_profile(&self) -> Option<ProfileId> {
        self.store
            .get(PreferenceKey::SelectedProfile)
            .and_then(ProfileId::new)
    }

    pub fn flips(&self) -> FlipSettings {
        FlipSettings {
            horizontal: parse_flag(self.store.get(PreferenceKey::FlipHorizontal).as_deref()),
            vertical: parse_flag(self.store.get(PreferenceKey::FlipVertical).as_deref()),
        }
    }

    pub fn save_selected_profile(&self, id: &ProfileId) {
        debug!(profile_id = %id, "persisting selected profile");
        self.store.set(PreferenceKey::SelectedProfile, id.as_str());
    }

    pub fn save_flip_horizontal(&self, value: bool) {
        self.store
            .set(PreferenceKey::FlipHorizontal, flag_literal(value));
    }

    pub fn save_flip_vertical(&self, value: bool) {
        self.store.set(PreferenceKey::FlipVertical, flag_literal(value));
    }
}
