use serde::Serialize;

use crate::store::{Patch, Store};

/// Label shown while no update cycle is running.
pub const IDLE_LABEL: &str = "waiting..";

/// A detected-but-not-yet-applied launcher update, as shown in the popup.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UpdatePopup {
    pub is_shown: bool,
    pub version: String,
    pub release_notes: String,
    pub published_at: String,
    pub download_url: String,
}

impl UpdatePopup {
    /// Hidden popup with every field blanked.
    pub fn cleared() -> Self {
        Self::default()
    }
}

/// Ephemeral session state observed by the UI. Created fresh at process
/// start; nothing in here survives a restart.
#[derive(Clone, Debug, Serialize)]
pub struct SessionState {
    pub is_loading: bool,
    pub is_logged_in: bool,
    pub is_account_panel_shown: bool,
    pub is_info_popup_shown: bool,
    pub is_password_prompt_shown: bool,
    pub is_settings_shown: bool,
    pub is_updating: bool,
    pub update_progress: f32,
    pub update_state_label: String,
    pub update_popup: UpdatePopup,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState {
            is_loading: true,
            is_logged_in: false,
            is_account_panel_shown: false,
            is_info_popup_shown: false,
            is_password_prompt_shown: false,
            is_settings_shown: false,
            is_updating: false,
            update_progress: 0.0,
            update_state_label: IDLE_LABEL.to_owned(),
            update_popup: UpdatePopup::cleared(),
        }
    }
}

/// Partial [`SessionState`]. The popup is a sub-record and is replaced
/// wholesale when present.
#[derive(Clone, Debug, Default)]
pub struct StatePatch {
    pub is_loading: Option<bool>,
    pub is_logged_in: Option<bool>,
    pub is_account_panel_shown: Option<bool>,
    pub is_info_popup_shown: Option<bool>,
    pub is_password_prompt_shown: Option<bool>,
    pub is_settings_shown: Option<bool>,
    pub is_updating: Option<bool>,
    pub update_progress: Option<f32>,
    pub update_state_label: Option<String>,
    pub update_popup: Option<UpdatePopup>,
}

impl Patch<SessionState> for StatePatch {
    fn apply_to(self, state: &mut SessionState) {
        if let Some(value) = self.is_loading {
            state.is_loading = value;
        }
        if let Some(value) = self.is_logged_in {
            state.is_logged_in = value;
        }
        if let Some(value) = self.is_account_panel_shown {
            state.is_account_panel_shown = value;
        }
        if let Some(value) = self.is_info_popup_shown {
            state.is_info_popup_shown = value;
        }
        if let Some(value) = self.is_password_prompt_shown {
            state.is_password_prompt_shown = value;
        }
        if let Some(value) = self.is_settings_shown {
            state.is_settings_shown = value;
        }
        if let Some(value) = self.is_updating {
            state.is_updating = value;
        }
        if let Some(value) = self.update_progress {
            state.update_progress = value;
        }
        if let Some(value) = self.update_state_label {
            state.update_state_label = value;
        }
        if let Some(value) = self.update_popup {
            state.update_popup = value;
        }
    }
}

pub type StateStore = Store<SessionState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_loading_and_idle() {
        let state = SessionState::default();
        assert!(state.is_loading);
        assert!(!state.is_logged_in);
        assert!(!state.is_updating);
        assert_eq!(state.update_progress, 0.0);
        assert_eq!(state.update_state_label, IDLE_LABEL);
        assert!(!state.update_popup.is_shown);
    }

    #[test]
    fn popup_is_replaced_wholesale() {
        let store = StateStore::new(SessionState::default());
        store.set(StatePatch {
            update_popup: Some(UpdatePopup {
                is_shown: true,
                version: "2.0.0".to_owned(),
                release_notes: "notes".to_owned(),
                published_at: "2026-01-01T00:00:00Z".to_owned(),
                download_url: "https://example.invalid/update".to_owned(),
            }),
            ..Default::default()
        });
        store.set(StatePatch {
            update_popup: Some(UpdatePopup::cleared()),
            ..Default::default()
        });

        // No field of the previous popup leaks through the replacement.
        assert_eq!(store.get().update_popup, UpdatePopup::cleared());
    }

    #[test]
    fn visibility_flags_merge_independently() {
        let store = StateStore::new(SessionState::default());
        store.set(StatePatch {
            is_logged_in: Some(true),
            ..Default::default()
        });
        store.set(StatePatch {
            is_settings_shown: Some(true),
            ..Default::default()
        });

        let state = store.get();
        assert!(state.is_logged_in);
        assert!(state.is_settings_shown);
        assert!(state.is_loading);
    }
}
