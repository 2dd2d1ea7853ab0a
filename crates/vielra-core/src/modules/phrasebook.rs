//! # Phrasebook Slice
//!
//! Phrase categories and per-category phrase lists fetched from the API,
//! the create/delete request state, and the bottom-sheet UI state of the
//! phrasebook screens. Only the category list and the phrase cache survive
//! a restart.
//!
//! ## Phrase Cache
//! ```text
//! FetchPhrasesSucceeded([{category, phrases}, ..]) ──► phrases[category.id] replaced
//! CreatePhraseSucceeded(phrase)                    ──► appended, phrase_count + 1
//! DeletePhrasesSucceeded(ids)                      ──► removed, phrase_count - n
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::i18n::LanguageCode;
use crate::modules::{RequestError, RequestStatus};
use crate::root::AppAction;
use crate::slice::{Persistence, Slice};
use crate::tree::StateTree;

pub const NAME: &str = "phrasebook";

/// Bottom-sheet snap index meaning "closed".
pub const SHEET_CLOSED: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedName {
    pub en: String,
    pub id: String,
    #[serde(default)]
    pub vi: Option<String>,
}

impl LocalizedName {
    /// Name in `language`, English when no translation exists.
    pub fn get(&self, language: LanguageCode) -> &str {
        match language {
            LanguageCode::En => &self.en,
            LanguageCode::Id => &self.id,
            LanguageCode::Vi => self.vi.as_deref().unwrap_or(&self.en),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseCategory {
    pub id: Uuid,
    pub name: LocalizedName,
    pub slug: String,
    pub color: String,
    #[serde(rename = "iconName")]
    pub icon_name: String,
    #[serde(rename = "iconType")]
    pub icon_type: String,
    #[serde(default)]
    pub phrase_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrase {
    pub id: Uuid,
    pub category_id: Uuid,
    pub text: String,
    pub translation: String,
}

/// One category with its phrases, as returned by the phrase list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPhrases {
    pub category: PhraseCategory,
    pub phrases: Vec<Phrase>,
}

/// Body of a create-phrase request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPhrase {
    pub category_id: Uuid,
    pub text: String,
    pub translation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhrasebookState {
    pub categories: Vec<PhraseCategory>,
    pub fetch_categories: RequestStatus,
    /// Phrases keyed by category id.
    pub phrases: BTreeMap<Uuid, Vec<Phrase>>,
    pub fetch_phrases: RequestStatus,
    pub create_phrase: RequestStatus,
    pub delete_phrases: RequestStatus,
    pub form_dirty: bool,
    pub category_list_snap: i32,
    pub detail_snap: i32,
    pub detail: Option<Phrase>,
}

impl Default for PhrasebookState {
    fn default() -> Self {
        PhrasebookState {
            categories: Vec::new(),
            fetch_categories: RequestStatus::idle(),
            phrases: BTreeMap::new(),
            fetch_phrases: RequestStatus::idle(),
            create_phrase: RequestStatus::idle(),
            delete_phrases: RequestStatus::idle(),
            form_dirty: false,
            category_list_snap: SHEET_CLOSED,
            detail_snap: SHEET_CLOSED,
            detail: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhrasebookAction {
    FetchCategoriesRequested,
    FetchCategoriesSucceeded(Vec<PhraseCategory>),
    FetchCategoriesFailed(RequestError),
    /// Fetches one category by slug, or every category when `None`.
    FetchPhrasesRequested(Option<String>),
    FetchPhrasesSucceeded(Vec<CategoryPhrases>),
    FetchPhrasesFailed(RequestError),
    CreatePhraseRequested(NewPhrase),
    CreatePhraseSucceeded(Phrase),
    CreatePhraseFailed(RequestError),
    DeletePhrasesRequested(Vec<Uuid>),
    DeletePhrasesSucceeded(Vec<Uuid>),
    DeletePhrasesFailed(RequestError),
    SetFormDirty(bool),
    SetCategoryListSnap(i32),
    SetDetailSnap(i32),
    SetDetail(Option<Phrase>),
    Reset,
}

impl PhrasebookAction {
    pub fn kind(&self) -> &'static str {
        match self {
            PhrasebookAction::FetchCategoriesRequested => "phrasebook/fetchCategoriesRequested",
            PhrasebookAction::FetchCategoriesSucceeded(_) => "phrasebook/fetchCategoriesSucceeded",
            PhrasebookAction::FetchCategoriesFailed(_) => "phrasebook/fetchCategoriesFailed",
            PhrasebookAction::FetchPhrasesRequested(_) => "phrasebook/fetchPhrasesRequested",
            PhrasebookAction::FetchPhrasesSucceeded(_) => "phrasebook/fetchPhrasesSucceeded",
            PhrasebookAction::FetchPhrasesFailed(_) => "phrasebook/fetchPhrasesFailed",
            PhrasebookAction::CreatePhraseRequested(_) => "phrasebook/createPhraseRequested",
            PhrasebookAction::CreatePhraseSucceeded(_) => "phrasebook/createPhraseSucceeded",
            PhrasebookAction::CreatePhraseFailed(_) => "phrasebook/createPhraseFailed",
            PhrasebookAction::DeletePhrasesRequested(_) => "phrasebook/deletePhrasesRequested",
            PhrasebookAction::DeletePhrasesSucceeded(_) => "phrasebook/deletePhrasesSucceeded",
            PhrasebookAction::DeletePhrasesFailed(_) => "phrasebook/deletePhrasesFailed",
            PhrasebookAction::SetFormDirty(_) => "phrasebook/setFormDirty",
            PhrasebookAction::SetCategoryListSnap(_) => "phrasebook/setCategoryListSnap",
            PhrasebookAction::SetDetailSnap(_) => "phrasebook/setDetailSnap",
            PhrasebookAction::SetDetail(_) => "phrasebook/setDetail",
            PhrasebookAction::Reset => "phrasebook/reset",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PhrasebookSlice;

impl PhrasebookSlice {
    fn adjust_count(state: &mut PhrasebookState, category_id: Uuid, delta: i64) {
        if let Some(category) = state.categories.iter_mut().find(|c| c.id == category_id) {
            let count = (category.phrase_count as i64 + delta).max(0);
            category.phrase_count = u32::try_from(count).unwrap_or(u32::MAX);
        }
    }
}

impl Slice<AppAction> for PhrasebookSlice {
    const NAME: &'static str = NAME;
    type State = PhrasebookState;

    fn initial_state(&self) -> PhrasebookState {
        PhrasebookState::default()
    }

    fn reduce(&self, state: &PhrasebookState, action: &AppAction) -> Option<PhrasebookState> {
        let AppAction::Phrasebook(action) = action else {
            return None;
        };

        let mut next = state.clone();
        match action {
            PhrasebookAction::FetchCategoriesRequested => {
                next.fetch_categories = RequestStatus::loading();
            }
            PhrasebookAction::FetchCategoriesSucceeded(categories) => {
                next.categories = categories.clone();
                next.fetch_categories = RequestStatus::idle();
            }
            // Previously fetched categories stay visible.
            PhrasebookAction::FetchCategoriesFailed(error) => {
                next.fetch_categories = RequestStatus::failed(error.clone());
            }
            PhrasebookAction::FetchPhrasesRequested(_) => {
                next.fetch_phrases = RequestStatus::loading();
            }
            PhrasebookAction::FetchPhrasesSucceeded(lists) => {
                for list in lists {
                    next.phrases.insert(list.category.id, list.phrases.clone());
                }
                next.fetch_phrases = RequestStatus::idle();
            }
            PhrasebookAction::FetchPhrasesFailed(error) => {
                next.fetch_phrases = RequestStatus::failed(error.clone());
            }
            PhrasebookAction::CreatePhraseRequested(_) => {
                next.create_phrase = RequestStatus::loading();
            }
            PhrasebookAction::CreatePhraseSucceeded(phrase) => {
                next.phrases
                    .entry(phrase.category_id)
                    .or_default()
                    .push(phrase.clone());
                Self::adjust_count(&mut next, phrase.category_id, 1);
                next.create_phrase = RequestStatus::idle();
                next.form_dirty = false;
            }
            PhrasebookAction::CreatePhraseFailed(error) => {
                next.create_phrase = RequestStatus::failed(error.clone());
            }
            PhrasebookAction::DeletePhrasesRequested(_) => {
                next.delete_phrases = RequestStatus::loading();
            }
            PhrasebookAction::DeletePhrasesSucceeded(ids) => {
                let mut removed: BTreeMap<Uuid, i64> = BTreeMap::new();
                for (category_id, phrases) in next.phrases.iter_mut() {
                    let before = phrases.len();
                    phrases.retain(|p| !ids.contains(&p.id));
                    let gone = (before - phrases.len()) as i64;
                    if gone > 0 {
                        removed.insert(*category_id, gone);
                    }
                }
                for (category_id, gone) in removed {
                    Self::adjust_count(&mut next, category_id, -gone);
                }
                if next.detail.as_ref().is_some_and(|p| ids.contains(&p.id)) {
                    next.detail = None;
                    next.detail_snap = SHEET_CLOSED;
                }
                next.delete_phrases = RequestStatus::idle();
            }
            PhrasebookAction::DeletePhrasesFailed(error) => {
                next.delete_phrases = RequestStatus::failed(error.clone());
            }
            PhrasebookAction::SetFormDirty(dirty) => next.form_dirty = *dirty,
            PhrasebookAction::SetCategoryListSnap(index) => next.category_list_snap = *index,
            PhrasebookAction::SetDetailSnap(index) => next.detail_snap = *index,
            PhrasebookAction::SetDetail(phrase) => next.detail = phrase.clone(),
            PhrasebookAction::Reset => next = PhrasebookState::default(),
        }
        Some(next)
    }

    fn persistence(&self) -> Persistence {
        Persistence::Allow(&["categories", "phrases"])
    }
}

pub fn select(tree: &StateTree) -> Option<&PhrasebookState> {
    tree.get::<PhrasebookState>(NAME)
}

pub fn categories(tree: &StateTree) -> &[PhraseCategory] {
    select(tree).map_or(&[], |s| s.categories.as_slice())
}

/// Cached phrases of one category, empty until fetched.
pub fn phrases(tree: &StateTree, category_id: Uuid) -> &[Phrase] {
    select(tree)
        .and_then(|s| s.phrases.get(&category_id))
        .map_or(&[], Vec::as_slice)
}

pub fn is_detail_open(tree: &StateTree) -> bool {
    select(tree).is_some_and(|s| s.detail_snap != SHEET_CLOSED && s.detail.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(slug: &str) -> PhraseCategory {
        PhraseCategory {
            id: Uuid::new_v4(),
            name: LocalizedName {
                en: "Greetings".into(),
                id: "Salam".into(),
                vi: None,
            },
            slug: slug.into(),
            color: "#ff0000".into(),
            icon_name: "hand".into(),
            icon_type: "ionicons".into(),
            phrase_count: 3,
        }
    }

    fn phrase(category_id: Uuid, text: &str) -> Phrase {
        Phrase {
            id: Uuid::new_v4(),
            category_id,
            text: text.into(),
            translation: format!("{text} (vi)"),
        }
    }

    fn reduce(state: &PhrasebookState, action: PhrasebookAction) -> PhrasebookState {
        PhrasebookSlice
            .reduce(state, &AppAction::Phrasebook(action))
            .unwrap()
    }

    #[test]
    fn test_failed_fetch_keeps_categories() {
        let loaded = reduce(
            &PhrasebookState::default(),
            PhrasebookAction::FetchCategoriesSucceeded(vec![category("greetings")]),
        );
        let failed = reduce(
            &loaded,
            PhrasebookAction::FetchCategoriesFailed(RequestError::message("Failed to get phrase category")),
        );
        assert_eq!(failed.categories.len(), 1);
        assert!(failed.fetch_categories.is_failed());
    }

    #[test]
    fn test_fetched_phrases_replace_their_category_only() {
        let food = category("food");
        let travel = category("travel");
        let state = reduce(
            &PhrasebookState::default(),
            PhrasebookAction::FetchPhrasesSucceeded(vec![
                CategoryPhrases {
                    category: food.clone(),
                    phrases: vec![phrase(food.id, "rice")],
                },
                CategoryPhrases {
                    category: travel.clone(),
                    phrases: vec![phrase(travel.id, "train")],
                },
            ]),
        );

        let refreshed = reduce(
            &state,
            PhrasebookAction::FetchPhrasesSucceeded(vec![CategoryPhrases {
                category: food.clone(),
                phrases: vec![phrase(food.id, "noodles"), phrase(food.id, "tea")],
            }]),
        );

        assert_eq!(refreshed.phrases[&food.id].len(), 2);
        assert_eq!(refreshed.phrases[&travel.id][0].text, "train");
        assert_eq!(refreshed.fetch_phrases, RequestStatus::idle());
    }

    #[test]
    fn test_failed_phrase_fetch_keeps_cache() {
        let food = category("food");
        let loaded = reduce(
            &PhrasebookState::default(),
            PhrasebookAction::FetchPhrasesSucceeded(vec![CategoryPhrases {
                category: food.clone(),
                phrases: vec![phrase(food.id, "rice")],
            }]),
        );
        let loading = reduce(&loaded, PhrasebookAction::FetchPhrasesRequested(Some("food".into())));
        assert!(loading.fetch_phrases.loading);

        let failed = reduce(&loading, PhrasebookAction::FetchPhrasesFailed(RequestError::message("offline")));
        assert!(failed.fetch_phrases.is_failed());
        assert_eq!(failed.phrases[&food.id].len(), 1);
    }

    #[test]
    fn test_created_phrase_is_cached_and_counted() {
        let food = category("food");
        let state = reduce(
            &PhrasebookState::default(),
            PhrasebookAction::FetchCategoriesSucceeded(vec![food.clone()]),
        );
        let state = reduce(&state, PhrasebookAction::SetFormDirty(true));
        let state = reduce(
            &state,
            PhrasebookAction::CreatePhraseRequested(NewPhrase {
                category_id: food.id,
                text: "water".into(),
                translation: "nước".into(),
            }),
        );
        assert!(state.create_phrase.loading);

        let state = reduce(&state, PhrasebookAction::CreatePhraseSucceeded(phrase(food.id, "water")));
        assert_eq!(state.phrases[&food.id].len(), 1);
        assert_eq!(state.categories[0].phrase_count, 4);
        assert!(!state.form_dirty);
        assert_eq!(state.create_phrase, RequestStatus::idle());
    }

    #[test]
    fn test_create_failure_keeps_form_dirty() {
        let state = reduce(&PhrasebookState::default(), PhrasebookAction::SetFormDirty(true));
        let state = reduce(
            &state,
            PhrasebookAction::CreatePhraseFailed(RequestError::message("The text field is required.")),
        );
        assert!(state.form_dirty);
        assert!(state.create_phrase.is_failed());
    }

    #[test]
    fn test_deleted_phrases_leave_cache_and_detail() {
        let food = category("food");
        let rice = phrase(food.id, "rice");
        let tea = phrase(food.id, "tea");
        let state = reduce(
            &PhrasebookState::default(),
            PhrasebookAction::FetchCategoriesSucceeded(vec![food.clone()]),
        );
        let state = reduce(
            &state,
            PhrasebookAction::FetchPhrasesSucceeded(vec![CategoryPhrases {
                category: food.clone(),
                phrases: vec![rice.clone(), tea.clone()],
            }]),
        );
        let state = reduce(&state, PhrasebookAction::SetDetail(Some(rice.clone())));
        let state = reduce(&state, PhrasebookAction::SetDetailSnap(0));

        let state = reduce(&state, PhrasebookAction::DeletePhrasesSucceeded(vec![rice.id]));
        assert_eq!(state.phrases[&food.id], vec![tea]);
        assert_eq!(state.categories[0].phrase_count, 2);
        assert_eq!(state.detail, None);
        assert_eq!(state.detail_snap, SHEET_CLOSED);
    }

    #[test]
    fn test_phrase_count_never_goes_negative() {
        let mut food = category("food");
        food.phrase_count = 0;
        let p = phrase(food.id, "rice");
        let state = reduce(
            &PhrasebookState::default(),
            PhrasebookAction::FetchCategoriesSucceeded(vec![food.clone()]),
        );
        let state = reduce(
            &state,
            PhrasebookAction::FetchPhrasesSucceeded(vec![CategoryPhrases {
                category: food,
                phrases: vec![p.clone()],
            }]),
        );
        let state = reduce(&state, PhrasebookAction::DeletePhrasesSucceeded(vec![p.id]));
        assert_eq!(state.categories[0].phrase_count, 0);
    }

    #[test]
    fn test_phrase_cache_is_persisted() {
        let policy = PhrasebookSlice.persistence();
        assert!(policy.permits("categories"));
        assert!(policy.permits("phrases"));
        assert!(!policy.permits("fetch_phrases"));
        assert!(!policy.permits("form_dirty"));
    }

    #[test]
    fn test_sheets_start_closed() {
        let state = PhrasebookState::default();
        assert_eq!(state.category_list_snap, SHEET_CLOSED);
        assert_eq!(state.detail_snap, SHEET_CLOSED);
    }

    #[test]
    fn test_localized_name_fallback() {
        let name = category("x").name;
        assert_eq!(name.get(LanguageCode::Id), "Salam");
        assert_eq!(name.get(LanguageCode::Vi), "Greetings");
    }

    #[test]
    fn test_category_wire_format() {
        let json = serde_json::json!({
            "id": "6f1c2a3e-8d54-4b1a-9a8e-3f7c2d1b0a99",
            "name": { "en": "Food", "id": "Makanan" },
            "slug": "food",
            "color": "#00aa00",
            "iconName": "restaurant",
            "iconType": "ionicons",
            "phrase_count": 12
        });
        let category: PhraseCategory = serde_json::from_value(json).unwrap();
        assert_eq!(category.phrase_count, 12);
        assert_eq!(category.icon_name, "restaurant");
    }
}
