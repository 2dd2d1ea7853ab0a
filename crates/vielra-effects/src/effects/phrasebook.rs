//! Phrasebook effects: category and phrase list loading, phrase creation
//! and deletion.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use vielra_core::modules::phrasebook::{CategoryPhrases, Phrase, PhraseCategory, PhrasebookAction};
use vielra_core::root::AppAction;

use crate::api::{endpoints, ApiRequest, SharedApiClient};
use crate::effect::{Effect, EffectContext, FlightPolicy};
use crate::effects::session_token;
use crate::error::EffectFailure;

/// Phrasebook endpoints answer either the bare value or `{ "data": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Payload<T> {
    fn into_inner(self) -> T {
        match self {
            Payload::Wrapped { data } => data,
            Payload::Bare(value) => value,
        }
    }
}

/// The phrase list is one object when filtered by category, a list otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PhraseLists {
    Many(Vec<CategoryPhrases>),
    One(CategoryPhrases),
}

impl PhraseLists {
    fn into_vec(self) -> Vec<CategoryPhrases> {
        match self {
            PhraseLists::Many(lists) => lists,
            PhraseLists::One(list) => vec![list],
        }
    }
}

// =============================================================================
// Categories
// =============================================================================

pub struct FetchPhraseCategoriesEffect {
    api: SharedApiClient,
}

impl FetchPhraseCategoriesEffect {
    pub fn new(api: SharedApiClient) -> Self {
        FetchPhraseCategoriesEffect { api }
    }
}

#[async_trait]
impl Effect<AppAction> for FetchPhraseCategoriesEffect {
    fn key(&self) -> &'static str {
        "phrasebook/fetchCategories"
    }

    fn triggers(&self, action: &AppAction) -> bool {
        matches!(
            action,
            AppAction::Phrasebook(PhrasebookAction::FetchCategoriesRequested)
        )
    }

    fn policy(&self) -> FlightPolicy {
        FlightPolicy::Restart
    }

    async fn run(&self, _trigger: AppAction, ctx: EffectContext<AppAction>) -> Result<Vec<AppAction>, EffectFailure> {
        let request = ApiRequest::get(endpoints::PHRASE_CATEGORIES).bearer(session_token(&ctx));
        let payload: Payload<Vec<PhraseCategory>> = self.api.send(request).await?.into_result()?.json()?;
        let categories = payload.into_inner();
        info!(count = categories.len(), "Phrase categories loaded");

        Ok(vec![PhrasebookAction::FetchCategoriesSucceeded(categories).into()])
    }

    fn on_failure(&self, _trigger: &AppAction, failure: EffectFailure) -> AppAction {
        PhrasebookAction::FetchCategoriesFailed(failure.to_request_error()).into()
    }
}

// =============================================================================
// Phrase Lists
// =============================================================================

pub struct FetchPhrasesEffect {
    api: SharedApiClient,
}

impl FetchPhrasesEffect {
    pub fn new(api: SharedApiClient) -> Self {
        FetchPhrasesEffect { api }
    }
}

#[async_trait]
impl Effect<AppAction> for FetchPhrasesEffect {
    fn key(&self) -> &'static str {
        "phrasebook/fetchPhrases"
    }

    fn triggers(&self, action: &AppAction) -> bool {
        matches!(
            action,
            AppAction::Phrasebook(PhrasebookAction::FetchPhrasesRequested(_))
        )
    }

    fn policy(&self) -> FlightPolicy {
        FlightPolicy::Restart
    }

    async fn run(&self, trigger: AppAction, ctx: EffectContext<AppAction>) -> Result<Vec<AppAction>, EffectFailure> {
        let AppAction::Phrasebook(PhrasebookAction::FetchPhrasesRequested(category)) = trigger else {
            return Ok(Vec::new());
        };

        let mut request = ApiRequest::get(endpoints::PHRASES).bearer(session_token(&ctx));
        if let Some(slug) = category {
            request = request.query("category", slug);
        }
        let payload: Payload<PhraseLists> = self.api.send(request).await?.into_result()?.json()?;
        let lists = payload.into_inner().into_vec();
        info!(
            categories = lists.len(),
            phrases = lists.iter().map(|l| l.phrases.len()).sum::<usize>(),
            "Phrases loaded"
        );

        Ok(vec![PhrasebookAction::FetchPhrasesSucceeded(lists).into()])
    }

    fn on_failure(&self, _trigger: &AppAction, failure: EffectFailure) -> AppAction {
        PhrasebookAction::FetchPhrasesFailed(failure.to_request_error()).into()
    }
}

// =============================================================================
// Create Phrase
// =============================================================================

/// Submits a new phrase. Repeated submits while one is pending are dropped.
pub struct CreatePhraseEffect {
    api: SharedApiClient,
}

impl CreatePhraseEffect {
    pub fn new(api: SharedApiClient) -> Self {
        CreatePhraseEffect { api }
    }
}

#[async_trait]
impl Effect<AppAction> for CreatePhraseEffect {
    fn key(&self) -> &'static str {
        "phrasebook/createPhrase"
    }

    fn triggers(&self, action: &AppAction) -> bool {
        matches!(
            action,
            AppAction::Phrasebook(PhrasebookAction::CreatePhraseRequested(_))
        )
    }

    async fn run(&self, trigger: AppAction, ctx: EffectContext<AppAction>) -> Result<Vec<AppAction>, EffectFailure> {
        let AppAction::Phrasebook(PhrasebookAction::CreatePhraseRequested(new_phrase)) = trigger else {
            return Ok(Vec::new());
        };

        let request = ApiRequest::post(endpoints::PHRASES)
            .json(&new_phrase)?
            .bearer(session_token(&ctx));
        let payload: Payload<Phrase> = self.api.send(request).await?.into_result()?.json()?;
        let phrase = payload.into_inner();
        info!(phrase_id = %phrase.id, category_id = %phrase.category_id, "Phrase created");

        Ok(vec![PhrasebookAction::CreatePhraseSucceeded(phrase).into()])
    }

    fn on_failure(&self, _trigger: &AppAction, failure: EffectFailure) -> AppAction {
        PhrasebookAction::CreatePhraseFailed(failure.to_request_error()).into()
    }
}

// =============================================================================
// Delete Phrases
// =============================================================================

#[derive(Serialize)]
struct DeleteBody<'a> {
    #[serde(rename = "phraseIds")]
    phrase_ids: &'a [Uuid],
}

pub struct DeletePhrasesEffect {
    api: SharedApiClient,
}

impl DeletePhrasesEffect {
    pub fn new(api: SharedApiClient) -> Self {
        DeletePhrasesEffect { api }
    }
}

#[async_trait]
impl Effect<AppAction> for DeletePhrasesEffect {
    fn key(&self) -> &'static str {
        "phrasebook/deletePhrases"
    }

    fn triggers(&self, action: &AppAction) -> bool {
        matches!(
            action,
            AppAction::Phrasebook(PhrasebookAction::DeletePhrasesRequested(_))
        )
    }

    async fn run(&self, trigger: AppAction, ctx: EffectContext<AppAction>) -> Result<Vec<AppAction>, EffectFailure> {
        let AppAction::Phrasebook(PhrasebookAction::DeletePhrasesRequested(ids)) = trigger else {
            return Ok(Vec::new());
        };
        if ids.is_empty() {
            return Ok(vec![PhrasebookAction::DeletePhrasesSucceeded(ids).into()]);
        }

        let request = ApiRequest::post(endpoints::DELETE_PHRASES)
            .json(&DeleteBody { phrase_ids: &ids })?
            .bearer(session_token(&ctx));
        self.api.send(request).await?.into_result()?;
        info!(count = ids.len(), "Phrases deleted");

        Ok(vec![PhrasebookAction::DeletePhrasesSucceeded(ids).into()])
    }

    fn on_failure(&self, _trigger: &AppAction, failure: EffectFailure) -> AppAction {
        PhrasebookAction::DeletePhrasesFailed(failure.to_request_error()).into()
    }
}
