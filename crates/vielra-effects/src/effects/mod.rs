//! Feature effects of the Vielra application.
//!
//! | Key | Trigger | Policy | Deadline |
//! |-----|---------|--------|----------|
//! | `auth/login` | `LoginRequested` | Restart | default |
//! | `auth/socialLogin` | `SocialLoginRequested` | Restart | default |
//! | `auth/register` | `RegisterRequested` | Restart | default |
//! | `auth/revalidateToken` | `RevalidateToken` | Ignore | 10s |
//! | `auth/revokeToken` | `RevokeTokenRequested` | Ignore | default |
//! | `phrasebook/fetchCategories` | `FetchCategoriesRequested` | Restart | default |
//! | `phrasebook/fetchPhrases` | `FetchPhrasesRequested` | Restart | default |
//! | `phrasebook/createPhrase` | `CreatePhraseRequested` | Ignore | default |
//! | `phrasebook/deletePhrases` | `DeletePhrasesRequested` | Ignore | default |

use vielra_core::modules::auth::token as auth_token;
use vielra_core::root::AppAction;
use vielra_core::ConfigurationError;

use crate::api::SharedApiClient;
use crate::effect::{EffectContext, EffectTable};
use crate::token::TokenStore;

pub mod auth;
pub mod phrasebook;

pub use auth::{LoginEffect, RegisterEffect, RevalidateTokenEffect, RevokeTokenEffect, SocialLoginEffect};
pub use phrasebook::{CreatePhraseEffect, DeletePhrasesEffect, FetchPhraseCategoriesEffect, FetchPhrasesEffect};

/// Every effect the application registers.
pub fn app_effects(
    api: SharedApiClient,
    tokens: TokenStore,
) -> Result<EffectTable<AppAction>, ConfigurationError> {
    EffectTable::new()
        .with(LoginEffect::new(api.clone(), tokens.clone()))?
        .with(SocialLoginEffect::new(api.clone(), tokens.clone()))?
        .with(RegisterEffect::new(api.clone(), tokens.clone()))?
        .with(RevalidateTokenEffect::new(api.clone(), tokens.clone()))?
        .with(RevokeTokenEffect::new(api.clone(), tokens))?
        .with(FetchPhraseCategoriesEffect::new(api.clone()))?
        .with(FetchPhrasesEffect::new(api.clone()))?
        .with(CreatePhraseEffect::new(api.clone()))?
        .with(DeletePhrasesEffect::new(api))
}

/// Token of the signed-in session, if any.
pub(crate) fn session_token(ctx: &EffectContext<AppAction>) -> Option<String> {
    ctx.select(|tree| auth_token(tree).map(str::to_string))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::Duration;

    use vielra_core::root::app_registry;
    use vielra_core::StateTree;
    use vielra_store::{MemoryStorage, Store};

    use super::app_effects;
    use crate::api::testing::MockApiClient;
    use crate::orchestrator::{EffectOrchestrator, OrchestratorConfig, OrchestratorHandle};
    use crate::token::TokenStore;
    use vielra_core::root::AppAction;

    pub(crate) struct Harness {
        pub store: Store<AppAction>,
        pub api: Arc<MockApiClient>,
        pub tokens: TokenStore,
        pub orchestrator: OrchestratorHandle,
    }

    pub(crate) fn harness() -> Harness {
        let store = Store::ephemeral(app_registry().unwrap().compose());
        let api = MockApiClient::new();
        let tokens = TokenStore::new(Arc::new(MemoryStorage::new()));
        let effects = app_effects(api.clone(), tokens.clone()).unwrap();
        let orchestrator = EffectOrchestrator::spawn(&store, effects, OrchestratorConfig::default());
        Harness {
            store,
            api,
            tokens,
            orchestrator,
        }
    }

    /// Waits until the tree satisfies `predicate`.
    pub(crate) async fn settle(store: &Store<AppAction>, predicate: impl Fn(&StateTree) -> bool) {
        let mut rx = store.subscribe();
        let reached = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|tree| predicate(tree)))
            .await
            .expect("state condition not reached in time");
        assert!(reached.is_ok());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vielra_store::MemoryStorage;

    use super::*;
    use crate::api::testing::MockApiClient;

    #[test]
    fn test_app_effect_keys_are_unique() {
        let api = MockApiClient::new();
        let tokens = TokenStore::new(Arc::new(MemoryStorage::new()));
        let table = app_effects(api, tokens).unwrap();
        assert_eq!(
            table.keys(),
            vec![
                "auth/login",
                "auth/socialLogin",
                "auth/register",
                "auth/revalidateToken",
                "auth/revokeToken",
                "phrasebook/fetchCategories",
                "phrasebook/fetchPhrases",
                "phrasebook/createPhrase",
                "phrasebook/deletePhrases"
            ]
        );
    }
}
