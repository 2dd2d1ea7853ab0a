//! Language-aware message lookup.

use std::sync::Arc;

use vielra_core::root::{selectors, AppAction};
use vielra_core::{LanguageCode, TranslationBundle};
use vielra_store::Store;

/// Translates keys in the language currently held by the store.
///
/// Cheap to clone; every clone reads the same bundle and store.
#[derive(Clone)]
pub struct Translator {
    bundle: Arc<TranslationBundle>,
    store: Store<AppAction>,
}

impl Translator {
    pub fn new(bundle: Arc<TranslationBundle>, store: Store<AppAction>) -> Self {
        Translator { bundle, store }
    }

    pub fn language(&self) -> LanguageCode {
        self.store.select(selectors::current_language)
    }

    /// Message for `key`, falling back to the default language, then the key.
    pub fn t(&self, key: &str) -> String {
        self.bundle.translate(self.language(), key).to_string()
    }

    pub fn t_with(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.bundle.translate_with(self.language(), key, args)
    }

    pub fn bundle(&self) -> &TranslationBundle {
        &self.bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::translation_bundle;
    use vielra_core::modules::app::AppSliceAction;
    use vielra_core::root::app_registry;

    fn translator() -> Translator {
        let store = Store::ephemeral(app_registry().unwrap().compose());
        let bundle = Arc::new(translation_bundle(LanguageCode::En).unwrap());
        Translator::new(bundle, store)
    }

    #[test]
    fn test_follows_language_changes() {
        let translator = translator();
        assert_eq!(translator.t("settings.select_language"), "Select language");

        translator
            .store
            .dispatch(AppSliceAction::SetLanguage(LanguageCode::Id))
            .unwrap();

        assert_eq!(translator.language(), LanguageCode::Id);
        assert_eq!(translator.t("settings.select_language"), "Pilih bahasa");
    }

    #[test]
    fn test_unknown_key_falls_back_to_key() {
        let translator = translator();
        assert_eq!(translator.t("home.unknown"), "home.unknown");
        assert_eq!(
            translator.t_with("home.greeting.hi_user", &[("name", "Linh")]),
            "Hi, Linh"
        );
    }
}
