//! Keyword triggers that decide when a message warrants a web search.

use std::borrow::Cow;

/// Substrings that mark a message as a factual or definitional question.
const DEFAULT_TRIGGERS: &[&str] = &[
    "формула",
    "закон",
    "теорема",
    "определение",
    "правило",
    "дата",
    "год",
    "когда",
    "кто",
    "что такое",
    "как вычислить",
    "столица",
    "население",
    "расстояние",
    "автор",
    "произведение",
    "реакция",
    "элемент",
    "атом",
    "молекула",
    "клетка",
    "уравнение",
    "функция",
    "график",
    "актуальн",
    "современн",
    "последн",
    "новейш",
    "сколько",
    "какой",
    "где находится",
];

/// Keyword policy deciding whether a message warrants a web search.
///
/// Matching is a case-insensitive substring test, so `"год"` also matches
/// `"годы"` and `"погода"`.
#[derive(Debug, Clone)]
pub struct SearchTriggers {
    keywords: Vec<Cow<'static, str>>,
}

impl Default for SearchTriggers {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_TRIGGERS.iter().copied().map(Cow::Borrowed).collect(),
        }
    }
}

impl SearchTriggers {
    /// Creates a policy from custom keywords.
    pub fn new<I, K>(keywords: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Cow<'static, str>>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|keyword| Cow::Owned(keyword.into().to_lowercase()))
                .collect(),
        }
    }

    /// Returns `true` if the message contains any keyword.
    pub fn matches(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.keywords
            .iter()
            .any(|keyword| message.contains(keyword.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_triggers() {
        let triggers = SearchTriggers::default();

        assert!(triggers.matches("Какая ФОРМУЛА площади круга?"));
        assert!(triggers.matches("Что такое фотосинтез"));
        assert!(triggers.matches("в каком году началась война"));
        assert!(!triggers.matches("Привет! Помоги мне, пожалуйста"));
        assert!(!triggers.matches(""));
    }

    #[test]
    fn custom_triggers_are_lowercased() {
        let triggers = SearchTriggers::new(["Ньютон"]);
        assert!(triggers.matches("законы НЬЮТОНА"));
        assert!(!triggers.matches("формула"));
    }
}
