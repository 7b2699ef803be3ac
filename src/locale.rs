/// A user's language preferences, most specific first (e.g. `fr-CA`, `fr`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locale {
    ui_languages: Vec<String>,
}

impl Locale {
    pub fn new<I, S>(ui_languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ui_languages: ui_languages.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds a locale from a POSIX tag such as `fr_CA.UTF-8@euro`.
    pub fn from_posix(tag: &str) -> Self {
        let base = tag.split(['.', '@']).next().unwrap_or_default();
        if base.is_empty() || base == "C" || base == "POSIX" {
            return Self::default();
        }
        Self::new([base.replace('_', "-")])
    }

    /// Reads `LC_ALL`, `LC_MESSAGES` then `LANG`.
    pub fn from_env() -> Self {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.is_empty())
            .map(|v| Self::from_posix(&v))
            .unwrap_or_default()
    }

    pub fn ui_languages(&self) -> &[String] {
        &self.ui_languages
    }

    /// Language tags to try, in order: the declared tags, the bare language
    /// of every composite tag (`en` for `en-US`), then the empty default tag.
    pub fn lookup_languages(&self) -> Vec<String> {
        let mut all = self.ui_languages.clone();
        let mut has_empty = false;
        for language in &self.ui_languages {
            if language.is_empty() {
                has_empty = true;
            } else if language.contains(['_', '-']) {
                let normalized = language.replace('_', "-");
                let mut parts = normalized.split('-');
                if let (Some(head), Some(_)) = (parts.next(), parts.next()) {
                    if !all.iter().any(|l| l == head) {
                        all.push(head.to_string());
                    }
                }
            }
        }
        if !has_empty {
            all.push(String::new());
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_languages_expands_composites() {
        let locale = Locale::new(["fr-CA", "en_US"]);
        assert_eq!(locale.lookup_languages(), vec!["fr-CA", "en_US", "fr", "en", ""]);
    }

    #[test]
    fn test_lookup_languages_keeps_explicit_default() {
        let locale = Locale::new(["de", ""]);
        assert_eq!(locale.lookup_languages(), vec!["de", ""]);
    }

    #[test]
    fn test_default_locale_only_has_default_language() {
        assert_eq!(Locale::default().lookup_languages(), vec![""]);
    }

    #[test]
    fn test_from_posix() {
        assert_eq!(Locale::from_posix("fr_CA.UTF-8").ui_languages(), &["fr-CA".to_string()]);
        assert!(Locale::from_posix("C.UTF-8").ui_languages().is_empty());
    }
}
