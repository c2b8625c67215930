//! Pass-through backend

use super::TranslatorBackend;

/// Prefix marking text that went through the identity backend
pub const IDENTITY_MARKER: &str = "[translate]";

/// Wraps the text in a marker instead of translating it
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl TranslatorBackend for IdentityTranslator {
    fn name(&self) -> &str {
        "identity"
    }

    fn translate(&self, text: &str, _target_lang: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        Some(format!("{IDENTITY_MARKER}{text}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_text() {
        assert_eq!(IdentityTranslator.translate("Hello", "zh").as_deref(), Some("[translate]Hello"));
    }

    #[test]
    fn test_blank_is_absent() {
        assert!(IdentityTranslator.translate(" ", "zh").is_none());
    }

    #[test]
    fn test_batch() {
        let texts = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            IdentityTranslator.translate_batch(&texts, "zh"),
            vec![Some("[translate]a".to_string()), Some("[translate]b".to_string())]
        );
    }
}
