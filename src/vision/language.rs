//! Source-language detection by Unicode range

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language whose text should be picked up from the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceLanguage {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ja")]
    Japanese,
    #[serde(rename = "ko")]
    Korean,
    #[serde(rename = "zh")]
    Chinese,
}

const HIRAGANA: (u32, u32) = (0x3040, 0x309F);
const KATAKANA: (u32, u32) = (0x30A0, 0x30FF);
const CJK_IDEOGRAPHS: (u32, u32) = (0x4E00, 0x9FAF);
const HANGUL_SYLLABLES: (u32, u32) = (0xAC00, 0xD7AF);

fn in_range(c: char, (start, end): (u32, u32)) -> bool {
    (start..=end).contains(&(c as u32))
}

impl SourceLanguage {
    /// Parse a short language code ("en", "ja", "ko", "zh")
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Self::English),
            "ja" | "jp" => Some(Self::Japanese),
            "ko" | "kr" => Some(Self::Korean),
            "zh" | "ch" => Some(Self::Chinese),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Japanese => "ja",
            Self::Korean => "ko",
            Self::Chinese => "zh",
        }
    }

    /// Whether a single character belongs to this language's script
    pub fn matches_char(&self, c: char) -> bool {
        match self {
            Self::English => c.is_ascii_alphabetic(),
            Self::Japanese => {
                in_range(c, HIRAGANA) || in_range(c, KATAKANA) || in_range(c, CJK_IDEOGRAPHS)
            }
            Self::Korean => in_range(c, HANGUL_SYLLABLES),
            Self::Chinese => in_range(c, CJK_IDEOGRAPHS),
        }
    }

    /// Whether any character of `text` belongs to this language's script
    pub fn detect_in(&self, text: &str) -> bool {
        text.chars().any(|c| self.matches_char(c))
    }
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// True if `text` contains a character of any of `languages`.
///
/// An empty language list accepts everything.
pub fn contains_any(text: &str, languages: &[SourceLanguage]) -> bool {
    languages.is_empty() || languages.iter().any(|lang| lang.detect_in(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_detection() {
        assert!(SourceLanguage::English.detect_in("Start Game"));
        assert!(SourceLanguage::English.detect_in("HP 100"));
        assert!(!SourceLanguage::English.detect_in("12345"));
        assert!(!SourceLanguage::English.detect_in("こんにちは"));
    }

    #[test]
    fn test_japanese_detection() {
        assert!(SourceLanguage::Japanese.detect_in("こんにちは"));
        assert!(SourceLanguage::Japanese.detect_in("カタカナ"));
        assert!(SourceLanguage::Japanese.detect_in("漢字"));
        assert!(!SourceLanguage::Japanese.detect_in("한국어"));
    }

    #[test]
    fn test_korean_and_chinese_detection() {
        assert!(SourceLanguage::Korean.detect_in("한국어"));
        assert!(!SourceLanguage::Korean.detect_in("中文"));
        assert!(SourceLanguage::Chinese.detect_in("中文"));
        assert!(!SourceLanguage::Chinese.detect_in("ひらがな"));
    }

    #[test]
    fn test_contains_any() {
        let langs = [SourceLanguage::Korean, SourceLanguage::English];
        assert!(contains_any("OK", &langs));
        assert!(contains_any("시작", &langs));
        assert!(!contains_any("開始", &langs));
        assert!(contains_any("開始", &[]));
    }

    #[test]
    fn test_from_code() {
        assert_eq!(SourceLanguage::from_code("EN"), Some(SourceLanguage::English));
        assert_eq!(SourceLanguage::from_code("ja"), Some(SourceLanguage::Japanese));
        assert_eq!(SourceLanguage::from_code("xx"), None);
        assert_eq!(SourceLanguage::Korean.to_string(), "ko");
    }

    #[test]
    fn test_serde_codes() {
        #[derive(Deserialize)]
        struct Langs {
            langs: Vec<SourceLanguage>,
        }

        let parsed: Langs = toml::from_str(r#"langs = ["en", "ja"]"#).unwrap();
        assert_eq!(parsed.langs, vec![SourceLanguage::English, SourceLanguage::Japanese]);
    }
}
