//! The structured video plan produced by the planning stage.
//!
//! A plan is immutable once persisted: every later stage reads it as a
//! frozen input, and its field values feed the provenance digests that
//! decide artifact staleness.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Languages the speech synthesis backend supports. Plans naming a language
/// outside this set are rejected at validation time rather than failing
/// deep inside asset generation.
pub const SUPPORTED_SPEECH_LANGUAGES: &[&str] = &[
    "arabic",
    "bengali",
    "dutch",
    "english",
    "french",
    "german",
    "hindi",
    "indonesian",
    "italian",
    "japanese",
    "korean",
    "marathi",
    "polish",
    "portuguese",
    "romanian",
    "russian",
    "spanish",
    "tamil",
    "telugu",
    "thai",
    "turkish",
    "ukrainian",
    "vietnamese",
];

/// One vocabulary item: the word shown to the audience and its translation
/// in the language being taught.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPair {
    pub source_word: String,
    pub target_word: String,
}

/// Structured plan for one video, returned by the plan producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoPlan {
    /// Short kebab-case slug summarizing the theme (e.g. "japanese-bar-words").
    pub project_slug: String,
    /// Language of the audience.
    pub source_language: String,
    /// Language being taught.
    pub target_language: String,
    /// Short descriptive topic.
    pub topic: String,
    /// Social-media title, in the source language.
    pub video_title: String,
    /// Social-media description, in the source language.
    pub video_description: String,
    /// Spoken intro explaining the format, in the source language.
    pub intro_text: String,
    /// The vocabulary of the lesson.
    pub word_pairs: Vec<WordPair>,
    /// Prompt for the background music generator.
    pub music_prompt: String,
    /// Prompt for the background image generator.
    pub image_prompt: String,
    /// Social-media hashtags in both languages.
    pub hashtags: Vec<String>,
}

impl VideoPlan {
    /// Validate a plan returned by the plan producer.
    ///
    /// Rejections here are `Error::Validation` and are fatal: a malformed
    /// plan is never retried.
    pub fn validate(&self) -> Result<()> {
        if self.project_slug.trim().is_empty() {
            return Err(Error::validation("plan has an empty project_slug"));
        }
        if self.intro_text.trim().is_empty() {
            return Err(Error::validation("plan has an empty intro_text"));
        }
        if self.image_prompt.trim().is_empty() {
            return Err(Error::validation("plan has an empty image_prompt"));
        }
        if self.music_prompt.trim().is_empty() {
            return Err(Error::validation("plan has an empty music_prompt"));
        }
        if self.word_pairs.is_empty() {
            return Err(Error::validation("plan has no word pairs"));
        }
        for (i, pair) in self.word_pairs.iter().enumerate() {
            if pair.source_word.trim().is_empty() || pair.target_word.trim().is_empty() {
                return Err(Error::validation(format!("word pair {i} has an empty side")));
            }
        }
        for (field, lang) in [
            ("source_language", &self.source_language),
            ("target_language", &self.target_language),
        ] {
            if !SUPPORTED_SPEECH_LANGUAGES.contains(&lang.to_lowercase().as_str()) {
                return Err(Error::validation(format!(
                    "{field} '{lang}' is not supported for speech synthesis"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> VideoPlan {
        VideoPlan {
            project_slug: "japanese-ramen-words".into(),
            source_language: "English".into(),
            target_language: "Japanese".into(),
            topic: "Essential ramen shop vocabulary".into(),
            video_title: "5 ramen words you need".into(),
            video_description: "Learn the words before you order.".into(),
            intro_text: "You will see a word and have 5 seconds to guess it!".into(),
            word_pairs: vec![
                WordPair {
                    source_word: "noodles".into(),
                    target_word: "men".into(),
                },
                WordPair {
                    source_word: "broth".into(),
                    target_word: "supu".into(),
                },
            ],
            music_prompt: "calm lofi beat".into(),
            image_prompt: "a neon-lit ramen bar at night, 9:16".into(),
            hashtags: vec!["#ramen".into(), "#japanese".into()],
        }
    }

    #[test]
    fn test_valid_plan_passes() {
        sample_plan().validate().unwrap();
    }

    #[test]
    fn test_rejects_empty_word_pairs() {
        let mut plan = sample_plan();
        plan.word_pairs.clear();
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_rejects_blank_pair_member() {
        let mut plan = sample_plan();
        plan.word_pairs[1].target_word = "  ".into();
        let err = plan.validate().unwrap_err();
        assert!(err.to_string().contains("word pair 1"));
    }

    #[test]
    fn test_rejects_unsupported_language() {
        let mut plan = sample_plan();
        plan.target_language = "Klingon".into();
        let err = plan.validate().unwrap_err();
        assert!(err.to_string().contains("Klingon"));
    }

    #[test]
    fn test_language_check_is_case_insensitive() {
        let mut plan = sample_plan();
        plan.source_language = "UKRAINIAN".into();
        plan.validate().unwrap();
    }

    #[test]
    fn test_plan_json_roundtrip() {
        let plan = sample_plan();
        let json = serde_json::to_string(&plan).unwrap();
        let back: VideoPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(plan, back);
    }
}
