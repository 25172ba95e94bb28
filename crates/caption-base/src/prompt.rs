use crate::policy::{hashtag_guidance, Length, Platform, Tone};

/// Bounded-length conditioning for the local model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPrompt {
    pub min_tokens: usize,
    pub max_tokens: usize,
    pub text: &'static str,
}

impl LocalPrompt {
    pub fn for_length(length: &Length) -> Self {
        let (min_tokens, max_tokens) = length.token_bounds();
        Self {
            min_tokens,
            max_tokens,
            text: length.local_prompt_text(),
        }
    }
}

/// Natural language instruction sent to the remote model along with the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInstruction(String);

impl RemoteInstruction {
    pub fn build(platform: &Platform, tone: &Tone, length: &Length, include_hashtags: bool) -> Self {
        let instruction = format!(
            "You are a world-class social media caption writer. Analyze the uploaded image and create a caption for {platform}. \n\n\
             TONE: {tone} \n\n\
             LENGTH: {length} \n\n\
             FORMAT: {format} \n\n\
             HASHTAGS: {hashtags}\n\n\
             IMPORTANT: Output ONLY the final caption text that strictly follows the specified structure. \
             Do NOT add any introductory text, explanations, or additional commentary. \
             If the format shows emojis, use 1-3 relevant emojis naturally within the text.",
            platform = platform.as_str(),
            tone = tone.style_guidance(),
            length = length.word_guidance(),
            format = platform.format_template(include_hashtags),
            hashtags = hashtag_guidance(include_hashtags),
        );
        Self(instruction)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RemoteInstruction {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod test {
    use super::{LocalPrompt, RemoteInstruction};
    use crate::policy::{Length, Platform, Tone};

    #[test]
    fn test_local_prompt() {
        let prompt = LocalPrompt::for_length(&Length::Short);
        assert_eq!((prompt.min_tokens, prompt.max_tokens), (10, 20));
        assert_eq!(prompt.text, "a photo of");

        let prompt = LocalPrompt::for_length(&Length::Long);
        assert_eq!((prompt.min_tokens, prompt.max_tokens), (30, 55));
        assert_eq!(prompt.text, "A detailed and descriptive photo of");

        assert_eq!(
            LocalPrompt::for_length(&Length::parse("enormous")),
            LocalPrompt::for_length(&Length::Medium)
        );
    }

    #[test]
    fn test_remote_instruction_sections() {
        let instruction =
            RemoteInstruction::build(&Platform::Instagram, &Tone::Funny, &Length::Short, true);
        let text = instruction.as_str();

        assert!(text.starts_with("You are a world-class social media caption writer."));
        assert!(text.contains("create a caption for instagram."));
        assert!(text.contains("TONE: Use humor, wit, and playful language to entertain."));
        assert!(text.contains("LENGTH: Keep it brief and punchy"));
        assert!(text.contains("FORMAT: REPLICATE THIS STRUCTURE EXACTLY: 📸 Instagram"));
        assert!(text.contains("HASHTAGS: Include 3-5 relevant"));
        assert!(text.contains("IMPORTANT: Output ONLY the final caption text"));
    }

    #[test]
    fn test_remote_instruction_without_hashtags() {
        let text = RemoteInstruction::build(
            &Platform::General,
            &Tone::Professional,
            &Length::Long,
            false,
        );
        assert!(text.as_str().contains("HASHTAGS: Do NOT include any hashtags."));
        assert!(text
            .as_str()
            .contains("[Caption text without prefix or hashtags]"));
    }

    #[test]
    fn test_remote_instruction_is_deterministic() {
        let build = || {
            RemoteInstruction::build(
                &Platform::parse("X"),
                &Tone::parse("creative"),
                &Length::parse("medium"),
                true,
            )
        };
        assert_eq!(build(), build());
        assert!(build().as_str().contains("🐦 Twitter (X)"));
    }

    #[test]
    fn test_unknown_options_use_defaults() {
        let unknown = RemoteInstruction::build(
            &Platform::parse("myspace"),
            &Tone::parse("grumpy"),
            &Length::parse("epic"),
            false,
        );
        let known = RemoteInstruction::build(&Platform::General, &Tone::Casual, &Length::Medium, false);

        // only the platform name differs
        assert_eq!(
            unknown.as_str().replace("myspace", "general"),
            known.as_str()
        );
    }
}
