//! Clipping prompts to the CLIP text encoder's context window.
//!
//! Tokenization failures never surface as errors here: the prompt is cut to
//! a fixed number of characters instead and generation carries on.

use anyhow::{Error, Result};
use tokenizers::Tokenizer;

/// CLIP's context window, start and end tokens included.
pub const MAX_PROMPT_TOKENS: usize = 77;

/// Characters kept when the tokenizer cannot process a prompt.
const FALLBACK_CHARS: usize = 100;

pub trait PromptTokenizer: Send + Sync {
    /// Token ids for `text`, special tokens included.
    fn encode_ids(&self, text: &str) -> Result<Vec<u32>>;

    /// Text for `ids`, special tokens skipped.
    fn decode_ids(&self, ids: &[u32]) -> Result<String>;
}

impl PromptTokenizer for Tokenizer {
    fn encode_ids(&self, text: &str) -> Result<Vec<u32>> {
        Ok(self
            .encode(text, true)
            .map_err(Error::msg)?
            .get_ids()
            .to_vec())
    }

    fn decode_ids(&self, ids: &[u32]) -> Result<String> {
        self.decode(ids, true).map_err(Error::msg)
    }
}

impl<T: PromptTokenizer + ?Sized> PromptTokenizer for std::sync::Arc<T> {
    fn encode_ids(&self, text: &str) -> Result<Vec<u32>> {
        (**self).encode_ids(text)
    }

    fn decode_ids(&self, ids: &[u32]) -> Result<String> {
        (**self).decode_ids(ids)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationKind {
    Unchanged,
    Tokens,
    CharacterFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    pub prompt: String,
    pub token_count: usize,
    pub kind: TruncationKind,
}

impl Truncation {
    pub fn was_truncated(&self) -> bool {
        self.kind != TruncationKind::Unchanged
    }
}

/// Fits `prompt` into `max_tokens`. Over-long prompts keep their first
/// `max_tokens - 1` ids, decoded back to text.
pub fn truncate_prompt<T>(tokenizer: &T, prompt: &str, max_tokens: usize) -> Truncation
where
    T: PromptTokenizer + ?Sized,
{
    match try_truncate(tokenizer, prompt, max_tokens) {
        Ok(truncation) => truncation,
        Err(e) => {
            tracing::error!("Error truncating prompt: {e:#}");
            let fallback: String = prompt.chars().take(FALLBACK_CHARS).collect();
            let token_count = tokenizer
                .encode_ids(&fallback)
                .map(|ids| ids.len())
                .unwrap_or_default();
            Truncation {
                prompt: fallback,
                token_count,
                kind: TruncationKind::CharacterFallback,
            }
        }
    }
}

fn try_truncate<T>(tokenizer: &T, prompt: &str, max_tokens: usize) -> Result<Truncation>
where
    T: PromptTokenizer + ?Sized,
{
    let ids = tokenizer.encode_ids(prompt)?;
    let token_count = ids.len();
    if token_count <= max_tokens {
        tracing::info!(
            "Prompt unchanged: {token_count} tokens ({} chars)",
            prompt.chars().count()
        );
        return Ok(Truncation {
            prompt: prompt.to_string(),
            token_count,
            kind: TruncationKind::Unchanged,
        });
    }

    let keep = max_tokens.saturating_sub(1);
    let truncated = tokenizer.decode_ids(&ids[..keep])?;
    tracing::info!(
        "Prompt truncated from {token_count} tokens ({} chars) to {keep} tokens ({} chars)",
        prompt.chars().count(),
        truncated.chars().count()
    );
    Ok(Truncation {
        prompt: truncated,
        token_count: keep,
        kind: TruncationKind::Tokens,
    })
}
