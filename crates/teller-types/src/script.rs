//! Transcript script filter.
//!
//! The upstream transcription occasionally renders Urdu speech in Devanagari
//! or Gurmukhi instead of the Arabic script. Utterances containing characters
//! from either range are dropped from the transcript entirely rather than
//! recorded with the wrong script. This is a tolerance for a known
//! transcription quirk, not a language policy.

/// Devanagari Unicode block.
const DEVANAGARI: std::ops::RangeInclusive<char> = '\u{0900}'..='\u{097F}';

/// Gurmukhi Unicode block.
const GURMUKHI: std::ops::RangeInclusive<char> = '\u{0A00}'..='\u{0A7F}';

/// Returns `true` if the text contains any Devanagari or Gurmukhi character.
///
/// Callers drop such utterances before transcript recording; the text is
/// neither stored nor summarized.
pub fn contains_disallowed_script(text: &str) -> bool {
    text.chars()
        .any(|c| DEVANAGARI.contains(&c) || GURMUKHI.contains(&c))
}
