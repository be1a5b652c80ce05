use crate::model::Source;

const PATTERNS: [(Source, &[&str]); 3] = [
    (Source::YouTube, &["youtube.com", "youtu.be"]),
    (Source::TikTok, &["tiktok.com"]),
    (Source::Instagram, &["instagram.com/reel"]),
];

/// Returns the provider a URL belongs to, or `None` when no pattern matches.
///
/// First match wins, so a TikTok link that embeds a YouTube URL in its query
/// string is still classified as YouTube.
pub fn classify(url: &str) -> Option<Source> {
    let lower = url.to_ascii_lowercase();

    PATTERNS
        .iter()
        .find(|(_, needles)| needles.iter().any(|needle| lower.contains(needle)))
        .map(|(source, _)| *source)
}
