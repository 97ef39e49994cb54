use crate::models::Sentiment;

const POSITIVE: &[&str] = &[
    "pog", "pogchamp", "love", "hype", "lul", "kek", "ez", "nice", "huge", "king", "goat",
];
const NEGATIVE: &[&str] = &[
    "bad", "trash", "l", "toxic", "dogshit", "garbage", "f", "rip", "throw", "cringe",
];

/// Keyword sentiment of a chat line. Positive keywords are checked first.
///
/// Keywords match anywhere inside the text ("hype" hits "hyped"), except
/// one-letter keywords like `L` and `F`, which must stand alone as a word.
pub fn detect_sentiment(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    if matches_any(&lower, POSITIVE) {
        Sentiment::Positive
    } else if matches_any(&lower, NEGATIVE) {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Border classes the web overlay uses to tint a message.
pub fn sentiment_class(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Positive => "border-l-4 border-green-400",
        Sentiment::Negative => "border-l-4 border-red-500",
        Sentiment::Neutral => "",
    }
}

fn matches_any(lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| {
        if keyword.chars().count() == 1 {
            lower
                .split(|ch: char| !ch.is_alphanumeric())
                .any(|word| word == *keyword)
        } else {
            lower.contains(keyword)
        }
    })
}
