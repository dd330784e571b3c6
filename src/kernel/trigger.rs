/// Strip every whitespace character (ASCII and ideographic) and lower-case the rest.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Substring match of any trigger against the utterance, both sides normalized.
/// Empty triggers never match.
pub fn matches<S: AsRef<str>>(utterance: &str, triggers: &[S]) -> bool {
    let heard = normalize(utterance);
    triggers
        .iter()
        .map(|t| normalize(t.as_ref()))
        .any(|t| !t.is_empty() && heard.contains(&t))
}

/// Parsed trigger phrase set, built from the comma-separated setting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerMatcher {
    phrases: Vec<String>,
}

impl TriggerMatcher {
    pub fn parse(raw: &str) -> Self {
        let phrases = raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(normalize)
            .filter(|p| !p.is_empty())
            .collect();
        TriggerMatcher { phrases }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn matches(&self, utterance: &str) -> bool {
        let heard = normalize(utterance);
        self.phrases.iter().any(|p| heard.contains(p.as_str()))
    }
}
