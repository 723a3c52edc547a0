use std::fmt;
use std::str::FromStr;

/// The two languages the assistant routes between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Arabic,
    English,
}

impl Language {
    /// Detect the language of a query. Any code point in the Arabic block
    /// makes the whole text Arabic; everything else is treated as English.
    pub fn detect(text: &str) -> Self {
        if text.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c)) {
            Language::Arabic
        } else {
            Language::English
        }
    }

    /// Two-letter code used by the translation service.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Arabic => "ar",
            Language::English => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Arabic => write!(f, "arabic"),
            Language::English => write!(f, "english"),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arabic" | "ar" => Ok(Language::Arabic),
            "english" | "en" => Ok(Language::English),
            other => Err(format!("unknown language: '{}'", other)),
        }
    }
}
