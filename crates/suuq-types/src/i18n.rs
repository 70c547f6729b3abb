use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// UI language. Somali is the default everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    So,
    En,
}

impl Language {
    /// Pick the first supported language from an `Accept-Language` value.
    /// Quality weights are honoured; ties keep header order.
    pub fn from_accept_language(header: &str) -> Self {
        let mut best: Option<(f32, Language)> = None;

        for part in header.split(',') {
            let mut pieces = part.split(';');
            let tag = pieces.next().unwrap_or_default().trim().to_ascii_lowercase();
            let quality = pieces
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);

            let primary = tag.split('-').next().unwrap_or_default();
            let lang = match primary {
                "so" => Language::So,
                "en" => Language::En,
                _ => continue,
            };

            if quality > 0.0 && best.is_none_or(|(q, _)| quality > q) {
                best = Some((quality, lang));
            }
        }

        best.map(|(_, lang)| lang).unwrap_or_default()
    }
}

/// A piece of user-facing text in both languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub so: Cow<'static, str>,
    pub en: Cow<'static, str>,
}

impl Text {
    pub const fn new(so: &'static str, en: &'static str) -> Self {
        Self {
            so: Cow::Borrowed(so),
            en: Cow::Borrowed(en),
        }
    }

    pub fn owned(so: String, en: String) -> Self {
        Self {
            so: Cow::Owned(so),
            en: Cow::Owned(en),
        }
    }

    pub fn get(&self, lang: Language) -> &str {
        match lang {
            Language::So => &self.so,
            Language::En => &self.en,
        }
    }
}

// -- Shared strings --

pub const ERROR_GENERIC: Text = Text::new("Khalad ayaa dhacay", "An error occurred");
pub const ERROR_REQUIRED_FIELDS: Text = Text::new(
    "Fadlan buuxi dhammaan goobaha muhiimka ah",
    "Please fill all required fields",
);
pub const ERROR_LOGIN_REQUIRED: Text = Text::new("Waa inaad gashaa", "You must be logged in");
pub const ERROR_ADMIN_ONLY: Text = Text::new(
    "Maamule kaliya ayaa arki kara boggan",
    "Only admins can access this page",
);
pub const ERROR_NOT_FOUND: Text = Text::new("Lama helin", "Not found");

pub const NOTICE_AD_LIVE: Text = Text::new(
    "Xayeysiiskaagu hadda wuu shaqaynayaa!",
    "Your ad is now live!",
);
pub const NOTICE_AD_IN_REVIEW: Text = Text::new(
    "Xayeysiiskaagu wuu la diray maaraynta",
    "Your boosted ad has been submitted for review",
);
pub const NOTICE_PAYMENT_IN_REVIEW: Text = Text::new(
    "Lacag bixinta waa la diray si loo hubiyo",
    "Payment submitted for approval! Your ad will be processed after payment verification.",
);
