//! Client-side classification of barcode payloads.
//!
//! Recognizes a handful of well-known payload shapes (URLs, Wi-Fi configs,
//! vCards, calendar events, mail/phone URIs, book and product numbers) and
//! turns them into short facts that give the model something concrete to work
//! with. Everything here is a total function over strings: unknown or malformed
//! input simply yields no facts.
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use url::Url;

/// Payload families the classifier knows about, in dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    Url,
    Wifi,
    Contact,
    Event,
    Email,
    Phone,
    Isbn,
    Product,
}

impl std::fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url => write!(f, "url"),
            Self::Wifi => write!(f, "wifi"),
            Self::Contact => write!(f, "contact"),
            Self::Event => write!(f, "event"),
            Self::Email => write!(f, "email"),
            Self::Phone => write!(f, "phone"),
            Self::Isbn => write!(f, "isbn"),
            Self::Product => write!(f, "product"),
        }
    }
}

static VCARD_NAME: LazyLock<Regex> = LazyLock::new(|| line_field("FN"));
static VCARD_ORG: LazyLock<Regex> = LazyLock::new(|| line_field("ORG"));
static VCARD_TITLE: LazyLock<Regex> = LazyLock::new(|| line_field("TITLE"));
static EVENT_SUMMARY: LazyLock<Regex> = LazyLock::new(|| line_field("SUMMARY"));
static EVENT_LOCATION: LazyLock<Regex> = LazyLock::new(|| line_field("LOCATION"));

fn line_field(name: &str) -> Regex {
    Regex::new(&format!(r"(?mi)^{name}:(.+)$")).expect("static field regex")
}

/// Maps lowercase hostnames to a brief service description.
const KNOWN_SERVICES: &[(&str, &str)] = &[
    ("amazon.com", "Amazon (online shopping)"),
    ("amazon.co.uk", "Amazon UK (online shopping)"),
    ("amazon.de", "Amazon DE (online shopping)"),
    ("amazon.es", "Amazon ES (online shopping)"),
    ("amazon.fr", "Amazon FR (online shopping)"),
    ("amzn.to", "Amazon (short link)"),
    ("youtube.com", "YouTube (video platform)"),
    ("youtu.be", "YouTube (video platform)"),
    ("spotify.com", "Spotify (music streaming)"),
    ("netflix.com", "Netflix (video streaming)"),
    ("linkedin.com", "LinkedIn (professional network)"),
    ("facebook.com", "Facebook (social media)"),
    ("fb.com", "Facebook (social media)"),
    ("instagram.com", "Instagram (photo sharing)"),
    ("twitter.com", "Twitter/X (social media)"),
    ("x.com", "Twitter/X (social media)"),
    ("github.com", "GitHub (code hosting)"),
    ("paypal.com", "PayPal (payment)"),
    ("apple.com", "Apple"),
    ("apps.apple.com", "Apple App Store"),
    ("play.google.com", "Google Play Store"),
    ("maps.google.com", "Google Maps"),
    ("wa.me", "WhatsApp (messaging)"),
    ("t.me", "Telegram (messaging)"),
    ("bit.ly", "Shortened URL (Bitly)"),
    ("tinyurl.com", "Shortened URL (TinyURL)"),
    ("goo.gl", "Shortened URL (Google)"),
    ("t.co", "Shortened URL (Twitter/X)"),
];

/// E.164 calling codes. Entries are prefix-disjoint, so order does not matter.
const CALLING_CODES: &[(&str, &str)] = &[
    ("1", "US/Canada"),
    ("44", "UK"),
    ("33", "France"),
    ("34", "Spain"),
    ("39", "Italy"),
    ("49", "Germany"),
    ("55", "Brazil"),
    ("86", "China"),
    ("81", "Japan"),
    ("82", "South Korea"),
    ("91", "India"),
    ("7", "Russia"),
    ("61", "Australia"),
    ("52", "Mexico"),
];

/// GS1 prefix ranges over the first three digits read as an integer.
/// Explicit three-digit entries come before the broad blocks they sit in.
const GS1_RANGES: &[(u16, u16, &str)] = &[
    (0, 19, "USA/Canada"),
    (30, 37, "France"),
    (40, 44, "Germany"),
    (45, 49, "Japan"),
    (50, 59, "UK"),
    (520, 521, "Greece"),
    (560, 560, "Portugal"),
    (590, 590, "Poland"),
    (600, 601, "South Africa"),
    (690, 699, "China"),
    (700, 799, "Nordic countries"),
    (800, 839, "Italy"),
    (840, 849, "Spain"),
];

/// Pick the single category a payload belongs to, if any.
pub fn detect_category(content: &str, kind_hint: Option<&str>) -> Option<ContentCategory> {
    if has_prefix_ignore_case(content, "http://") || has_prefix_ignore_case(content, "https://")
    {
        return Some(ContentCategory::Url);
    }
    if has_prefix_ignore_case(content, "WIFI:") {
        return Some(ContentCategory::Wifi);
    }
    if has_prefix_ignore_case(content, "BEGIN:VCARD") {
        return Some(ContentCategory::Contact);
    }
    if has_prefix_ignore_case(content, "BEGIN:VEVENT") {
        return Some(ContentCategory::Event);
    }
    if has_prefix_ignore_case(content, "mailto:") {
        return Some(ContentCategory::Email);
    }
    if has_prefix_ignore_case(content, "tel:") {
        return Some(ContentCategory::Phone);
    }
    if kind_hint == Some("ISBN") || is_isbn13(content) {
        return Some(ContentCategory::Isbn);
    }
    if kind_hint == Some("Product")
        && (7..=14).contains(&content.len())
        && is_all_digits(content)
    {
        return Some(ContentCategory::Product);
    }
    None
}

/// Extract human-readable facts from a payload. Never fails.
pub fn classify(content: &str, kind_hint: Option<&str>) -> Vec<String> {
    let Some(category) = detect_category(content, kind_hint) else {
        return Vec::new();
    };
    match category {
        ContentCategory::Url => url_facts(content),
        ContentCategory::Wifi => wifi_facts(&content["WIFI:".len()..]),
        ContentCategory::Contact => [
            (&*VCARD_NAME, "Contact name"),
            (&*VCARD_ORG, "Organization"),
            (&*VCARD_TITLE, "Job title"),
        ]
        .into_iter()
        .filter_map(|(pattern, label)| labelled_field(pattern, content, label))
        .collect(),
        ContentCategory::Event => [
            (&*EVENT_SUMMARY, "Event title"),
            (&*EVENT_LOCATION, "Event location"),
        ]
        .into_iter()
        .filter_map(|(pattern, label)| labelled_field(pattern, content, label))
        .collect(),
        ContentCategory::Email => email_domain(&content["mailto:".len()..])
            .map(|domain| vec![format!("Email domain: {domain}")])
            .unwrap_or_default(),
        ContentCategory::Phone => country_from_phone_prefix(&content["tel:".len()..])
            .map(|country| vec![format!("Country: {country}")])
            .unwrap_or_default(),
        ContentCategory::Isbn => vec!["Book (ISBN-13)".to_string()],
        ContentCategory::Product => ean_country_hint(content)
            .map(|origin| vec![format!("Product origin: {origin}")])
            .unwrap_or_default(),
    }
}

/// Facts rendered as a bullet list, or an empty string when there are none.
pub fn enriched_barcode_context(content: &str, kind_hint: Option<&str>) -> String {
    format_facts(&classify(content, kind_hint))
}

pub fn format_facts(facts: &[String]) -> String {
    facts
        .iter()
        .map(|fact| format!("- {fact}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn url_facts(content: &str) -> Vec<String> {
    let Ok(url) = Url::parse(content) else {
        return Vec::new();
    };
    let mut facts = Vec::new();

    if let Some(host) = url.host_str().filter(|host| !host.is_empty()) {
        let host = host.strip_prefix("www.").unwrap_or(host).to_ascii_lowercase();
        facts.push(format!("Domain: {host}"));
        match known_service(&host) {
            Some(service) => facts.push(format!("Known service: {service}")),
            None => match host.rsplit('.').next() {
                Some("edu" | "ac") => facts.push("Educational institution".to_string()),
                Some("gov") => facts.push("Government website".to_string()),
                Some("org") => facts.push("Non-profit or open organisation".to_string()),
                _ => {}
            },
        }
    }

    if let Some(hint) = path_hint(url.path()) {
        facts.push(hint.to_string());
    }
    facts
}

fn known_service(host: &str) -> Option<&'static str> {
    KNOWN_SERVICES
        .iter()
        .find(|(known, _)| *known == host)
        .map(|(_, service)| *service)
}

fn path_hint(path: &str) -> Option<&'static str> {
    let has = |needles: &[&str]| needles.iter().any(|needle| path.contains(needle));
    if has(&["/dp/", "/product/"]) {
        Some("Likely a product page")
    } else if has(&["/invoice", "/receipt"]) {
        Some("Likely an invoice or receipt")
    } else if has(&["/event", "/ticket"]) {
        Some("Likely an event or ticket")
    } else if has(&["/menu"]) {
        Some("Likely a restaurant menu")
    } else if has(&["/watch", "/video"]) {
        Some("Likely a video page")
    } else {
        None
    }
}

fn wifi_facts(body: &str) -> Vec<String> {
    let fields = wifi_fields(body);
    let value_of = |key: &str| {
        fields
            .iter()
            .find(|(field_key, value)| field_key == key && !value.is_empty())
            .map(|(_, value)| value.clone())
    };

    let mut facts = Vec::new();
    if let Some(ssid) = value_of("S") {
        facts.push(format!("Network name (SSID): {ssid}"));
    }
    if let Some(security) = value_of("T") {
        facts.push(format!("Security type: {security}"));
    }
    facts
}

/// Split a `WIFI:` body into `(key, value)` pairs on unescaped `;`.
fn wifi_fields(body: &str) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (idx, ch) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            ';' => {
                push_wifi_field(&mut fields, &body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    push_wifi_field(&mut fields, &body[start..]);
    fields
}

fn push_wifi_field(fields: &mut Vec<(String, String)>, raw: &str) {
    if let Some((key, value)) = raw.split_once(':') {
        fields.push((key.to_string(), unescape_wifi(value)));
    }
}

fn unescape_wifi(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

fn labelled_field(pattern: &Regex, content: &str, label: &str) -> Option<String> {
    let value = pattern.captures(content)?.get(1)?.as_str().trim();
    if value.is_empty() {
        return None;
    }
    Some(format!("{label}: {value}"))
}

fn email_domain(address: &str) -> Option<&str> {
    let address = address.split('?').next().unwrap_or_default();
    let (_, domain) = address.split_once('@')?;
    let domain = domain.trim();
    (!domain.is_empty()).then_some(domain)
}

fn country_from_phone_prefix(number: &str) -> Option<&'static str> {
    let digits = number.trim().strip_prefix('+')?;
    CALLING_CODES
        .iter()
        .find(|(code, _)| digits.starts_with(code))
        .map(|(_, country)| *country)
}

fn ean_country_hint(code: &str) -> Option<&'static str> {
    let prefix: u16 = code.get(..3)?.parse().ok()?;
    GS1_RANGES
        .iter()
        .find(|(low, high, _)| (*low..=*high).contains(&prefix))
        .map(|(_, _, origin)| *origin)
}

fn is_isbn13(content: &str) -> bool {
    content.len() == 13
        && is_all_digits(content)
        && (content.starts_with("978") || content.starts_with("979"))
}

fn is_all_digits(content: &str) -> bool {
    !content.is_empty() && content.bytes().all(|b| b.is_ascii_digit())
}

fn has_prefix_ignore_case(content: &str, prefix: &str) -> bool {
    content
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
