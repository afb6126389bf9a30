use super::*;

fn context(content: &str, kind: Option<&str>) -> String {
    enriched_barcode_context(content, kind)
}

#[test]
fn url_strips_www_and_names_known_service() {
    let result = context("https://www.youtube.com/watch?v=abc", Some("URL"));
    assert!(result.contains("Domain: youtube.com"), "{result}");
    assert!(result.contains("Known service: YouTube"), "{result}");
    assert!(result.contains("video page"), "{result}");
}

#[test]
fn url_domain_present_for_unknown_host() {
    let result = context("https://myrandomsite.io/foo", Some("URL"));
    assert_eq!(result, "- Domain: myrandomsite.io");
}

#[test]
fn url_scheme_is_case_insensitive() {
    let result = context("HTTPS://WWW.GitHub.com/user/repo", None);
    assert!(result.contains("Domain: github.com"), "{result}");
    assert!(result.contains("GitHub (code hosting)"), "{result}");
}

#[test]
fn url_tld_categories() {
    assert!(context("https://cs.mit.edu/courses", Some("URL")).contains("Educational"));
    assert!(context("https://www.ox.ac/", Some("URL")).contains("Educational"));
    assert!(context("https://data.gov/datasets", Some("URL")).contains("Government"));
    assert!(context("https://wikipedia.org/wiki/Test", Some("URL")).contains("Non-profit"));
}

#[test]
fn known_service_lookup_matches_whole_host() {
    let facts = classify("https://www.example.org.github.com/", None);
    assert_eq!(facts, vec!["Domain: example.org.github.com".to_string()]);

    let facts = classify("https://bit.ly/abc123", None);
    assert_eq!(
        facts,
        vec![
            "Domain: bit.ly".to_string(),
            "Known service: Shortened URL (Bitly)".to_string()
        ]
    );
}

#[test]
fn url_path_hints() {
    assert!(context("https://www.amazon.com/dp/B08XYZ123", None).contains("product page"));
    assert!(context("https://shop.example.com/invoice/12345", None).contains("invoice"));
    assert!(context("https://shop.example.com/receipt/r123", None).contains("receipt"));
    assert!(context("https://tickets.example.com/event/fest", None).contains("event"));
    assert!(context("https://concerts.example.com/ticket/99", None).contains("ticket"));
    assert!(context("https://restaurant.example.com/menu", None).contains("restaurant menu"));
    assert!(context("https://example.com/video/abc123", None).contains("video"));
}

#[test]
fn unparseable_url_yields_no_facts() {
    assert_eq!(context("http://", Some("URL")), "");
    assert_eq!(context("https://exa mple.com/", Some("URL")), "");
}

#[test]
fn wifi_extracts_ssid_and_security() {
    let result = context("WIFI:T:WPA2;S:HomeNetwork;P:secret;;", Some("Wi-Fi"));
    assert!(result.contains("Network name (SSID): HomeNetwork"), "{result}");
    assert!(result.contains("Security type: WPA2"), "{result}");
    assert!(!result.contains("secret"), "{result}");
}

#[test]
fn wifi_honours_escaped_separators() {
    let facts = classify(r"WIFI:S:Cafe\;Guest;T:WEP;P:x;;", None);
    assert_eq!(
        facts,
        vec![
            "Network name (SSID): Cafe;Guest".to_string(),
            "Security type: WEP".to_string()
        ]
    );
}

#[test]
fn wifi_without_fields_is_empty() {
    assert_eq!(context("WIFI:;;", None), "");
    assert_eq!(context("WIFI:S:;T:nopass;;", None), "- Security type: nopass");
}

#[test]
fn vcard_fields_extracted() {
    let vcard = "BEGIN:VCARD\nVERSION:3.0\nFN:Jane Doe\nORG:Acme Corp\nTITLE:Engineer\nEND:VCARD";
    let facts = classify(vcard, Some("Contact"));
    assert_eq!(
        facts,
        vec![
            "Contact name: Jane Doe".to_string(),
            "Organization: Acme Corp".to_string(),
            "Job title: Engineer".to_string(),
        ]
    );
}

#[test]
fn vcard_handles_crlf_and_lowercase_prefixes() {
    let vcard = "begin:vcard\r\nfn:John Smith\r\norg:Widgets\r\nend:vcard";
    let facts = classify(vcard, None);
    assert_eq!(
        facts,
        vec![
            "Contact name: John Smith".to_string(),
            "Organization: Widgets".to_string(),
        ]
    );
}

#[test]
fn vevent_extracts_summary_and_location() {
    let vevent = "BEGIN:VEVENT\nSUMMARY:Team Meeting\nLOCATION:Office\nEND:VEVENT";
    let result = context(vevent, Some("Calendar"));
    assert!(result.contains("Event title: Team Meeting"));
    assert!(result.contains("Event location: Office"));

    let summary_only = context("BEGIN:VEVENT\nSUMMARY:Standup\nEND:VEVENT", None);
    assert_eq!(summary_only, "- Event title: Standup");
}

#[test]
fn mailto_extracts_domain() {
    assert_eq!(
        context("mailto:user@company.com", Some("Email")),
        "- Email domain: company.com"
    );
    assert_eq!(
        context("mailto:user@bigcorp.com?subject=Hi", Some("Email")),
        "- Email domain: bigcorp.com"
    );
    assert_eq!(context("mailto:nobody", Some("Email")), "");
}

#[test]
fn phone_country_from_calling_code() {
    let cases = [
        ("tel:+34912345678", "Spain"),
        ("tel:+442012345678", "UK"),
        ("tel:+33123456789", "France"),
        ("tel:+4930123456", "Germany"),
        ("tel:+39061234567", "Italy"),
        ("tel:+5511987654321", "Brazil"),
        ("tel:+8613912345678", "China"),
        ("tel:+81312345678", "Japan"),
        ("tel:+82212345678", "South Korea"),
        ("tel:+911234567890", "India"),
        ("tel:+12125551234", "US/Canada"),
        ("tel:+74951234567", "Russia"),
        ("tel:+61291234567", "Australia"),
        ("tel:+525512345678", "Mexico"),
    ];
    for (input, country) in cases {
        assert_eq!(context(input, Some("Phone")), format!("- Country: {country}"));
    }
}

#[test]
fn phone_without_known_prefix_is_empty() {
    assert_eq!(context("tel:+9991234567", Some("Phone")), "");
    assert_eq!(context("tel:912345678", Some("Phone")), "");
}

#[test]
fn isbn_detected_by_hint_or_prefix() {
    assert_eq!(context("9780743273565", Some("ISBN")), "- Book (ISBN-13)");
    assert_eq!(context("9780743273565", None), "- Book (ISBN-13)");
    assert_eq!(context("9791234567890", None), "- Book (ISBN-13)");
    assert_eq!(context("9771234567890", None), "");
}

#[test]
fn isbn_prefix_wins_over_product_hint() {
    assert_eq!(
        detect_category("9780743273565", Some("Product")),
        Some(ContentCategory::Isbn)
    );
}

#[test]
fn product_origin_from_gs1_prefix() {
    let cases = [
        ("0123456789012", "USA/Canada"),
        ("01234567", "USA/Canada"),
        ("0301234567890", "France"),
        ("0401234567890", "Germany"),
        ("0491234567890", "Japan"),
        ("0501234567890", "UK"),
        ("5201234567890", "Greece"),
        ("5601234567890", "Portugal"),
        ("5901234567890", "Poland"),
        ("6001234567890", "South Africa"),
        ("6901234567890", "China"),
        ("7012345678901", "Nordic countries"),
        ("8001234567890", "Italy"),
        ("8412345678901", "Spain"),
    ];
    for (input, origin) in cases {
        assert_eq!(
            context(input, Some("Product")),
            format!("- Product origin: {origin}"),
            "input {input}"
        );
    }
}

#[test]
fn product_requires_hint_digits_and_length() {
    assert_eq!(context("9991234567890", Some("Product")), "");
    assert_eq!(context("0123456789012", None), "");
    assert_eq!(context("012345", Some("Product")), "");
    assert_eq!(context("012345678901234", Some("Product")), "");
    assert_eq!(context("01234A6789012", Some("Product")), "");
}

#[test]
fn plain_text_and_empty_yield_empty_string() {
    assert_eq!(context("Hello world", Some("Text")), "");
    assert_eq!(context("", Some("Text")), "");
    assert_eq!(context("12345", Some("Text")), "");
    assert_eq!(detect_category("Hello world", Some("Text")), None);
}

#[test]
fn only_first_matching_category_fires() {
    let payload = "https://example.com/?q=WIFI:S:Net;";
    assert_eq!(detect_category(payload, None), Some(ContentCategory::Url));
    let facts = classify(payload, None);
    assert!(facts.iter().all(|fact| !fact.contains("SSID")));
}

#[test]
fn format_facts_prefixes_bullets() {
    let facts = vec!["A".to_string(), "B".to_string()];
    assert_eq!(format_facts(&facts), "- A\n- B");
    assert_eq!(format_facts(&[]), "");
}
