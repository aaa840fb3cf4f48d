use rand::Rng;
use serde::Serialize;

pub const REFERRAL_CODE_LEN: usize = 8;
// No 0/O or 1/I to keep codes readable aloud.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..REFERRAL_CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Codes are matched case-insensitively; surrounding whitespace is ignored.
pub fn normalize_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    let well_formed = code.len() == REFERRAL_CODE_LEN
        && code.bytes().all(|b| CODE_ALPHABET.contains(&b));
    well_formed.then_some(code)
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ShareLinks {
    pub referral_url: String,
    pub whatsapp: String,
    pub mailto: String,
}

pub fn share_links(site_url: &str, code: &str, inviter: &str) -> ShareLinks {
    let referral_url = format!("{}/signup?ref={}", site_url.trim_end_matches('/'), code);
    let message = format!(
        "{inviter} invited you to join our community for people living with tetraplegia and those who support them. Sign up here: {referral_url}"
    );
    let subject = format!("{inviter} invited you to join the community");

    ShareLinks {
        whatsapp: format!("https://wa.me/?text={}", urlencoding::encode(&message)),
        mailto: format!(
            "mailto:?subject={}&body={}",
            urlencoding::encode(&subject),
            urlencoding::encode(&message)
        ),
        referral_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_well_formed() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(normalize_code(&code), Some(code));
        }
    }

    #[test]
    fn normalize_code_accepts_lowercase_and_rejects_junk() {
        assert_eq!(normalize_code(" abcd2345 "), Some("ABCD2345".to_string()));
        assert_eq!(normalize_code("ABC"), None);
        assert_eq!(normalize_code("ABCD0123"), None);
    }

    #[test]
    fn share_links_embed_encoded_referral_url() {
        let links = share_links("https://example.org/", "ABCD2345", "Ana");
        assert_eq!(links.referral_url, "https://example.org/signup?ref=ABCD2345");
        assert!(links.whatsapp.starts_with("https://wa.me/?text=Ana%20invited"));
        assert!(links
            .whatsapp
            .contains("https%3A%2F%2Fexample.org%2Fsignup%3Fref%3DABCD2345"));
        assert!(links.mailto.starts_with("mailto:?subject=Ana%20invited"));
        assert!(links.mailto.contains("&body="));
    }
}
