use oauth2::{PkceCodeChallenge, PkceCodeVerifier};

/// Random verifier bytes; base64url without padding turns 64 bytes into 86 chars.
const VERIFIER_BYTES: u32 = 64;

/// RFC 7636 verifier and its S256 challenge.
#[derive(Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl std::fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkcePair")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}

pub struct PkceGenerator;

impl PkceGenerator {
    pub fn generate() -> PkcePair {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256_len(VERIFIER_BYTES);
        PkcePair {
            verifier: verifier.secret().clone(),
            challenge: challenge.as_str().to_string(),
        }
    }

    /// S256 challenge for an existing verifier.
    pub fn challenge_for(verifier: &str) -> String {
        PkceCodeChallenge::from_code_verifier_sha256(&PkceCodeVerifier::new(verifier.to_string()))
            .as_str()
            .to_string()
    }
}
