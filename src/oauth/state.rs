use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::CastorError;
use crate::types::OAuthState;

/// Compact wire form carried in the `state` query parameter.
#[derive(Serialize, Deserialize)]
struct WireState {
    v: String,
    p: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    h: Option<String>,
    n: String,
}

/// Reversible encoding of [`OAuthState`] into the OAuth `state` parameter.
///
/// Integrity is not protected here; the manager only honours nonces it issued.
pub struct OAuthStateCodec;

impl OAuthStateCodec {
    pub fn encode(state: &OAuthState) -> String {
        let wire = WireState {
            v: state.verifier.clone(),
            p: state.provider_id.clone(),
            h: state.project_id_hint.clone(),
            n: state.nonce.clone(),
        };
        // Serializing a struct of strings cannot fail.
        let json = serde_json::to_vec(&wire).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(raw: &str) -> Result<OAuthState, CastorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw.trim())
            .map_err(|err| CastorError::InvalidCallback(format!("state is not base64url: {err}")))?;
        let wire: WireState = serde_json::from_slice(&bytes)
            .map_err(|err| CastorError::InvalidCallback(format!("state is not valid JSON: {err}")))?;

        if wire.v.is_empty() || wire.p.is_empty() || wire.n.is_empty() {
            return Err(CastorError::InvalidCallback(
                "state is missing verifier, provider or nonce".to_string(),
            ));
        }

        Ok(OAuthState {
            verifier: wire.v,
            provider_id: wire.p,
            project_id_hint: wire.h.filter(|hint| !hint.is_empty()),
            nonce: wire.n,
        })
    }
}
