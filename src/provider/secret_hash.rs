use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// `SECRET_HASH` parameter that binds a user-pool request to an app client:
/// base64(HMAC-SHA256(client_secret, username || client_id)).
#[must_use]
#[allow(clippy::expect_used)]
pub fn secret_hash(username: &str, client_id: &str, client_secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(client_secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(username.as_bytes());
    mac.update(client_id.as_bytes());
    Base64::encode_string(&mac.finalize().into_bytes())
}
