//! Ticket QR codes.
//!
//! The code encodes `ticket_id:<id>&hash:<hash>` where `hash` is a hex
//! HMAC-SHA256 of the ticket id under the deployment secret, so a code can
//! only be produced by someone holding that secret.

use std::io::Cursor;

use hmac::{Hmac, Mac};
use image::{ImageFormat, Luma};
use qrcode::QrCode;
use sha2::Sha256;

use crate::utils::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const MODULE_SIZE_PX: u32 = 10;

#[derive(Clone)]
pub struct QrIssuer {
    secret: Vec<u8>,
}

impl QrIssuer {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, ticket_id: i64) -> Result<HmacSha256, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::InternalServerError(format!("invalid QR secret: {e}")))?;
        mac.update(ticket_id.to_string().as_bytes());
        Ok(mac)
    }

    pub fn token(&self, ticket_id: i64) -> Result<String, AppError> {
        let tag = self.mac(ticket_id)?.finalize().into_bytes();
        Ok(hex::encode(tag))
    }

    /// Constant-time check of a hash taken from a scanned code.
    pub fn verify(&self, ticket_id: i64, hash: &str) -> bool {
        let Ok(expected) = hex::decode(hash.trim()) else {
            return false;
        };
        match self.mac(ticket_id) {
            Ok(mac) => mac.verify_slice(&expected).is_ok(),
            Err(_) => false,
        }
    }

    pub fn payload(&self, ticket_id: i64) -> Result<String, AppError> {
        Ok(format!("ticket_id:{ticket_id}&hash:{}", self.token(ticket_id)?))
    }

    /// Renders the ticket's code as a PNG image.
    pub fn issue(&self, ticket_id: i64) -> Result<Vec<u8>, AppError> {
        let payload = self.payload(ticket_id)?;
        let code = QrCode::new(payload.as_bytes())
            .map_err(|e| AppError::InternalServerError(format!("QR encoding failed: {e}")))?;
        let image = code
            .render::<Luma<u8>>()
            .quiet_zone(true)
            .module_dimensions(MODULE_SIZE_PX, MODULE_SIZE_PX)
            .build();

        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| AppError::InternalServerError(format!("PNG encoding failed: {e}")))?;
        Ok(png.into_inner())
    }
}

/// Splits a scanned `ticket_id:<id>&hash:<hash>` payload.
pub fn parse_payload(payload: &str) -> Option<(i64, String)> {
    let (id_part, hash_part) = payload.trim().split_once('&')?;
    let ticket_id = id_part.strip_prefix("ticket_id:")?.parse().ok()?;
    let hash = hash_part.strip_prefix("hash:")?;
    if hash.is_empty() {
        return None;
    }
    Some((ticket_id, hash.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_token_is_deterministic_per_secret() {
        let issuer = QrIssuer::new("secret-a");
        assert_eq!(issuer.token(5).unwrap(), issuer.token(5).unwrap());
        assert_ne!(issuer.token(5).unwrap(), issuer.token(6).unwrap());
        assert_ne!(
            issuer.token(5).unwrap(),
            QrIssuer::new("secret-b").token(5).unwrap()
        );
        assert_eq!(issuer.token(5).unwrap().len(), 64);
    }

    #[test]
    fn test_verify_accepts_own_token_only() {
        let issuer = QrIssuer::new("secret-a");
        let token = issuer.token(5).unwrap();
        assert!(issuer.verify(5, &token));
        assert!(!issuer.verify(6, &token));
        assert!(!issuer.verify(5, "not-hex"));
        assert!(!QrIssuer::new("secret-b").verify(5, &token));
    }

    #[test]
    fn test_payload_format() {
        let issuer = QrIssuer::new("secret-a");
        let payload = issuer.payload(5).unwrap();
        assert!(payload.starts_with("ticket_id:5&hash:"));
        assert_eq!(
            parse_payload(&payload),
            Some((5, issuer.token(5).unwrap()))
        );
    }

    #[test]
    fn test_parse_payload_rejects_garbage() {
        assert_eq!(parse_payload("ticket_id:x&hash:ab"), None);
        assert_eq!(parse_payload("ticket_id:5"), None);
        assert_eq!(parse_payload("ticket_id:5&hash:"), None);
    }

    #[test]
    fn test_issue_renders_png() {
        let png = QrIssuer::new("secret-a").issue(5).unwrap();
        assert!(png.len() > PNG_MAGIC.len());
        assert_eq!(&png[..8], &PNG_MAGIC);
    }
}
