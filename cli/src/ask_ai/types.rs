use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    ask_ai::templates::TECHNICAL_ANALYST_INSTRUCTION,
    error::{AnalystError, Result},
};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Chart snapshot plus the fixed analyst instruction, ready for a vision model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub instruction: String,
    pub image_base64: String,
}

impl AnalysisRequest {
    /// Package PNG bytes with the technical-analyst instruction.
    pub fn from_png(png: &[u8]) -> Result<Self> {
        if png.is_empty() {
            return Err(AnalystError::InvalidInput("chart snapshot is empty".to_string()));
        }
        if !png.starts_with(&PNG_SIGNATURE) {
            return Err(AnalystError::InvalidInput("chart snapshot is not a PNG image".to_string()));
        }

        Ok(Self {
            instruction: TECHNICAL_ANALYST_INSTRUCTION.to_string(),
            image_base64: STANDARD.encode(png),
        })
    }

    pub fn image_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.image_base64)
            .map_err(|e| AnalystError::InvalidInput(format!("image payload is not base64: {}", e)))
    }
}

/// Text returned by the model, unmodified, with bookkeeping for logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub id: Uuid,
    pub model: String,
    pub text: String,
    pub elapsed_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_encodes_png() {
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(b"rest-of-image");

        let request = AnalysisRequest::from_png(&png).unwrap();
        assert_eq!(request.instruction, TECHNICAL_ANALYST_INSTRUCTION);
        assert_eq!(request.image_bytes().unwrap(), png);
        assert!(request.image_base64.starts_with("iVBORw0KGgo"));
    }

    #[test]
    fn test_request_rejects_non_png() {
        assert!(matches!(AnalysisRequest::from_png(&[]), Err(AnalystError::InvalidInput(_))));
        assert!(AnalysisRequest::from_png(b"GIF89a....").is_err());
    }
}
