//! 文字檔編碼偵測
//!
//! 參照資料 CSV 與純文字發票常以 CP949 (EUC-KR) 儲存。偵測順序：
//! 1. BOM
//! 2. UTF-8 驗證
//! 3. EUC-KR (WHATWG 定義即 CP949)
//! 4. chardetng 統計偵測

use crate::utils::error::{AutomationError, Result};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, EUC_KR, UTF_8};

/// 解碼結果
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static Encoding,
}

pub fn detect_encoding(buffer: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(buffer) {
        return encoding;
    }

    if std::str::from_utf8(buffer).is_ok() {
        return UTF_8;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(buffer, true);
    detector.guess(None, true)
}

pub fn decode_bytes(buffer: &[u8]) -> Result<DecodedText> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(buffer) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&buffer[bom_len..]);
        if !had_errors {
            return Ok(DecodedText {
                text: text.into_owned(),
                encoding,
            });
        }
    }

    for encoding in [UTF_8, EUC_KR, detect_encoding(buffer)] {
        let (text, used, had_errors) = encoding.decode(buffer);
        if !had_errors {
            tracing::debug!("Decoded text as {}", used.name());
            return Ok(DecodedText {
                text: text.into_owned(),
                encoding: used,
            });
        }
        tracing::debug!("Decoding as {} produced errors, trying next", encoding.name());
    }

    Err(AutomationError::EncodingError {
        message: "could not decode text as UTF-8, CP949 or EUC-KR".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_passthrough() {
        let decoded = decode_bytes("검색어,치환어".as_bytes()).unwrap();
        assert_eq!(decoded.encoding, UTF_8);
        assert_eq!(decoded.text, "검색어,치환어");
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("HWPX,한글".as_bytes());
        let decoded = decode_bytes(&bytes).unwrap();
        assert_eq!(decoded.text, "HWPX,한글");
    }

    #[test]
    fn test_cp949_is_detected() {
        let (encoded, _, _) = EUC_KR.encode("구용어,신용어\n클라우드,구름컴퓨팅\n");
        let decoded = decode_bytes(&encoded).unwrap();
        assert_eq!(decoded.text, "구용어,신용어\n클라우드,구름컴퓨팅\n");
    }
}
