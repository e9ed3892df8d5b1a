//! JSON formatter

use contracts::{ContractError, TelemetryRecord};

/// Serializes the whole record as one JSON object
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format(&self, record: &TelemetryRecord) -> Result<Vec<u8>, ContractError> {
        serde_json::to_vec(record).map_err(|e| ContractError::format("json", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_decodes_to_same_record() {
        let payload = br#"[{
            "timestamp": "2026-01-01T00:00:00Z",
            "type": "CLIENT_RESPONSE",
            "qname": "example.com.",
            "qtype": "AAAA",
            "qclass": "IN",
            "2ld": "example.com.",
            "message_size": 61,
            "txid": 4242,
            "aa": true,
            "vendor_tag": {"rack": 7}
        }]"#;
        let record = TelemetryRecord::decode_batch(payload).unwrap().remove(0);

        let bytes = JsonFormatter.format(&record).unwrap();
        assert!(!bytes.contains(&b'\n'));

        let decoded: TelemetryRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.other["vendor_tag"]["rack"], 7);
    }
}
