//! DNS formatter - re-encodes the question section as a query message

use std::str::FromStr;

use contracts::{ContractError, TelemetryRecord};
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name, RecordType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};

/// Builds a wire-format query from `qname`/`qtype`, class IN, random ID
#[derive(Debug, Clone, Copy)]
pub struct DnsFormatter {
    recursion_desired: bool,
}

impl DnsFormatter {
    pub fn new(recursion_desired: bool) -> Self {
        Self { recursion_desired }
    }

    pub fn format(&self, record: &TelemetryRecord) -> Result<Vec<u8>, ContractError> {
        let name = Name::from_str(&record.qname).map_err(|e| {
            ContractError::format("dns", format!("invalid qname `{}`: {e}", record.qname))
        })?;
        let query_type = RecordType::from_str(&record.qtype).map_err(|e| {
            ContractError::format("dns", format!("unknown qtype `{}`: {e}", record.qtype))
        })?;

        let mut query = Query::new();
        query.set_name(name);
        query.set_query_type(query_type);
        query.set_query_class(DNSClass::IN);

        let mut message = Message::new(fastrand::u16(..), MessageType::Query, OpCode::Query);
        message.set_recursion_desired(self.recursion_desired);
        message.add_query(query);

        let mut buf = Vec::with_capacity(512);
        let mut encoder = BinEncoder::new(&mut buf);
        message
            .emit(&mut encoder)
            .map_err(|e| ContractError::format("dns", format!("failed to make DNS request: {e}")))?;
        Ok(buf)
    }
}
