//! TelemetryRecord - one DNS query event carried inside a batch payload
//!
//! Every key is optional on decode and `null` reads as the zero value. Keys
//! this struct does not know about are kept in `other` so a decode/encode
//! cycle loses nothing.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::ContractError;

/// Decoded DNS query telemetry event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(deserialize_with = "null_as_default")]
    pub query_time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub query_address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub query_port: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub response_time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub response_address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub response_port: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub response_zone: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ecs_net: String,
    #[serde(deserialize_with = "null_as_default")]
    pub identity: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_as_default")]
    pub socket_family: String,
    #[serde(deserialize_with = "null_as_default")]
    pub socket_protocol: String,
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub extra: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tld: String,
    #[serde(rename = "2ld", deserialize_with = "null_as_default")]
    pub second_level_domain: String,
    #[serde(rename = "3ld", deserialize_with = "null_as_default")]
    pub third_level_domain: String,
    #[serde(rename = "4ld", deserialize_with = "null_as_default")]
    pub fourth_level_domain: String,
    #[serde(deserialize_with = "null_as_default")]
    pub qname: String,
    #[serde(deserialize_with = "null_as_default")]
    pub qclass: String,
    #[serde(deserialize_with = "null_as_default")]
    pub qtype: String,
    #[serde(deserialize_with = "null_as_default")]
    pub message_size: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub txid: u16,
    #[serde(deserialize_with = "null_as_default")]
    pub rcode: String,
    #[serde(deserialize_with = "null_as_default")]
    pub aa: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub tc: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub rd: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub ra: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub ad: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub cd: bool,

    /// Keys not covered above
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl TelemetryRecord {
    /// Decode a batch payload (JSON array of records)
    pub fn decode_batch(payload: &[u8]) -> Result<Vec<Self>, ContractError> {
        serde_json::from_slice(payload).map_err(|e| ContractError::payload_decode(e.to_string()))
    }

    /// Field values under the names used by line templates
    pub fn template_fields(&self) -> [(&'static str, Value); 31] {
        [
            ("Timestamp", self.timestamp.clone().into()),
            ("QueryTime", self.query_time.clone().into()),
            ("QueryAddress", self.query_address.clone().into()),
            ("QueryPort", self.query_port.into()),
            ("ResponseTime", self.response_time.clone().into()),
            ("ResponseAddress", self.response_address.clone().into()),
            ("ResponsePort", self.response_port.into()),
            ("ResponseZone", self.response_zone.clone().into()),
            ("EcsNet", self.ecs_net.clone().into()),
            ("Identity", self.identity.clone().into()),
            ("Type", self.kind.clone().into()),
            ("SocketFamily", self.socket_family.clone().into()),
            ("SocketProtocol", self.socket_protocol.clone().into()),
            ("Version", self.version.clone().into()),
            ("Extra", self.extra.clone().into()),
            ("TopLevelDomainName", self.tld.clone().into()),
            ("SecondLevelDomainName", self.second_level_domain.clone().into()),
            ("ThirdLevelDomainName", self.third_level_domain.clone().into()),
            ("FourthLevelDomainName", self.fourth_level_domain.clone().into()),
            ("Qname", self.qname.clone().into()),
            ("Qclass", self.qclass.clone().into()),
            ("Qtype", self.qtype.clone().into()),
            ("MessageSize", self.message_size.into()),
            ("Txid", self.txid.into()),
            ("Rcode", self.rcode.clone().into()),
            ("AA", self.aa.into()),
            ("TC", self.tc.into()),
            ("RD", self.rd.into()),
            ("RA", self.ra.into()),
            ("AD", self.ad.into()),
            ("CD", self.cd.into()),
        ]
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
