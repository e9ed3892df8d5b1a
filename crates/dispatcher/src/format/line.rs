//! Line formatter - renders a text template per record

use std::error::Error as _;

use contracts::{ContractError, TelemetryRecord};
use tera::{Context, Tera};

use crate::error::DispatcherError;

const TEMPLATE_NAME: &str = "line";

/// Renders a `tera` template against each record
///
/// Fields are exposed under their JSON keys (`qname`) and their PascalCase
/// names (`Qname`). Go-style references such as `{{ .Qname }}` are accepted.
pub struct LineFormatter {
    tera: Tera,
}

impl LineFormatter {
    /// Compile `template`
    pub fn new(template: &str) -> Result<Self, DispatcherError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, &strip_field_dots(template))
            .map_err(|e| DispatcherError::TemplateCompile {
                message: error_chain(&e),
            })?;
        Ok(Self { tera })
    }

    pub fn format(&self, record: &TelemetryRecord) -> Result<Vec<u8>, ContractError> {
        let mut context = Context::from_serialize(record)
            .map_err(|e| ContractError::format("line", error_chain(&e)))?;
        for (name, value) in record.template_fields() {
            context.insert(name, &value);
        }

        self.tera
            .render(TEMPLATE_NAME, &context)
            .map(String::into_bytes)
            .map_err(|e| ContractError::format("line", error_chain(&e)))
    }
}

/// Drop the leading `.` of field references after `{{`
fn strip_field_dots(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find("{{") {
        let (head, tail) = rest.split_at(pos + 2);
        out.push_str(head);
        let body = tail.trim_start_matches(|c: char| c == '-' || c.is_whitespace());
        out.push_str(&tail[..tail.len() - body.len()]);
        rest = body.strip_prefix('.').unwrap_or(body);
    }
    out.push_str(rest);
    out
}

// tera keeps the useful detail in the source chain
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::DEFAULT_TEMPLATE;

    fn record() -> TelemetryRecord {
        TelemetryRecord {
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            kind: "CLIENT_QUERY".to_string(),
            qname: "example.com.".to_string(),
            qclass: "IN".to_string(),
            qtype: "A".to_string(),
            query_port: 53000,
            rd: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_field_exact_bytes() {
        let formatter = LineFormatter::new("{{.Qname}}").unwrap();
        assert_eq!(formatter.format(&record()).unwrap(), b"example.com.");
    }

    #[test]
    fn test_default_template() {
        let formatter = LineFormatter::new(DEFAULT_TEMPLATE).unwrap();
        let line = String::from_utf8(formatter.format(&record()).unwrap()).unwrap();
        assert_eq!(line, "CLIENT_QUERY 2026-01-01T00:00:00Z IN A example.com.");
    }

    #[test]
    fn test_json_keys_and_numbers() {
        let formatter = LineFormatter::new("{{ qname }}:{{ QueryPort }} rd={{ RD }}").unwrap();
        let line = String::from_utf8(formatter.format(&record()).unwrap()).unwrap();
        assert_eq!(line, "example.com.:53000 rd=true");
    }

    #[test]
    fn test_no_html_escaping() {
        let formatter = LineFormatter::new("{{ .Qname }}").unwrap();
        let record = TelemetryRecord {
            qname: "<a&b>.".to_string(),
            ..Default::default()
        };
        assert_eq!(formatter.format(&record).unwrap(), b"<a&b>.");
    }

    #[test]
    fn test_unknown_field_fails_per_record() {
        let formatter = LineFormatter::new("{{ .NoSuchField }}").unwrap();
        let err = formatter.format(&record()).unwrap_err();
        assert!(matches!(err, ContractError::Format { formatter: "line", .. }));
    }

    #[test]
    fn test_compile_error() {
        assert!(LineFormatter::new("{% if %}").is_err());
    }

    #[test]
    fn test_strip_field_dots() {
        assert_eq!(strip_field_dots("{{.A}} {{ .B }}"), "{{A}} {{ B }}");
        assert_eq!(strip_field_dots("{{- .A -}}"), "{{- A -}}");
        assert_eq!(strip_field_dots("a.b {{ c.d }}"), "a.b {{ c.d }}");
        assert_eq!(strip_field_dots("no tags"), "no tags");
    }
}
