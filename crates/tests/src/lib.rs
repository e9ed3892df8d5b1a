//! # Integration Tests
//!
//! Cross-crate tests that run without a NATS server:
//! - configuration to sink wiring
//! - mock bus through buffer, formatter and sink
//! - DNS replay against local sockets

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{OutputFormat, TelemetryRecord};
    use dispatcher::{create_sink, Formatter, OutputSink, RecordSink};

    #[test]
    fn test_default_template_renders_go_style_fields() {
        let config = ConfigLoader::load_from_str("[nats]\nsubject = \"dnstap\"\n", ConfigFormat::Toml)
            .unwrap();
        let formatter = Formatter::from_config(&config.output).unwrap();

        let record = TelemetryRecord {
            kind: "CLIENT_QUERY".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            qclass: "IN".to_string(),
            qtype: "A".to_string(),
            qname: "example.com.".to_string(),
            ..Default::default()
        };
        let line = String::from_utf8(formatter.format(&record).unwrap()).unwrap();
        assert_eq!(line, "CLIENT_QUERY 2026-01-01T00:00:00Z IN A example.com.");
    }

    #[test]
    fn test_config_selects_sink() {
        let dir = tempfile::tempdir().unwrap();
        let file_pattern = dir.path().join("tap-%Y%m%d.log");

        let cases = [
            ("output = \"json\"\nfilename = \"\"".to_string(), "stdout"),
            ("output = \"json\"\nfilename = \"-\"".to_string(), "discard"),
            (
                format!("filename = {:?}", file_pattern.display().to_string()),
                "file",
            ),
            (
                "output = \"dns\"\nservers = [\"127.0.0.1\"]".to_string(),
                "dns",
            ),
        ];

        for (content, expected) in cases {
            let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
            let sink = create_sink(&config.output).unwrap();
            assert_eq!(sink.name(), expected, "config: {content}");
            if expected == "dns" {
                assert_eq!(config.output.format, OutputFormat::Dns);
                assert!(matches!(sink, OutputSink::DnsForward(_)));
            }
        }
    }

    #[test]
    fn test_json_output_keeps_unknown_keys() {
        let payload = br#"[{"qname":"example.com.","qtype":"A","policy":"allow"}]"#;
        let records = TelemetryRecord::decode_batch(payload).unwrap();

        let mut config = contracts::OutputConfig::default();
        config.format = OutputFormat::Json;
        let bytes = Formatter::from_config(&config)
            .unwrap()
            .format(&records[0])
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["qname"], "example.com.");
        assert_eq!(value["policy"], "allow");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use chrono::{Local, TimeZone};
    use contracts::{Counter, OutputConfig, RecordSink, TelemetryRecord};
    use dispatcher::{Formatter, RotatingFileSink};
    use ingestion::{DropBuffer, IngestionWorker, MockBus};

    fn batch(names: &[&str]) -> String {
        let records: Vec<_> = names
            .iter()
            .map(|n| serde_json::json!({"qname": n, "qtype": "A"}))
            .collect();
        serde_json::Value::Array(records).to_string()
    }

    /// End-to-end test: MockBus -> IngestionWorker -> DropBuffer -> Formatter -> file
    #[tokio::test]
    async fn test_e2e_mock_bus_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("tap.log").display().to_string();

        let bus = MockBus::new();
        let lost = Arc::new(Counter::new());
        let received = Arc::new(Counter::new());
        let buffer = Arc::new(DropBuffer::new(16, lost.clone()));
        let mut worker = IngestionWorker::new(bus.clone(), "dnstap", buffer.clone(), received.clone());
        worker.run().await.unwrap();

        assert!(bus.publish(batch(&["a.example.", "b.example."])));
        assert!(bus.publish("garbage"));
        assert!(bus.publish(batch(&["c.example."])));

        let mut config = OutputConfig::default();
        config.template = "{{ .Qtype }} {{ .Qname }}".to_string();
        let formatter = Formatter::from_config(&config).unwrap();
        let mut sink = RotatingFileSink::new("file", pattern.as_str(), None).unwrap();

        let mut decode_failures = 0;
        for _ in 0..3 {
            let payload = tokio::time::timeout(Duration::from_secs(2), buffer.read())
                .await
                .unwrap()
                .unwrap();
            match TelemetryRecord::decode_batch(&payload) {
                Ok(records) => {
                    for record in &records {
                        sink.write(&formatter.format(record).unwrap()).await.unwrap();
                    }
                }
                Err(_) => decode_failures += 1,
            }
        }

        worker.stop().await;
        sink.close().await.unwrap();

        assert_eq!(received.get(), 3);
        assert_eq!(lost.get(), 0);
        assert_eq!(decode_failures, 1);
        let content = std::fs::read_to_string(&pattern).unwrap();
        assert_eq!(content, "A a.example.\nA b.example.\nA c.example.\n");
        assert!(bus.is_stopped());
        assert!(buffer.read().await.is_none());
    }

    /// A stalled consumer loses the oldest payloads, never the newest
    #[tokio::test]
    async fn test_overflow_keeps_newest_payloads() {
        let bus = MockBus::new();
        let lost = Arc::new(Counter::new());
        let received = Arc::new(Counter::new());
        let buffer = Arc::new(DropBuffer::new(2, lost.clone()));
        let mut worker = IngestionWorker::new(bus.clone(), "dnstap", buffer.clone(), received.clone());
        worker.run().await.unwrap();

        for i in 0..5 {
            bus.publish(Bytes::from(format!("payload-{i}")));
        }

        assert_eq!(received.get(), 5);
        assert_eq!(lost.get(), 3);
        assert_eq!(buffer.try_read().unwrap(), Bytes::from("payload-3"));
        assert_eq!(buffer.try_read().unwrap(), Bytes::from("payload-4"));
        assert!(buffer.try_read().is_none());

        worker.stop().await;
    }

    #[tokio::test]
    async fn test_file_rotation_follows_clock() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("%Y%m%d-%H.log").display().to_string();
        let ten = Local.with_ymd_and_hms(2026, 3, 1, 10, 15, 0).unwrap();
        let eleven = Local.with_ymd_and_hms(2026, 3, 1, 11, 0, 5).unwrap();

        let mut sink = RotatingFileSink::open_at("file", pattern.as_str(), None, ten).unwrap();
        sink.write_at(b"first", ten).unwrap();
        sink.write_at(b"second", eleven).unwrap();
        sink.close().await.unwrap();

        assert_eq!(sink.rotations(), 1);
        let first = std::fs::read_to_string(dir.path().join("20260301-10.log")).unwrap();
        let second = std::fs::read_to_string(dir.path().join("20260301-11.log")).unwrap();
        assert_eq!(first, "first\n");
        assert_eq!(second, "second\n");
    }
}

#[cfg(test)]
mod dns_replay_tests {
    use std::time::Duration;

    use contracts::{ContractError, RecordSink, TelemetryRecord};
    use dispatcher::{DnsForwardSink, DnsFormatter};
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, UdpSocket};

    const HEADER_LEN: usize = 12;

    fn query() -> Vec<u8> {
        let record = TelemetryRecord {
            qname: "example.com.".to_string(),
            qtype: "AAAA".to_string(),
            ..Default::default()
        };
        DnsFormatter::new(true).format(&record).unwrap()
    }

    #[tokio::test]
    async fn test_replay_over_udp_and_tcp() {
        let udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let servers = vec![
            format!("udp://{}", udp.local_addr().unwrap()),
            format!("tcp://{}", tcp.local_addr().unwrap()),
        ];
        let mut sink = DnsForwardSink::new("dns", &servers).unwrap();

        let wire = query();
        let tcp_task = tokio::spawn(async move {
            let (mut stream, _) = tcp.accept().await.unwrap();
            let len = stream.read_u16().await.unwrap() as usize;
            let mut message = vec![0u8; len];
            stream.read_exact(&mut message).await.unwrap();
            message
        });

        sink.write(&wire).await.unwrap();

        let mut datagram = [0u8; 512];
        let n = tokio::time::timeout(Duration::from_secs(2), udp.recv(&mut datagram))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&datagram[..n], wire.as_slice());
        assert!(n > HEADER_LEN);
        // RD bit
        assert_eq!(datagram[2] & 0x01, 0x01);

        let framed = tokio::time::timeout(Duration::from_secs(2), tcp_task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(framed, wire);
    }

    #[tokio::test]
    async fn test_unreachable_destination_reports_failure() {
        // Bind then drop to get a port nothing listens on
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let servers = vec![
            format!("tcp://{addr}"),
            format!("udp://{}", udp.local_addr().unwrap()),
        ];
        let mut sink = DnsForwardSink::new("dns", &servers).unwrap();

        let err = sink.write(&query()).await.unwrap_err();
        assert!(matches!(err, ContractError::ForwardFailed { total: 2, .. }), "got {err:?}");

        // The reachable destination still got its copy
        let mut datagram = [0u8; 512];
        let n = tokio::time::timeout(Duration::from_secs(2), udp.recv(&mut datagram))
            .await
            .unwrap()
            .unwrap();
        assert!(n > HEADER_LEN);
    }
}
