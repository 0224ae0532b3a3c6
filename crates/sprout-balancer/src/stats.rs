//! Typed view of the balancer's native stats document.
//!
//! The document carries one entry per frontend, backend, and server.
//! Only the fields the controller reads are modeled; everything else is
//! ignored during deserialization.

use serde::Deserialize;

/// The native stats document: a mapping with a `stats` sequence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NativeStats {
    #[serde(default)]
    pub stats: Vec<StatEntry>,
}

/// One entry in the stats sequence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatEntry {
    /// Entry kind: "frontend", "backend", "server", ...
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stats: StatCounters,
}

/// The counters nested inside an entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatCounters {
    /// Average response time in milliseconds. Zero when the backend
    /// has seen no traffic in the measurement window.
    #[serde(default)]
    pub rtime: Option<f64>,
}

impl NativeStats {
    /// Response time of the named backend, if it appears in the document.
    ///
    /// Returns `None` when the backend entry is absent or carries no
    /// `rtime` counter.
    pub fn backend_rtime(&self, backend: &str) -> Option<u64> {
        self.stats
            .iter()
            .find(|e| e.kind == "backend" && e.name == backend)
            .and_then(|e| e.stats.rtime)
            .map(|r| r as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "stats": [
            {
                "type": "frontend",
                "name": "http-in",
                "stats": { "rtime": 0, "scur": 4 }
            },
            {
                "type": "backend",
                "name": "service-backend",
                "stats": { "rtime": 142, "qcur": 0, "hrsp_5xx": 1 }
            },
            {
                "type": "server",
                "name": "java-service-1",
                "backend_name": "service-backend",
                "stats": { "rtime": 140 }
            }
        ],
        "runtimeAPI": "2.9"
    }"#;

    #[test]
    fn decodes_backend_rtime() {
        let doc: NativeStats = serde_json::from_str(DOC).unwrap();
        assert_eq!(doc.backend_rtime("service-backend"), Some(142));
    }

    #[test]
    fn ignores_other_entry_types() {
        let doc: NativeStats = serde_json::from_str(DOC).unwrap();
        // The frontend reports rtime 0; the backend lookup must not
        // match it even though it comes first.
        assert_eq!(doc.backend_rtime("http-in"), None);
    }

    #[test]
    fn missing_backend_is_none() {
        let doc: NativeStats = serde_json::from_str(DOC).unwrap();
        assert_eq!(doc.backend_rtime("other-backend"), None);
    }

    #[test]
    fn tolerates_entries_without_counters() {
        let doc: NativeStats =
            serde_json::from_str(r#"{"stats": [{"type": "backend", "name": "b"}]}"#).unwrap();
        assert_eq!(doc.backend_rtime("b"), None);
    }

    #[test]
    fn tolerates_empty_document() {
        let doc: NativeStats = serde_json::from_str("{}").unwrap();
        assert_eq!(doc.backend_rtime("service-backend"), None);
    }

    #[test]
    fn fractional_rtime_truncates() {
        let doc: NativeStats = serde_json::from_str(
            r#"{"stats": [{"type": "backend", "name": "b", "stats": {"rtime": 99.7}}]}"#,
        )
        .unwrap();
        assert_eq!(doc.backend_rtime("b"), Some(99));
    }
}
