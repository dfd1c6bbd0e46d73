//! Structured logging fallback transport.

use guesttrace_record::{EncodedRecord, RecordKind};

use super::{CoreScope, TransportSink};

/// Renders every record through `tracing`.
///
/// fcall and access records go out at `trace!`, everything else at
/// `debug!`. Useful when no observer is attached; not meant for hot paths
/// with a real subscriber installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl LogSink {
    /// Create a logging sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TransportSink for LogSink {
    fn emit(&self, record: &EncodedRecord, scope: CoreScope) -> bool {
        let header = record.header();
        let decoded = match record.decode() {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(
                    core = header.core_id,
                    kind = header.kind.name(),
                    error = %e,
                    "Undecodable trace record"
                );
                return true;
            }
        };

        match header.kind {
            RecordKind::Fcall | RecordKind::Access => {
                tracing::trace!(
                    core = header.core_id,
                    seq = header.access_count,
                    scope = scope.raw(),
                    "{}",
                    decoded.payload
                );
            }
            _ => {
                tracing::debug!(
                    core = header.core_id,
                    seq = header.access_count,
                    scope = scope.raw(),
                    "{}",
                    decoded.payload
                );
            }
        }
        true
    }
}
