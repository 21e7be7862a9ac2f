//! Single byte-range responses.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{StatusCode, header};

use super::{FilterContext, FilterError, OutputFilter};
use crate::chain::{Buffer, BufferChain};
use crate::response::ResponseMetadata;

/// Answers `Range: bytes=...` requests with `206 Partial Content`.
///
/// Only responses that still advertise range support and carry a known length
/// are eligible, so it has to run downstream of filters that change the body.
/// Multiple ranges and unsatisfiable ranges are ignored and the full response is
/// sent.
#[derive(Clone, Copy, Debug, Default)]
pub struct RangeFilter;

/// Byte window selected for the current response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RangeWindow {
    start: u64,
    end: u64,
    /// Body bytes seen by earlier batches.
    consumed: u64,
}

/// Parse a single `bytes=` range against a body of `total` bytes.
///
/// Returns the half-open window `[start, end)`.
fn parse_range(value: &str, total: u64) -> Option<(u64, u64)> {
    let spec = value.trim().strip_prefix("bytes=")?;
    if spec.contains(',') || total == 0 {
        return None;
    }
    let (first, last) = spec.split_once('-')?;
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        let suffix: u64 = last.parse().ok()?;
        if suffix == 0 {
            return None;
        }
        return Some((total.saturating_sub(suffix), total));
    }

    let start: u64 = first.parse().ok()?;
    let end = if last.is_empty() {
        total
    } else {
        let last: u64 = last.parse().ok()?;
        if last < start {
            return None;
        }
        last.saturating_add(1).min(total)
    };
    (start < total).then_some((start, end))
}

#[async_trait]
impl OutputFilter for RangeFilter {
    fn name(&self) -> &'static str {
        "range"
    }

    fn filter_headers(&self, ctx: &mut FilterContext<'_>, meta: &mut ResponseMetadata) {
        if meta.status != StatusCode::OK || !meta.accept_ranges {
            return;
        }
        let Some(total) = meta.content_length else {
            return;
        };
        let Some(value) = ctx
            .request
            .headers
            .get(header::RANGE)
            .and_then(|v| v.to_str().ok())
        else {
            return;
        };
        let Some((start, end)) = parse_range(value, total) else {
            tracing::debug!(range = value, total, "Ignoring unsupported range");
            return;
        };

        meta.status = StatusCode::PARTIAL_CONTENT;
        meta.content_length = Some(end - start);
        meta.content_range = Some(format!("bytes {start}-{}/{total}", end - 1));
        ctx.state.insert(RangeWindow {
            start,
            end,
            consumed: 0,
        });
    }

    async fn filter_body(
        &self,
        ctx: &mut FilterContext<'_>,
        chain: BufferChain,
    ) -> Result<BufferChain, FilterError> {
        let Some(window) = ctx.state.get_mut::<RangeWindow>() else {
            return Ok(chain);
        };

        let mut out = BufferChain::new();
        for buffer in chain {
            let buffer_start = window.consumed;
            let buffer_end = buffer_start + buffer.len();
            window.consumed = buffer_end;

            let from = window.start.max(buffer_start);
            let to = window.end.min(buffer_end);
            if from < to {
                out.push(buffer.slice(from - buffer_start, to - from));
            } else if buffer.last {
                out.push(Buffer::memory(Bytes::new()).terminal());
            }
        }
        Ok(out)
    }
}
