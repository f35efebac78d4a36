//! `Accept` header negotiation.
//!
//! Each offered type is scored against the most specific matching media
//! range in the header. Offers are then ranked by quality, specificity,
//! position in the header and finally the order below. `*/*` therefore
//! lands on `unknown/unknown`, which answers with the legacy text document.

use crate::data::ResponseContentType;

const OFFERED: [(&str, &str, ResponseContentType); 4] = [
    ("unknown", "unknown", ResponseContentType::TextPlain),
    ("multipart", "mixed", ResponseContentType::MultipartMixed),
    ("application", "expo+json", ResponseContentType::ApplicationExpoJson),
    ("application", "json", ResponseContentType::ApplicationJson),
];

#[derive(Debug, Clone, PartialEq)]
struct MediaRange {
    kind: String,
    subtype: String,
    q: f32,
    position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Priority {
    q: f32,
    specificity: u8,
    position: usize,
    offered: usize,
}

/// Pick the response type for an `Accept` header value.
///
/// Absent, empty and unsatisfiable headers all yield
/// [`ResponseContentType::TextPlain`].
pub fn negotiate(accept: Option<&str>) -> ResponseContentType {
    let Some(accept) = accept.map(str::trim).filter(|a| !a.is_empty()) else {
        return ResponseContentType::TextPlain;
    };
    let ranges = parse_accept(accept);

    OFFERED
        .iter()
        .enumerate()
        .filter_map(|(offered, (kind, subtype, content_type))| {
            priority(&ranges, kind, subtype, offered).map(|p| (p, *content_type))
        })
        .filter(|(p, _)| p.q > 0.0)
        .min_by(|(a, _), (b, _)| {
            b.q.total_cmp(&a.q)
                .then(b.specificity.cmp(&a.specificity))
                .then(a.position.cmp(&b.position))
                .then(a.offered.cmp(&b.offered))
        })
        .map_or(ResponseContentType::TextPlain, |(_, content_type)| content_type)
}

fn priority(ranges: &[MediaRange], kind: &str, subtype: &str, offered: usize) -> Option<Priority> {
    ranges
        .iter()
        .filter_map(|range| {
            let mut specificity = 0;
            if range.kind.eq_ignore_ascii_case(kind) {
                specificity |= 4;
            } else if range.kind != "*" {
                return None;
            }
            if range.subtype.eq_ignore_ascii_case(subtype) {
                specificity |= 2;
            } else if range.subtype != "*" {
                return None;
            }
            Some(Priority {
                q: range.q,
                specificity,
                position: range.position,
                offered,
            })
        })
        .max_by(|a, b| {
            a.specificity
                .cmp(&b.specificity)
                .then(a.q.total_cmp(&b.q))
                .then(b.position.cmp(&a.position))
        })
}

fn parse_accept(accept: &str) -> Vec<MediaRange> {
    accept
        .split(',')
        .enumerate()
        .filter_map(|(position, entry)| {
            let mut params = entry.split(';');
            let (kind, subtype) = params.next()?.trim().split_once('/')?;
            let (kind, subtype) = (kind.trim(), subtype.trim());
            if kind.is_empty() || subtype.is_empty() {
                return None;
            }
            let q = params
                .filter_map(|p| p.split_once('='))
                .find(|(k, _)| k.trim().eq_ignore_ascii_case("q"))
                .map_or(Some(1.0), |(_, v)| v.trim().parse::<f32>().ok())?;
            Some(MediaRange {
                kind: kind.to_string(),
                subtype: subtype.to_string(),
                q: q.clamp(0.0, 1.0),
                position,
            })
        })
        .collect()
}
