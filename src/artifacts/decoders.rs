//! Per-kind decoders over fixed offsets of a studio record.
//!
//! Every field is optional: a record that is shorter than expected, or has
//! a different shape at some offset, decodes to absent fields.

use serde::Serialize;
use serde_json::Value;

use super::ArtifactKind;
use crate::nav;

// ── Offsets ─────────────────────────────────────────────────────────────────

const AUDIO_MEDIA: &[usize] = &[6, 5];
const AUDIO_STREAM: &[usize] = &[6, 3];
const AUDIO_DURATION: &[usize] = &[6, 9, 0];

const VIDEO_OPTIONS: &[usize] = &[8];
const VIDEO_STREAM: &[usize] = &[8, 3];

const REPORT_OPTIONS: &[usize] = &[7];

const FLASHCARD_CARDS: &[usize] = &[9, 1];

const INFOGRAPHIC_IMAGE: &[usize] = &[14, 2, 0, 1, 0];
const INFOGRAPHIC_FALLBACK: &[usize] = &[5, 0, 0];

const SLIDE_DECK_PDF: &[usize] = &[12, 0, 1];
const SLIDE_DECK_URL: &[usize] = &[16, 0];
const SLIDE_DECK_ALT_URL: &[usize] = &[16, 3];

const DATA_TABLE_ROWS: &[usize] = &[18, 0, 0, 0, 0, 4, 2];

const AUDIO_MIME: &str = "audio/mp4";
const VIDEO_MIME: &str = "video/mp4";
/// `item[1]` of a video media entry marking the preferred encoding.
const VIDEO_PRIORITY_FLAG: i64 = 4;

// ── Decoded fields ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArtifactDetails {
    Audio {
        media_url: Option<String>,
        stream_url: Option<String>,
        duration_seconds: Option<f64>,
    },
    Video {
        media_url: Option<String>,
        stream_url: Option<String>,
    },
    Report {
        markdown: Option<String>,
    },
    Flashcards {
        card_count: Option<usize>,
    },
    Infographic {
        image_url: Option<String>,
    },
    SlideDeck {
        pdf_url: Option<String>,
    },
    DataTable {
        /// Raw row count including the header row.
        row_count: Option<usize>,
    },
    Unknown,
}

impl ArtifactDetails {
    /// Direct file URL for kinds that are downloaded over HTTP.
    pub fn download_url(&self) -> Option<&str> {
        match self {
            Self::Audio { media_url, .. } | Self::Video { media_url, .. } => media_url.as_deref(),
            Self::Infographic { image_url } => image_url.as_deref(),
            Self::SlideDeck { pdf_url } => pdf_url.as_deref(),
            _ => None,
        }
    }
}

type Decoder = fn(&Value) -> ArtifactDetails;

/// One decoder per kind, looked up by kind.
const DECODERS: [(ArtifactKind, Decoder); 7] = [
    (ArtifactKind::Audio, decode_audio),
    (ArtifactKind::Report, decode_report),
    (ArtifactKind::Video, decode_video),
    (ArtifactKind::Flashcards, decode_flashcards),
    (ArtifactKind::Infographic, decode_infographic),
    (ArtifactKind::SlideDeck, decode_slide_deck),
    (ArtifactKind::DataTable, decode_data_table),
];

pub(crate) fn decode_details(kind: ArtifactKind, record: &Value) -> ArtifactDetails {
    DECODERS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, decode)| decode(record))
        .unwrap_or(ArtifactDetails::Unknown)
}

/// Where a media kind's download URL is expected, for diagnostics.
pub(crate) fn media_path(kind: ArtifactKind) -> Option<&'static [usize]> {
    match kind {
        ArtifactKind::Audio => Some(AUDIO_MEDIA),
        ArtifactKind::Video => Some(VIDEO_OPTIONS),
        ArtifactKind::Infographic => Some(INFOGRAPHIC_IMAGE),
        ArtifactKind::SlideDeck => Some(SLIDE_DECK_PDF),
        _ => None,
    }
}

// ── Decoders ────────────────────────────────────────────────────────────────

fn decode_audio(record: &Value) -> ArtifactDetails {
    let media_url = nav::array_at(record, AUDIO_MEDIA).and_then(|items| {
        items
            .iter()
            .find(|item| nav::str_at(item, &[2]) == Some(AUDIO_MIME))
            .or_else(|| items.first())
            .and_then(|item| nav::str_at(item, &[0]))
            .map(str::to_string)
    });
    ArtifactDetails::Audio {
        media_url,
        stream_url: nav::str_at(record, AUDIO_STREAM).map(str::to_string),
        duration_seconds: nav::get(record, AUDIO_DURATION).and_then(Value::as_f64),
    }
}

/// The media list is the first child of the options whose `[0][0]` is a URL.
fn video_media_url(options: &[Value]) -> Option<String> {
    let media = options
        .iter()
        .find(|child| nav::http_url_at(child, &[0, 0]).is_some())?
        .as_array()?;

    let mut chosen = None;
    for item in media {
        if nav::str_at(item, &[2]) != Some(VIDEO_MIME) {
            continue;
        }
        chosen = nav::str_at(item, &[0]);
        if nav::i64_at(item, &[1]) == Some(VIDEO_PRIORITY_FLAG) {
            break;
        }
    }
    chosen
        .or_else(|| media.first().and_then(|item| nav::str_at(item, &[0])))
        .map(str::to_string)
}

fn decode_video(record: &Value) -> ArtifactDetails {
    ArtifactDetails::Video {
        media_url: nav::array_at(record, VIDEO_OPTIONS).and_then(video_media_url),
        stream_url: nav::str_at(record, VIDEO_STREAM).map(str::to_string),
    }
}

fn decode_report(record: &Value) -> ArtifactDetails {
    let options = nav::get(record, REPORT_OPTIONS);
    let markdown = options.and_then(|o| match o {
        Value::String(s) => Some(s.as_str()),
        _ => nav::str_at(o, &[0]).or_else(|| nav::str_at(o, &[1, 0])),
    });
    ArtifactDetails::Report {
        markdown: markdown.map(str::to_string),
    }
}

fn decode_flashcards(record: &Value) -> ArtifactDetails {
    ArtifactDetails::Flashcards {
        card_count: nav::array_at(record, FLASHCARD_CARDS).map(<[Value]>::len),
    }
}

fn decode_infographic(record: &Value) -> ArtifactDetails {
    let image_url = nav::http_url_at(record, INFOGRAPHIC_IMAGE)
        .or_else(|| nav::str_at(record, INFOGRAPHIC_FALLBACK));
    ArtifactDetails::Infographic {
        image_url: image_url.map(str::to_string),
    }
}

fn decode_slide_deck(record: &Value) -> ArtifactDetails {
    let pdf_url = nav::text_at(record, SLIDE_DECK_PDF)
        .or_else(|| nav::http_url_at(record, SLIDE_DECK_URL))
        .or_else(|| nav::str_at(record, SLIDE_DECK_ALT_URL));
    ArtifactDetails::SlideDeck {
        pdf_url: pdf_url.map(str::to_string),
    }
}

fn decode_data_table(record: &Value) -> ArtifactDetails {
    ArtifactDetails::DataTable {
        row_count: nav::array_at(record, DATA_TABLE_ROWS).map(<[Value]>::len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_with(offset: usize, value: Value) -> Value {
        let mut raw = vec![json!(null); offset + 1];
        raw[0] = json!("id");
        raw[offset] = value;
        Value::Array(raw)
    }

    #[test]
    fn audio_prefers_mp4_and_reads_duration() {
        let options = json!([
            null, null, null, "https://stream", null,
            [["https://a.webm", 1, "audio/webm"], ["https://a.mp4", 1, "audio/mp4"]],
            null, null, null, [312.5, 0]
        ]);
        let details = decode_details(ArtifactKind::Audio, &record_with(6, options));
        assert_eq!(
            details,
            ArtifactDetails::Audio {
                media_url: Some("https://a.mp4".into()),
                stream_url: Some("https://stream".into()),
                duration_seconds: Some(312.5),
            }
        );
    }

    #[test]
    fn audio_falls_back_to_first_entry() {
        let options = json!([null, null, null, null, null, [["https://only", 1, "audio/ogg"]]]);
        let details = decode_details(ArtifactKind::Audio, &record_with(6, options));
        assert_eq!(details.download_url(), Some("https://only"));
    }

    #[test]
    fn video_priority_flag() {
        let options = json!([
            "meta",
            [
                ["https://v1", 1, "video/mp4"],
                ["https://v4", 4, "video/mp4"],
                ["https://v2", 2, "video/mp4"]
            ],
            null,
            "https://stream"
        ]);
        let details = decode_details(ArtifactKind::Video, &record_with(8, options));
        assert_eq!(details.download_url(), Some("https://v4"));
    }

    #[test]
    fn report_shapes() {
        for (payload, expected) in [
            (json!(["# Title"]), "# Title"),
            (json!("# Plain"), "# Plain"),
            (json!([null, ["# Nested"]]), "# Nested"),
        ] {
            let details = decode_details(ArtifactKind::Report, &record_with(7, payload));
            assert_eq!(
                details,
                ArtifactDetails::Report {
                    markdown: Some(expected.into())
                }
            );
        }
    }

    #[test]
    fn infographic_fallback() {
        let mut raw = vec![json!(null); 15];
        raw[5] = json!([["https://fallback.png"]]);
        raw[14] = json!([null, null, [[null, ["not-a-url"]]]]);
        let details = decode_details(ArtifactKind::Infographic, &Value::Array(raw));
        assert_eq!(details.download_url(), Some("https://fallback.png"));
    }

    #[test]
    fn slide_deck_paths() {
        let pdf = record_with(12, json!([[null, "https://deck.pdf"]]));
        assert_eq!(
            decode_details(ArtifactKind::SlideDeck, &pdf).download_url(),
            Some("https://deck.pdf")
        );
        let alt = record_with(16, json!(["not http", null, null, "https://alt"]));
        assert_eq!(
            decode_details(ArtifactKind::SlideDeck, &alt).download_url(),
            Some("https://alt")
        );
    }

    #[test]
    fn short_records_decode_to_absent_fields() {
        let short = json!(["id", "title", 1, null, 3]);
        for kind in ArtifactKind::ALL {
            let details = decode_details(kind, &short);
            assert_eq!(details.download_url(), None, "{kind}");
        }
        assert_eq!(
            decode_details(ArtifactKind::Flashcards, &short),
            ArtifactDetails::Flashcards { card_count: None }
        );
        assert_eq!(
            decode_details(ArtifactKind::DataTable, &json!([])),
            ArtifactDetails::DataTable { row_count: None }
        );
    }
}
