//! Recorded landmark streams.
//!
//! A landmark stream is the extractor's output for a run of video frames,
//! stored as JSONL: an optional `# {header}` first line followed by one
//! [`LandmarkFrame`] per line. Replaying a stream drives the same pipeline
//! as a live camera.

use serde::{Deserialize, Serialize};

use crate::frame::{LandmarkLayout, LandmarkSet};

/// Monotonic timestamp in nanoseconds since stream start.
pub type TimestampNs = u64;

/// Metadata line at the top of a landmark stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkStreamHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Nominal frame rate of the source video.
    pub fps: u32,

    /// Layout the extractor was configured for.
    pub layout: LandmarkLayout,

    /// Wall-clock time at stream start (RFC 3339).
    #[serde(default)]
    pub epoch_wall: String,
}

/// Extractor output for a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Nanoseconds since stream start.
    #[serde(rename = "t")]
    pub timestamp_ns: TimestampNs,

    /// Zero or more detected landmark sets.
    #[serde(default)]
    pub sets: Vec<LandmarkSet>,
}

impl LandmarkFrame {
    pub fn new(timestamp_ns: TimestampNs, sets: Vec<LandmarkSet>) -> Self {
        Self { timestamp_ns, sets }
    }

    /// A frame in which nothing was detected.
    pub fn empty(timestamp_ns: TimestampNs) -> Self {
        Self::new(timestamp_ns, Vec::new())
    }

    /// Timestamp as fractional seconds since stream start.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_ns as f64 / 1_000_000_000.0
    }
}

/// Parse frames from JSONL content, skipping blank and `#` lines.
pub fn parse_landmark_frames(jsonl: &str) -> Result<Vec<LandmarkFrame>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Parse the `# {...}` header line, if the stream has one.
pub fn parse_stream_header(
    content: &str,
) -> Option<Result<LandmarkStreamHeader, serde_json::Error>> {
    let first = content.lines().map(str::trim).find(|l| !l.is_empty())?;
    let json = first.strip_prefix('#')?.trim();
    Some(serde_json::from_str(json))
}

/// Render a stream (header plus frames) as JSONL.
pub fn to_jsonl(
    header: Option<&LandmarkStreamHeader>,
    frames: &[LandmarkFrame],
) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    if let Some(header) = header {
        out.push_str("# ");
        out.push_str(&serde_json::to_string(header)?);
        out.push('\n');
    }
    for frame in frames {
        out.push_str(&serde_json::to_string(frame)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Handedness;

    #[test]
    fn test_parse_frames_skips_header_and_blanks() {
        let content = r#"# {"schema_version":"1.0","fps":30,"layout":{"slots":2,"points_per_set":21,"coords":3}}
{"t":0,"sets":[]}

{"t":33333333,"sets":[{"handedness":"left","points":[[0.1,0.2,0.3]]}]}
{"t":66666666}
"#;
        let frames = parse_landmark_frames(content).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames[0].sets.is_empty());
        assert_eq!(frames[1].sets[0].handedness, Some(Handedness::Left));
        assert!(frames[2].sets.is_empty());
        assert!((frames[1].timestamp_secs() - 0.033333333).abs() < 1e-9);
    }

    #[test]
    fn test_parse_header() {
        let content = "# {\"schema_version\":\"1.0\",\"fps\":30,\"layout\":{\"slots\":1,\"points_per_set\":21,\"coords\":3}}\n{\"t\":0}\n";
        let header = parse_stream_header(content).unwrap().unwrap();
        assert_eq!(header.fps, 30);
        assert_eq!(header.layout, LandmarkLayout::ONE_HAND);
        assert!(header.epoch_wall.is_empty());
    }

    #[test]
    fn test_missing_header() {
        assert!(parse_stream_header("{\"t\":0}\n").is_none());
    }

    #[test]
    fn test_jsonl_roundtrip() {
        let header = LandmarkStreamHeader {
            schema_version: "1.0".to_string(),
            fps: 30,
            layout: LandmarkLayout::TWO_HANDS,
            epoch_wall: "2026-01-01T00:00:00Z".to_string(),
        };
        let frames = vec![
            LandmarkFrame::empty(0),
            LandmarkFrame::new(
                33_000_000,
                vec![LandmarkSet::new(vec![[0.5, 0.5, 0.0]; 21])],
            ),
        ];
        let content = to_jsonl(Some(&header), &frames).unwrap();
        assert_eq!(parse_stream_header(&content).unwrap().unwrap(), header);
        assert_eq!(parse_landmark_frames(&content).unwrap(), frames);
    }
}
