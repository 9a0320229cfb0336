//! Scoring oracle client
//!
//! Posts alert attributes to the external scoring service and parses
//! its reply. The oracle answers in free text that is expected to
//! embed a single JSON object `{"score": <number>, "explanation":
//! <string>}`; anything else is a failure the caller absorbs into the
//! fallback verdict.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Alert;

/// Explanation stored when the oracle fails or returns garbage
pub const FALLBACK_EXPLANATION: &str = "No explanation available.";

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("oracle reply contained no parsable verdict object")]
    NoVerdict,
}

/// Parsed oracle reply
#[derive(Debug, Clone, Deserialize)]
pub struct Verdict {
    pub score: f64,
    pub explanation: String,
}

impl Verdict {
    /// Verdict used on any oracle failure
    pub fn fallback() -> Self {
        Self {
            score: 0.0,
            explanation: FALLBACK_EXPLANATION.to_string(),
        }
    }
}

/// Request payload. The rule score is deliberately omitted so it
/// cannot bias the oracle.
#[derive(Debug, Serialize)]
struct OracleRequest<'a> {
    id: i64,
    timestamp: String,
    src_ip: &'a str,
    dest_ip: &'a str,
    signature: &'a str,
    severity: i32,
    proto: &'a str,
}

/// HTTP client for the external scoring oracle
#[derive(Clone)]
pub struct ScoringOracle {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl ScoringOracle {
    pub fn new(url: &str, timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Ask the oracle to assess one alert. Fails on transport errors,
    /// timeout, or an unparsable reply; never partially succeeds.
    pub async fn assess(&self, alert: &Alert) -> Result<Verdict, OracleError> {
        let payload = OracleRequest {
            id: alert.id,
            timestamp: alert.timestamp.to_rfc3339(),
            src_ip: &alert.src_ip,
            dest_ip: &alert.dest_ip,
            signature: &alert.signature,
            severity: alert.severity,
            proto: &alert.proto,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        let body = response.text().await?;
        parse_verdict(&body).ok_or(OracleError::NoVerdict)
    }
}

/// Extract the first well-formed verdict object from a free-text reply.
///
/// The oracle tends to wrap its JSON in prose. Candidate substrings are
/// taken at each `{`, extended to the matching close brace, and parsed
/// strictly into the verdict shape; the first candidate that decodes
/// wins. A numeric score outside [0, 100] is clamped rather than
/// rejected.
pub fn parse_verdict(reply: &str) -> Option<Verdict> {
    for (start, _) in reply.char_indices().filter(|&(_, c)| c == '{') {
        let candidate = &reply[start..];
        if let Some(object) = balanced_object(candidate) {
            if let Ok(mut verdict) = serde_json::from_str::<Verdict>(object) {
                verdict.score = verdict.score.clamp(0.0, 100.0);
                return Some(verdict);
            }
        }
    }
    None
}

/// Slice of `s` covering the brace-balanced object starting at its
/// first byte, or `None` if the braces never balance. String literals
/// and escapes are honored so braces inside the explanation text do
/// not terminate the scan early.
fn balanced_object(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..idx + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_bare_object() {
        let v = parse_verdict(r#"{"score": 87.5, "explanation": "beaconing pattern"}"#).unwrap();
        assert_eq!(v.score, 87.5);
        assert_eq!(v.explanation, "beaconing pattern");
    }

    #[test]
    fn test_parses_object_embedded_in_prose() {
        let reply = r#"Sure! Here is my assessment:
{"score": 63, "explanation": "repeated SSH probes from a single host"}
Let me know if you need anything else."#;
        let v = parse_verdict(reply).unwrap();
        assert_eq!(v.score, 63.0);
    }

    #[test]
    fn test_skips_non_verdict_braces() {
        let reply = r#"risk bucket {high} -> {"score": 55, "explanation": "port scan"}"#;
        let v = parse_verdict(reply).unwrap();
        assert_eq!(v.score, 55.0);
        assert_eq!(v.explanation, "port scan");
    }

    #[test]
    fn test_braces_inside_explanation_string() {
        let reply = r#"{"score": 40, "explanation": "payload contained \"{}\" markers"}"#;
        let v = parse_verdict(reply).unwrap();
        assert_eq!(v.explanation, "payload contained \"{}\" markers");
    }

    #[test]
    fn test_no_object_is_none() {
        assert!(parse_verdict("the alert looks benign to me").is_none());
    }

    #[test]
    fn test_unbalanced_object_is_none() {
        assert!(parse_verdict(r#"{"score": 10, "explanation": "trunc"#).is_none());
    }

    #[test]
    fn test_non_numeric_score_is_none() {
        assert!(parse_verdict(r#"{"score": "high", "explanation": "x"}"#).is_none());
    }

    #[test]
    fn test_missing_explanation_is_none() {
        assert!(parse_verdict(r#"{"score": 10}"#).is_none());
    }

    #[test]
    fn test_out_of_range_score_clamps() {
        let v = parse_verdict(r#"{"score": 180, "explanation": "x"}"#).unwrap();
        assert_eq!(v.score, 100.0);

        let v = parse_verdict(r#"{"score": -4, "explanation": "x"}"#).unwrap();
        assert_eq!(v.score, 0.0);
    }

    #[test]
    fn test_fallback_shape() {
        let v = Verdict::fallback();
        assert_eq!(v.score, 0.0);
        assert_eq!(v.explanation, FALLBACK_EXPLANATION);
    }
}
