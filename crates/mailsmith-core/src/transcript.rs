//! Raw message recovery from a transport transcript.
//!
//! The transcript is the line log of an SMTP session. The message itself
//! is everything the client wrote between the server's `354` go-ahead and
//! the `250` that acknowledges the end of data (the one directly followed
//! by `QUIT`). Nothing is re-parsed: the lines are carved out as they are.

/// Reply that opens the DATA section.
const START_DATA: &str = "354";

/// Reply that acknowledges the end of data.
const DATA_ACCEPTED: &str = "250";

/// Command that follows the final acknowledgement.
const QUIT: &str = "QUIT";

/// Extracts the transmitted message from `transcript`.
///
/// Returns an empty string if the transcript has no `354` reply.
#[must_use]
pub fn extract(transcript: &str) -> String {
    let lines: Vec<&str> = transcript.split('\n').collect();
    let mut out = String::new();
    let mut started = false;

    for (i, line) in lines.iter().enumerate() {
        if !started {
            started = line.starts_with(START_DATA);
            continue;
        }
        if is_end_of_data(line, lines.get(i + 1).copied()) {
            break;
        }
        out.push_str(line);
        out.push('\n');
    }

    if !started {
        tracing::warn!("transcript has no DATA section, nothing to extract");
    }

    out
}

fn is_end_of_data(line: &str, next: Option<&str>) -> bool {
    line.starts_with(DATA_ACCEPTED) && next.is_some_and(|next| next.starts_with(QUIT))
}
