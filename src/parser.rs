//! Decode option-contract identity out of free-text trade descriptions,
//! e.g. "AAPL 01/19/2024 Call $150.00".

use crate::types::DecodedDescription;

/// Tokenize on whitespace and classify each token by position and shape:
/// index 0 is the instrument, the first token containing `/` or `-` is the
/// expiry, a case-insensitive `call`/`put` is the option type, and any other
/// token that parses as a finite number (one leading `$` allowed) is the
/// strike, last match winning. Everything else is discarded.
///
/// Returns `None` when expiry, type or strike cannot be identified; the
/// aggregator skips such records.
pub fn parse_description(text: &str) -> Option<DecodedDescription> {
    let mut instrument: Option<&str> = None;
    let mut expiry: Option<&str> = None;
    let mut option_type: Option<&str> = None;
    let mut strike: Option<&str> = None;

    for (i, part) in text.split_whitespace().enumerate() {
        if i == 0 {
            instrument = Some(part);
        } else if part.contains('/') || part.contains('-') {
            if expiry.is_none() {
                expiry = Some(part);
            }
        } else if part.eq_ignore_ascii_case("call") || part.eq_ignore_ascii_case("put") {
            option_type = Some(part);
        } else {
            let bare = part.strip_prefix('$').unwrap_or(part);
            if bare.parse::<f64>().map_or(false, f64::is_finite) {
                strike = Some(bare);
            }
        }
    }

    Some(DecodedDescription {
        instrument: instrument?.to_string(),
        expiry: expiry?.to_string(),
        option_type: option_type?.to_string(),
        strike: strike?.to_string(),
    })
}
