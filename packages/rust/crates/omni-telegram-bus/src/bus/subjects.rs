//! Subject scheme: `<prefix>.<bot>.in.<kind>` and `<prefix>.<bot>.out.<method>`.

/// Full update, always published.
pub const IN_UPDATE: &str = "update";
pub const IN_MESSAGE: &str = "message";
pub const IN_EDITED: &str = "edited";
pub const IN_CALLBACK: &str = "callback";
pub const IN_INLINE: &str = "inline";

/// Reserved outgoing method whose body carries `{method, params}`.
pub const OUT_RAW: &str = "raw";

const MIN_OUTBOUND_SEGMENTS: usize = 4;

pub fn inbound(prefix: &str, bot: &str, kind: &str) -> String {
    format!("{prefix}.{bot}.in.{kind}")
}

/// Wildcard matching every outgoing subject of one bot.
pub fn outbound_pattern(prefix: &str, bot: &str) -> String {
    format!("{prefix}.{bot}.out.>")
}

/// Trailing segment of an outgoing subject, or `None` when the subject has too
/// few segments or an empty tail.
pub fn method_segment(subject: &str) -> Option<&str> {
    let segments: Vec<&str> = subject.split('.').collect();
    if segments.len() < MIN_OUTBOUND_SEGMENTS {
        return None;
    }
    segments.last().copied().filter(|method| !method.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_per_bot_subjects() {
        assert_eq!(inbound("telegram", "bot1", IN_UPDATE), "telegram.bot1.in.update");
        assert_eq!(outbound_pattern("telegram", "bot1"), "telegram.bot1.out.>");
    }

    #[test]
    fn method_segment_takes_trailing_segment() {
        assert_eq!(
            method_segment("telegram.bot1.out.sendMessage"),
            Some("sendMessage")
        );
        assert_eq!(method_segment("acme.tg.bot1.out.raw"), Some("raw"));
        assert_eq!(method_segment("telegram.bot1.out"), None);
        assert_eq!(method_segment("telegram.bot1.out."), None);
    }
}
