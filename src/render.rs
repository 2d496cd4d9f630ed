use colored::{Color, Colorize};

use crate::ping::PacketEvent;
use crate::stats::StatsSnapshot;

/// One character class within a frame and how to paint it
#[derive(Debug, Clone)]
pub struct ClassRule {
    /// Characters belonging to this class
    pub chars: &'static str,
    /// Replacement glyph, or None to keep the original character
    pub glyph: Option<char>,
    pub color: Color,
}

/// Paint rules for the three character classes of a frame.
///
/// Applied in declaration order. The class sets must not contain ANSI
/// escape bytes (ESC, '[', ';', digits, 'm'): each pass runs a literal
/// replace over the output of the previous one, and a class that
/// overlapped an escape sequence would corrupt it.
#[derive(Debug, Clone)]
pub struct ColorRules {
    pub filler: ClassRule,
    pub line: ClassRule,
    pub subject: ClassRule,
}

impl Default for ColorRules {
    fn default() -> Self {
        Self {
            filler: ClassRule {
                chars: ".",
                glyph: None,
                color: Color::Blue,
            },
            line: ClassRule {
                chars: "/\\()|_-<>",
                glyph: None,
                color: Color::Magenta,
            },
            subject: ClassRule {
                chars: "zZwo",
                glyph: None,
                color: Color::Yellow,
            },
        }
    }
}

/// Colorize one art frame by replacing every class character with its
/// painted form
pub fn colorize_frame(frame: &str, rules: &ColorRules) -> String {
    let mut out = frame.to_string();
    for rule in [&rules.filler, &rules.line, &rules.subject] {
        for ch in rule.chars.chars() {
            if !frame.contains(ch) {
                continue;
            }
            let glyph = rule.glyph.unwrap_or(ch);
            let painted = glyph.to_string().color(rule.color).bold().to_string();
            out = out.replace(ch, &painted);
        }
    }
    out
}

/// One reply line: the art frame followed by ping-style reply fields
pub fn reply_line(frame: &str, rules: &ColorRules, event: &PacketEvent) -> String {
    let art = colorize_frame(frame, rules);
    let addr = event.addr.to_string().green().bold();
    let seq = event.seq.to_string().cyan().bold();
    let ttl = match event.ttl {
        Some(ttl) => ttl.to_string(),
        None => "?".to_string(),
    };
    let ttl = ttl.red().bold();
    let time = format!("{:?}", event.rtt).blue().bold();

    format!(
        "{} {} bytes from {}: icmp_seq={} ttl={} time={}",
        art, event.nbytes, addr, seq, ttl, time
    )
}

/// Final statistics block, printed after the last reply or on interrupt
pub fn summary(snap: &StatsSnapshot) -> String {
    let header = format!("--- {} ping statistics ---", snap.addr)
        .green()
        .bold();

    let sent = snap.sent.to_string().green().bold();
    let received = snap.received.to_string().cyan().bold();
    let loss = format!("{:.1}%", snap.loss_pct).blue().bold();

    let min = format!("{:?}", snap.min_rtt).green().bold();
    let avg = format!("{:?}", snap.avg_rtt).cyan().bold();
    let max = format!("{:?}", snap.max_rtt).blue().bold();
    let stddev = format!("{:?}", snap.stddev_rtt).red().bold();

    format!(
        "\n{}\n{} packets transmitted, {} packets received, {} packet loss\n\
         round-trip min/avg/max/stddev = {}/{}/{}/{}",
        header, sent, received, loss, min, avg, max, stddev
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Mutex;
    use std::time::Duration;

    // colored's override is process-global; serialize tests that set it
    static COLOR_LOCK: Mutex<()> = Mutex::new(());

    fn event() -> PacketEvent {
        PacketEvent {
            seq: 4,
            nbytes: 64,
            addr: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            ttl: Some(57),
            rtt: Duration::from_micros(12_345),
        }
    }

    #[test]
    fn test_colorize_frame_paints_each_class() {
        let _guard = COLOR_LOCK.lock().unwrap();
        colored::control::set_override(true);

        let out = colorize_frame("./z", &ColorRules::default());
        let expected = format!(
            "{}{}{}",
            ".".blue().bold(),
            "/".magenta().bold(),
            "z".yellow().bold()
        );
        assert_eq!(out, expected);

        colored::control::unset_override();
    }

    #[test]
    fn test_colorize_frame_leaves_unknown_chars() {
        let _guard = COLOR_LOCK.lock().unwrap();
        colored::control::set_override(false);

        // With color disabled every pass is an identity replace
        assert_eq!(colorize_frame("abc./z", &ColorRules::default()), "abc./z");

        colored::control::unset_override();
    }

    #[test]
    fn test_reply_line_fields() {
        let _guard = COLOR_LOCK.lock().unwrap();
        colored::control::set_override(false);

        let line = reply_line("...", &ColorRules::default(), &event());
        assert_eq!(
            line,
            "... 64 bytes from 192.0.2.1: icmp_seq=4 ttl=57 time=12.345ms"
        );

        colored::control::unset_override();
    }

    #[test]
    fn test_reply_line_unknown_ttl() {
        let _guard = COLOR_LOCK.lock().unwrap();
        colored::control::set_override(false);

        let mut ev = event();
        ev.ttl = None;
        let line = reply_line("...", &ColorRules::default(), &ev);
        assert!(line.contains("ttl=?"));

        colored::control::unset_override();
    }

    #[test]
    fn test_summary_layout() {
        let _guard = COLOR_LOCK.lock().unwrap();
        colored::control::set_override(false);

        let snap = StatsSnapshot {
            addr: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            sent: 10,
            received: 9,
            loss_pct: 10.0,
            min_rtt: Duration::from_micros(9_000),
            avg_rtt: Duration::from_micros(12_000),
            max_rtt: Duration::from_micros(20_000),
            stddev_rtt: Duration::from_micros(3_000),
        };

        let out = summary(&snap);
        assert_eq!(
            out,
            "\n--- 192.0.2.1 ping statistics ---\n\
             10 packets transmitted, 9 packets received, 10.0% packet loss\n\
             round-trip min/avg/max/stddev = 9ms/12ms/20ms/3ms"
        );

        colored::control::unset_override();
    }

    #[test]
    fn test_colorized_output_has_no_corrupted_escapes() {
        let _guard = COLOR_LOCK.lock().unwrap();
        colored::control::set_override(true);

        // Later passes must not touch the escape bytes emitted by earlier
        // ones; count complete sequences to catch corruption
        let out = colorize_frame("./\\z.", &ColorRules::default());
        let opens = out.matches('\u{1b}').count();
        let resets = out.matches("\u{1b}[0m").count();
        assert_eq!(opens, resets * 2); // one open and one reset per glyph

        colored::control::unset_override();
    }
}
