//! Integration tests for the arg→config→art→render pipeline
//!
//! These tests exercise the public API end to end with simulated reply
//! events, without requiring actual network access.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;

use artping::art::{ArtSet, BUILTIN_ART};
use artping::cli::Args;
use artping::config::Config;
use artping::error::RunError;
use artping::ping::{PacketEvent, Pinger};
use artping::render::{self, ColorRules};
use artping::stats::PingStats;

// colored's override is process-global; serialize tests that touch it
static COLOR_LOCK: Mutex<()> = Mutex::new(());

fn test_args(argv: &[&str]) -> Args {
    Args::try_parse_from(argv).unwrap()
}

#[test]
fn test_default_run_plays_the_animation_once() {
    let args = test_args(&["artping", "example.com"]);
    let config = Config::from(&args);
    let art = ArtSet::builtin();

    // One packet per frame, wrapping back to the first frame afterwards
    assert_eq!(config.count, art.len() as u64);
    assert_eq!(art.frame(art.len() as u16), BUILTIN_ART[0]);
}

#[test]
fn test_args_flow_into_config() {
    let args = test_args(&[
        "artping",
        "-c",
        "5",
        "-i",
        "0.2",
        "--timeout",
        "1.5",
        "-p",
        "example.com",
    ]);
    assert!(args.validate().is_ok());

    let config = Config::from(&args);
    assert_eq!(config.count, 5);
    assert_eq!(config.interval, Duration::from_millis(200));
    assert_eq!(config.timeout, Duration::from_millis(1500));
    assert!(config.privileged);
}

#[test]
fn test_session_stats_lifecycle() {
    let mut stats = PingStats::new();

    // Ten packets out, eight replies back
    for _ in 0..10 {
        stats.record_sent();
    }
    for ms in [10, 12, 14, 16, 18, 20, 22, 24] {
        stats.record_reply(Duration::from_millis(ms));
    }

    let snap = stats.snapshot(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)));
    assert_eq!(snap.sent, 10);
    assert_eq!(snap.received, 8);
    assert!((snap.loss_pct - 20.0).abs() < 0.01);
    assert_eq!(snap.min_rtt, Duration::from_millis(10));
    assert_eq!(snap.max_rtt, Duration::from_millis(24));
    assert_eq!(snap.avg_rtt, Duration::from_millis(17));
}

#[test]
fn test_reply_rendering_walks_the_frames() {
    let _guard = COLOR_LOCK.lock().unwrap();
    colored::control::set_override(false);

    let art = ArtSet::builtin();
    let rules = ColorRules::default();

    let mut lines = Vec::new();
    for seq in 0..3u16 {
        let event = PacketEvent {
            seq,
            nbytes: 64,
            addr: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)),
            ttl: Some(57),
            rtt: Duration::from_micros(11_000 + u64::from(seq) * 500),
        };
        lines.push(render::reply_line(art.frame(event.seq), &rules, &event));
    }

    assert!(lines[0].starts_with(BUILTIN_ART[0]));
    assert!(lines[1].starts_with(BUILTIN_ART[1]));
    assert!(lines[2].starts_with(BUILTIN_ART[2]));
    assert!(lines[0].ends_with("icmp_seq=0 ttl=57 time=11ms"));
    assert!(lines[2].contains("icmp_seq=2"));

    colored::control::unset_override();
}

#[test]
fn test_summary_after_simulated_session() {
    let _guard = COLOR_LOCK.lock().unwrap();
    colored::control::set_override(false);

    let mut stats = PingStats::new();
    for _ in 0..4 {
        stats.record_sent();
        stats.record_reply(Duration::from_millis(15));
    }

    let snap = stats.snapshot(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9)));
    let out = render::summary(&snap);

    assert!(out.contains("--- 203.0.113.9 ping statistics ---"));
    assert!(out.contains("4 packets transmitted, 4 packets received, 0.0% packet loss"));
    assert!(out.contains("round-trip min/avg/max/stddev = 15ms/15ms/15ms/0ns"));

    colored::control::unset_override();
}

#[test]
fn test_custom_art_file_drives_frame_selection() {
    let path = std::env::temp_dir().join(format!("artping-int-{}.txt", std::process::id()));
    std::fs::write(&path, "one\ntwo\nthree\n").unwrap();

    let art = ArtSet::from_file(&path).unwrap();
    assert_eq!(art.len(), 3);
    assert_eq!(art.frame(0), "one");
    assert_eq!(art.frame(4), "two"); // 4 mod 3

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_failure_exit_codes() {
    assert_eq!(RunError::argument("bad count").exit_code(), 1);
    assert_eq!(
        RunError::Art(anyhow::anyhow!("missing file")).exit_code(),
        1
    );
    assert_eq!(
        RunError::Init(anyhow::anyhow!("resolution failed")).exit_code(),
        0
    );
    assert_eq!(
        RunError::Runtime(anyhow::anyhow!("send failed")).exit_code(),
        2
    );
}

#[tokio::test]
async fn test_stopped_session_finishes_once_without_replies() {
    // Socket creation needs ICMP privileges; skip when the environment
    // denies them
    let Ok(mut pinger) = Pinger::new(Config::default(), IpAddr::V4(Ipv4Addr::LOCALHOST)) else {
        return;
    };

    // A session that never ran reports an empty snapshot
    let snap = pinger.snapshot();
    assert_eq!(snap.sent, 0);
    assert_eq!(snap.received, 0);

    let replies = Arc::new(AtomicUsize::new(0));
    let finishes = Arc::new(AtomicUsize::new(0));

    let reply_count = Arc::clone(&replies);
    pinger.set_on_reply(Box::new(move |_| {
        reply_count.fetch_add(1, Ordering::SeqCst);
    }));
    let finish_count = Arc::clone(&finishes);
    let finish_snapshot = Arc::new(Mutex::new(None));
    let finish_slot = Arc::clone(&finish_snapshot);
    pinger.set_on_finish(Box::new(move |snapshot| {
        finish_count.fetch_add(1, Ordering::SeqCst);
        *finish_slot.lock().unwrap() = Some(snapshot.clone());
    }));

    // Stop before the first tick: nothing is sent, no reply callback can
    // fire, and the finish callback still runs exactly once after the
    // receiver thread is joined
    pinger.stop();
    pinger.run().await.unwrap();

    assert_eq!(replies.load(Ordering::SeqCst), 0);
    assert_eq!(finishes.load(Ordering::SeqCst), 1);

    let snap = finish_snapshot.lock().unwrap().take().unwrap();
    assert_eq!(snap.sent, 0);
    assert_eq!(snap.received, 0);
    assert_eq!(snap.addr, IpAddr::V4(Ipv4Addr::LOCALHOST));
}

#[test]
fn test_bad_arguments_rejected_before_any_network_use() {
    assert!(Args::try_parse_from(["artping"]).is_err());
    assert!(Args::try_parse_from(["artping", "a.example", "b.example"]).is_err());

    let args = test_args(&["artping", "-c", "0", "example.com"]);
    assert!(args.validate().is_err());
}
