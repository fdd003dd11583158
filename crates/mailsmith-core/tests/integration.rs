//! Integration tests for the mailer.
//!
//! These tests drive whole send/save cycles through the simulated
//! transport, plus a scripted transport that replays a fixed transcript.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use mailsmith_core::{
    Attachment, LogLevel, Mailer, MailerConfig, SimulatedTransport, SmtpConfig, Tracker,
    Transport, transcript,
};
use mailsmith_mime::ContentType;
use mailsmith_mime::encoding::decode_header;

/// Transport that replays a canned transcript and records what it was given.
#[derive(Debug)]
struct ScriptedTransport {
    transcript: String,
    accept: bool,
    headers: Vec<(String, String)>,
    sent: Vec<u8>,
}

impl Transport for ScriptedTransport {
    fn open(_config: &SmtpConfig) -> Self {
        Self {
            transcript: String::new(),
            accept: true,
            headers: Vec::new(),
            sent: Vec::new(),
        }
    }

    fn set(&mut self, name: &str, value: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn clear(&mut self, name: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    fn attach(&mut self, _attachment: Attachment) {}

    fn send(&mut self, body: &[u8], _log_level: LogLevel, _mock: bool) -> bool {
        self.sent = body.to_vec();
        self.transcript = if self.accept {
            "220 ok\nDATA\n354 go\nSubject: scripted\n\nline\n250 OK\nQUIT\n221 Bye\n".to_string()
        } else {
            "220 ok\n451 try later\nQUIT\n".to_string()
        };
        self.accept
    }

    fn log(&self) -> String {
        self.transcript.clone()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn simulated(config: MailerConfig) -> Mailer<SimulatedTransport> {
    Mailer::new(config)
}

#[test]
fn test_send_and_save_roundtrip() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = MailerConfig {
        from_mail: Some("noreply@example.com".to_string()),
        storage_path: dir.path().join("archive"),
        ..MailerConfig::default()
    };

    let mut mailer = simulated(config);
    mailer.add_to("ann@example.com", Some("Ann"));
    mailer.add_bcc("audit@example.com", None);
    mailer.set_text("Hello Ann");

    let report = mailer.send("Welcome", false);
    assert!(report.success);
    assert!(report.transcript_available);
    assert_eq!(mailer.transport().delivered().len(), 1);

    let path = mailer.save("welcome.eml").unwrap().unwrap();
    assert_eq!(path, dir.path().join("archive").join("welcome.eml"));

    let eml = std::fs::read_to_string(&path).unwrap();
    assert!(eml.contains("From: <noreply@example.com>\n"));
    assert!(eml.contains("To: \"Ann\" <ann@example.com>\n"));
    assert!(eml.contains("Subject: Welcome\n"));
    assert!(!eml.contains("Bcc:"));
    assert!(eml.ends_with("\nHello Ann\n"));

    let log = mailer.log();
    assert!(log.contains("RCPT TO: <audit@example.com>"));
}

#[test]
fn test_non_verbose_send_is_not_archived() {
    for level in [LogLevel::Commands, LogLevel::Quiet] {
        let dir = tempfile::tempdir().unwrap();
        let config = MailerConfig {
            storage_path: dir.path().join("archive"),
            ..MailerConfig::default()
        };
        let mut mailer = simulated(config);
        mailer.add_to("ann@example.com", None);
        mailer.set_text("Hello Ann");

        let report = mailer.send_with_log("Welcome", true, level);
        assert!(report.success, "{level:?}");
        assert!(!report.transcript_available, "{level:?}");
        assert!(mailer.save("welcome.eml").unwrap().is_none(), "{level:?}");
        assert!(!dir.path().join("archive").exists(), "{level:?}");
    }
}

#[test]
fn test_verbose_after_quiet_is_archived() {
    let dir = tempfile::tempdir().unwrap();
    let config = MailerConfig {
        storage_path: dir.path().to_path_buf(),
        ..MailerConfig::default()
    };
    let mut mailer = simulated(config);
    mailer.add_to("ann@example.com", None);
    mailer.set_text("Hello Ann");

    mailer.send_with_log("first", true, LogLevel::Quiet);
    let report = mailer.send_with_log("second", true, LogLevel::Verbose);
    assert!(report.transcript_available);

    let path = mailer.save("second.eml").unwrap().unwrap();
    let eml = std::fs::read_to_string(path).unwrap();
    assert!(eml.contains("Subject: second\n"));
    assert!(eml.ends_with("\nHello Ann\n"));
}

#[test]
fn test_multipart_boundary_matches_header() {
    let mut mailer = simulated(MailerConfig::default());
    mailer.add_to("ann@example.com", None);
    mailer.set_text("plain");
    mailer.set_html("<p>html</p>");
    assert!(mailer.send("Both", true).success);

    let content_type = mailer
        .transport()
        .headers()
        .get("Content-Type")
        .map(ContentType::parse)
        .unwrap()
        .unwrap();
    assert_eq!(content_type.main_type, "multipart");
    assert_eq!(content_type.sub_type, "alternative");
    let boundary = content_type.boundary().unwrap().to_string();

    let message = String::from_utf8(mailer.transport().last_message().unwrap().to_vec()).unwrap();
    let body = message.split_once("\r\n\r\n").unwrap().1;
    let expected = format!(
        "--{boundary}\r\nContent-Type: text/plain; charset=UTF-8\r\n\r\nplain\r\n\r\n\
         --{boundary}\r\nContent-Type: text/html; charset=UTF-8\r\n\r\n<p>html</p>\r\n\r\n\
         --{boundary}--\r\n"
    );
    assert_eq!(body, expected);
}

#[test]
fn test_fresh_boundary_per_send() {
    let mut mailer = simulated(MailerConfig::default());
    mailer.add_to("ann@example.com", None);
    mailer.set_text("plain");
    mailer.set_html("<p>html</p>");

    mailer.send("one", true);
    let first = mailer.transport().headers().get("Content-Type").unwrap().to_string();
    mailer.send("two", true);
    let second = mailer.transport().headers().get("Content-Type").unwrap().to_string();
    assert_ne!(first, second);
}

#[test]
fn test_failure_hook_receives_transcript() {
    init_tracing();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let mut mailer = simulated(MailerConfig::default()).on_failure(move |mailer, log| {
        let to: Vec<String> = mailer
            .recipients(mailsmith_core::Role::To)
            .map(|(email, _)| email.to_string())
            .collect();
        sink.lock().unwrap().push((to, log.to_string()));
    });
    mailer.transport_mut().reject_with(550, "Relaying denied");
    mailer.add_to("ann@example.com", None);
    mailer.set_text("x");

    let report = mailer.send("Denied", false);
    assert!(!report.success);
    assert!(!report.transcript_available);
    assert!(mailer.save("denied.eml").unwrap().is_none());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, vec!["ann@example.com".to_string()]);
    assert!(seen[0].1.contains("550 Relaying denied"));
}

#[test]
fn test_success_does_not_call_hook() {
    let called = Arc::new(Mutex::new(false));
    let sink = Arc::clone(&called);
    let mut mailer =
        simulated(MailerConfig::default()).on_failure(move |_, _| *sink.lock().unwrap() = true);
    mailer.add_to("ann@example.com", None);

    assert!(mailer.send("ok", true).success);
    assert!(!*called.lock().unwrap());
}

#[test]
fn test_empty_recipients_are_not_rejected_by_mailer() {
    let mut mailer = simulated(MailerConfig::default());
    mailer.set_text("nobody");

    // the simulated server refuses, the mailer just relays it
    let report = mailer.send("Nobody", true);
    assert!(!report.success);
    assert!(mailer.log().contains("554 No valid recipients"));
}

#[test]
fn test_reset_all_starts_fresh_session() {
    let config = MailerConfig {
        from_mail: Some("noreply@example.com".to_string()),
        ..MailerConfig::default()
    };
    let mut mailer = simulated(config);
    mailer.add_to("ann@example.com", None);
    mailer.set_text("kept");
    mailer.set("X-Campaign", "7");
    mailer.send("first", true);

    mailer.reset_all();
    assert_eq!(mailer.log(), "220 localhost ESMTP simulated\n");
    assert_eq!(mailer.recipients(mailsmith_core::Role::To).count(), 0);

    let headers = mailer.transport().headers();
    assert_eq!(headers.get("From"), Some("<noreply@example.com>"));
    assert!(headers.get("X-Campaign").is_none());
    assert!(headers.get("To").is_none());
    assert_eq!(mailer.parts().count(), 1);
}

#[test]
fn test_long_unicode_subject_is_folded() {
    let mut mailer = simulated(MailerConfig::default());
    mailer.add_to("ann@example.com", None);
    let subject = "Ваш заказ №4711 отправлен и будет доставлен в течение трёх рабочих дней";
    mailer.send(subject, true);

    let encoded = mailer.transport().headers().get("Subject").unwrap().to_string();
    assert!(encoded.contains("\r\n "));
    for line in encoded.split("\r\n") {
        assert!(line.len() <= 75, "line too long: {line:?}");
    }
    assert_eq!(decode_header(&encoded).unwrap(), subject);
}

#[test]
fn test_attachment_wraps_in_mixed() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("notes.txt");
    std::fs::write(&file, b"attached bytes").unwrap();

    let mut mailer = simulated(MailerConfig::default());
    mailer.add_to("ann@example.com", None);
    mailer.set_text("see attachment");
    mailer.attach_file(&file, Some("readme.txt"), None);
    assert!(mailer.send("Files", false).success);

    let message = String::from_utf8(mailer.transport().delivered()[0].clone()).unwrap();
    assert!(message.contains("Content-Type: multipart/mixed; boundary="));
    assert!(message.contains("Content-Type: text/plain; charset=UTF-8\r\n\r\nsee attachment\r\n"));
    assert!(message.contains("filename=\"readme.txt\""));
    assert!(message.contains("YXR0YWNoZWQgYnl0ZXM="));
}

#[test]
fn test_custom_transport() {
    let mut mailer: Mailer<ScriptedTransport> = Mailer::new(MailerConfig::default());
    mailer.add_cc("cc@example.com", None);
    mailer.set_text("body");

    let report = mailer.send("Scripted", false);
    assert!(report.success);
    assert_eq!(mailer.transport().sent, b"body\r\n");
    assert!(
        mailer
            .transport()
            .headers
            .iter()
            .any(|(name, value)| name == "Cc" && value == "<cc@example.com>")
    );
    assert_eq!(transcript::extract(&mailer.log()), "Subject: scripted\n\nline\n");

    mailer.transport_mut().accept = false;
    let report = mailer.send("Scripted", false);
    assert!(!report.success);
    assert!(!report.transcript_available);
}

#[test]
fn test_tracked_html_and_jump_roundtrip() {
    let mut config = MailerConfig::default();
    config.tracking.jump_links = true;
    config.tracking.base_url = "https://t.example.com".to_string();

    let mut mailer = simulated(config.clone());
    mailer.set_html("<p><a href=\"https://shop.example.com/item?id=9&amp;ref=mail\">Buy</a></p>");
    let html = mailer.parts().next().unwrap().content.clone();

    let query = html
        .split_once("mailer-jump?")
        .and_then(|(_, rest)| rest.split_once('"'))
        .map(|(query, _)| query.to_string())
        .unwrap();

    let clicks = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&clicks);
    let tracker = Tracker::new(config.tracking)
        .on_jump(move |target, _| sink.lock().unwrap().push(target.to_string()));

    let target = tracker.jump(&query).unwrap();
    assert_eq!(target, "https://shop.example.com/item?id=9&ref=mail");
    assert_eq!(*clicks.lock().unwrap(), vec![target]);
}
