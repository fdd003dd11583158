#![allow(clippy::print_stdout)]
//! Example: compose a message and print the simulated SMTP session.
//!
//! Optionally reads a JSON config file given as the first argument.
//!
//! ```bash
//! RUST_LOG=mailsmith_core=debug cargo run --package mailsmith-core --example preview
//! ```

use mailsmith_core::{Mailer, MailerConfig, Result, SimulatedTransport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailsmith_core=info,mailsmith_mime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => MailerConfig::from_json_file(path)?,
        None => {
            let mut config = MailerConfig::default();
            config.from_mail = Some("noreply@example.com".to_string());
            config.from_name = Some("Mailsmith Preview".to_string());
            config.tracking.jump_links = true;
            config.tracking.base_url = "https://example.com".to_string();
            config
        }
    };

    let mut mailer: Mailer<SimulatedTransport> = Mailer::new(config);
    mailer.add_to("jürgen@example.com", Some("Jürgen Müller"));
    mailer.add_cc("team@example.com", Some("Team"));
    mailer.set_text("Hallo Jürgen,\r\nIhre Bestellung ist unterwegs.");
    mailer.set_html(
        "<p>Hallo Jürgen,</p><p>Ihre <a href=\"https://shop.example.com/orders/4711\">Bestellung</a> ist unterwegs.</p>",
    );

    let report = mailer.send("Ihre Bestellung №4711 ist unterwegs – vielen Dank für Ihren Einkauf", true);
    println!("{}", mailer.log());
    println!("success: {}, archivable: {}", report.success, report.transcript_available);

    Ok(())
}
