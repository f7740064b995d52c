//! Dispatch pipeline tests.
//!
//! Delivery goes through a recording transport factory, so these tests
//! observe exactly what would have been sent and whether a transport was
//! ever built.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use courier_core::message::keyed::FORGOT_PASSWORD;
use courier_core::transport::SmtpOptions;
use courier_core::{
    DispatchEvent, DispatchState, EmailSettings, Error, FileAttachment, HookVerdict, Mailer,
    MailerConfig, MemoryUserDirectory, Message, PASSWORD_MASK, Recipient, SendHook,
    SettingsProvider, Transport, TransportFactory, TransportPlan, UserId, Variables,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct Recorder {
    plans: Mutex<Vec<TransportPlan>>,
    prepared: AtomicUsize,
    delivered: Mutex<Vec<courier_mime::Message>>,
    failure: Option<String>,
}

impl Recorder {
    fn failing(detail: &str) -> Self {
        Self {
            failure: Some(detail.to_string()),
            ..Self::default()
        }
    }

    fn plans(&self) -> Vec<TransportPlan> {
        self.plans.lock().unwrap().clone()
    }

    fn delivered(&self) -> Vec<courier_mime::Message> {
        self.delivered.lock().unwrap().clone()
    }

    fn only_delivered(&self) -> courier_mime::Message {
        let delivered = self.delivered();
        assert_eq!(delivered.len(), 1, "expected exactly one delivery");
        delivered.into_iter().next().unwrap()
    }
}

struct RecordingFactory(Arc<Recorder>);

impl TransportFactory for RecordingFactory {
    fn build(&self, plan: &TransportPlan) -> Arc<dyn Transport> {
        self.0.plans.lock().unwrap().push(plan.clone());
        Arc::new(RecordingTransport(Arc::clone(&self.0)))
    }
}

struct RecordingTransport(Arc<Recorder>);

#[async_trait]
impl Transport for RecordingTransport {
    async fn prepare(&self) -> courier_core::Result<()> {
        self.0.prepared.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn deliver(&self, message: &courier_mime::Message) -> courier_core::Result<()> {
        if let Some(detail) = &self.0.failure {
            return Err(Error::Delivery(detail.clone()));
        }
        self.0.delivered.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct RecordingHook {
    verdict: HookVerdict,
    before: AtomicUsize,
    after: AtomicUsize,
    events: Mutex<Vec<DispatchEvent>>,
}

impl RecordingHook {
    fn new(verdict: HookVerdict) -> Arc<Self> {
        Arc::new(Self {
            verdict,
            before: AtomicUsize::new(0),
            after: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        })
    }

    fn counts(&self) -> (usize, usize) {
        (
            self.before.load(Ordering::SeqCst),
            self.after.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl SendHook for RecordingHook {
    async fn before_send(&self, event: &DispatchEvent) -> HookVerdict {
        self.before.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(event.clone());
        self.verdict
    }

    async fn after_send(&self, _event: &DispatchEvent) {
        self.after.fetch_add(1, Ordering::SeqCst);
    }
}

fn smtp_settings() -> EmailSettings {
    EmailSettings {
        protocol: Some("smtp".into()),
        email_address: Some("noreply@example.com".into()),
        sender_name: Some("Acme".into()),
        host: Some("smtp.example.com".into()),
        port: Some(587),
        ..EmailSettings::default()
    }
}

struct Harness {
    mailer: Mailer,
    recorder: Arc<Recorder>,
    provider: Arc<SettingsProvider>,
}

fn harness_with(
    settings: &EmailSettings,
    config: MailerConfig,
    recorder: Recorder,
    hooks: &[Arc<RecordingHook>],
) -> Harness {
    init_tracing();
    let recorder = Arc::new(recorder);
    let provider = Arc::new(SettingsProvider::from_settings(settings).unwrap());
    let mut builder = Mailer::builder(Arc::clone(&provider))
        .config(config)
        .transports(Arc::new(RecordingFactory(Arc::clone(&recorder))));
    for hook in hooks {
        builder = builder.hook(hook.clone());
    }
    Harness {
        mailer: builder.build(),
        recorder,
        provider,
    }
}

fn harness(settings: &EmailSettings) -> Harness {
    harness_with(settings, MailerConfig::default(), Recorder::default(), &[])
}

fn vars(value: Value) -> Variables {
    value.as_object().cloned().unwrap()
}

fn ann() -> Recipient {
    Recipient::placeholder("ann@x.com").with_name(Some("Ann".into()), None)
}

#[tokio::test]
async fn test_scenario_markdown_fallback() {
    let h = harness(&smtp_settings());
    let message = Message::new(
        "Hi {{user.firstName}}",
        "Hello {{user.firstName}}, click {{link}}",
    );

    let outcome = h
        .mailer
        .send(&ann(), &message, vars(json!({"link": "http://x/y"})))
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.state, DispatchState::Completed);
    let sent = h.recorder.only_delivered();
    assert_eq!(sent.subject(), "Hi Ann");
    assert_eq!(sent.text_body(), Some("Hello Ann, click http://x/y"));
    assert_eq!(sent.html_body(), Some("<p>Hello Ann, click http://x/y</p>\n"));
}

#[tokio::test]
async fn test_explicit_html_body_is_rendered_and_plain_untransformed() {
    let h = harness(&smtp_settings());
    let message = Message::new("Order {{ order }}", "**Order** {{ order }} shipped")
        .html_body("<h1>Order {{ order }}</h1>");

    h.mailer
        .send(&ann(), &message, vars(json!({"order": 42})))
        .await
        .unwrap();

    let sent = h.recorder.only_delivered();
    assert_eq!(sent.html_body(), Some("<h1>Order 42</h1>"));
    assert_eq!(sent.text_body(), Some("**Order** 42 shipped"));
}

#[tokio::test]
async fn test_user_variable_overrides_caller() {
    let hook = RecordingHook::new(HookVerdict::Proceed);
    let h = harness_with(
        &smtp_settings(),
        MailerConfig::default(),
        Recorder::default(),
        &[hook.clone()],
    );
    let message = Message::new("{{ user.email }}", "{{ user.friendlyName }} / {{ siteName }}");

    h.mailer
        .send(
            &ann(),
            &message,
            vars(json!({"user": {"email": "mallory@evil.com"}, "siteName": "Acme"})),
        )
        .await
        .unwrap();

    let sent = h.recorder.only_delivered();
    assert_eq!(sent.subject(), "ann@x.com");
    assert_eq!(sent.text_body(), Some("Ann / Acme"));

    // Hooks see the caller's variables
    let events = hook.events.lock().unwrap();
    assert_eq!(events[0].variables["user"]["email"], "mallory@evil.com");
}

#[tokio::test]
async fn test_site_name_injected_when_absent() {
    let config = MailerConfig::builder().site_name("Acme Store").build();
    let h = harness_with(&smtp_settings(), config, Recorder::default(), &[]);

    h.mailer
        .send(&ann(), &Message::new("{{ siteName }}", "x"), Variables::new())
        .await
        .unwrap();

    assert_eq!(h.recorder.only_delivered().subject(), "Acme Store");
}

#[tokio::test]
async fn test_cancelled_by_hook() {
    let cancel = RecordingHook::new(HookVerdict::Cancel);
    let later = RecordingHook::new(HookVerdict::Proceed);
    let h = harness_with(
        &smtp_settings(),
        MailerConfig::default(),
        Recorder::default(),
        &[cancel.clone(), later.clone()],
    );

    let outcome = h
        .mailer
        .send(&ann(), &Message::new("s", "b"), Variables::new())
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome.is_cancelled());
    assert_eq!(outcome.error_detail, None);
    assert_eq!(cancel.counts(), (1, 0));
    assert_eq!(later.counts(), (0, 0));
    assert!(h.recorder.plans().is_empty());
    assert!(h.recorder.delivered().is_empty());
}

#[tokio::test]
async fn test_hooks_fire_around_successful_send() {
    let first = RecordingHook::new(HookVerdict::Proceed);
    let second = RecordingHook::new(HookVerdict::Proceed);
    let h = harness_with(
        &smtp_settings(),
        MailerConfig::default(),
        Recorder::default(),
        &[first.clone(), second.clone()],
    );

    h.mailer
        .send(&ann(), &Message::new("s", "b"), Variables::new())
        .await
        .unwrap();

    assert_eq!(first.counts(), (1, 1));
    assert_eq!(second.counts(), (1, 1));
}

#[tokio::test]
async fn test_missing_protocol_fails_before_hooks() {
    let hook = RecordingHook::new(HookVerdict::Proceed);
    let settings = EmailSettings {
        protocol: None,
        ..smtp_settings()
    };
    let h = harness_with(&settings, MailerConfig::default(), Recorder::default(), &[hook.clone()]);

    let err = h
        .mailer
        .send(&ann(), &Message::new("s", "b"), Variables::new())
        .await
        .unwrap_err();

    assert!(matches!(&err, Error::Configuration(m) if m == "cannot determine send method"));
    assert_eq!(hook.counts(), (0, 0));
    assert!(h.recorder.plans().is_empty());
}

#[tokio::test]
async fn test_pop_with_missing_fields_fails_before_handshake() {
    for missing in ["host", "port", "username", "password"] {
        let mut settings = EmailSettings {
            protocol: Some("pop".into()),
            username: Some("mailer".into()),
            password: Some("secret".into()),
            ..smtp_settings()
        };
        match missing {
            "host" => settings.host = Some(String::new()),
            "port" => settings.port = None,
            "username" => settings.username = Some(String::new()),
            _ => settings.password = None,
        }
        let h = harness(&settings);

        let err = h
            .mailer
            .send(&ann(), &Message::new("s", "b"), Variables::new())
            .await
            .unwrap_err();

        assert!(
            matches!(&err, Error::Configuration(m) if m == "host/port/username/password required"),
            "{missing}: {err}"
        );
        assert!(h.recorder.plans().is_empty());
        assert_eq!(h.recorder.prepared.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_pop_runs_preflight_then_sends() {
    let settings = EmailSettings {
        protocol: Some("pop".into()),
        username: Some("mailer".into()),
        password: Some("secret".into()),
        ..smtp_settings()
    };
    let h = harness(&settings);

    h.mailer
        .send(&ann(), &Message::new("s", "b"), Variables::new())
        .await
        .unwrap();

    assert_eq!(h.recorder.prepared.load(Ordering::SeqCst), 1);
    assert!(matches!(
        &h.recorder.plans()[0],
        TransportPlan::PopBeforeSmtp { pop, smtp } if pop.port == 587 && smtp.host == "smtp.example.com"
    ));
    assert_eq!(h.recorder.delivered().len(), 1);
}

#[tokio::test]
async fn test_smtp_auth_without_username() {
    let settings = EmailSettings {
        smtp_auth: true,
        username: Some(String::new()),
        password: Some("secret".into()),
        ..smtp_settings()
    };
    let h = harness(&settings);

    let err = h
        .mailer
        .send(&ann(), &Message::new("s", "b"), Variables::new())
        .await
        .unwrap_err();

    match err {
        Error::Configuration(message) => {
            assert!(message.contains("username") && message.contains("password"));
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
    assert!(h.recorder.plans().is_empty());
}

#[tokio::test]
async fn test_smtp_plan_from_settings() {
    let settings = EmailSettings {
        smtp_auth: true,
        username: Some("mailer".into()),
        password: Some("secret".into()),
        smtp_keep_alive: true,
        smtp_secure_transport_type: Some("ssl".into()),
        timeout: Some(30),
        ..smtp_settings()
    };
    let h = harness(&settings);

    h.mailer
        .send(&ann(), &Message::new("s", "b"), Variables::new())
        .await
        .unwrap();

    let plans = h.recorder.plans();
    let TransportPlan::Smtp(SmtpOptions {
        keep_alive,
        security,
        timeout,
        credentials,
        ..
    }) = &plans[0]
    else {
        panic!("expected smtp plan");
    };
    assert!(*keep_alive);
    assert_eq!(*security, courier_core::transport::Security::Implicit);
    assert_eq!(timeout.as_secs(), 30);
    assert_eq!(credentials.as_ref().map(|c| c.username.as_str()), Some("mailer"));
}

#[tokio::test]
async fn test_test_recipient_override() {
    let config = MailerConfig::builder()
        .test_recipients(["qa@example.com"])
        .build();
    let h = harness_with(&smtp_settings(), config, Recorder::default(), &[]);

    h.mailer
        .send(
            &Recipient::placeholder("someoneelse@example.com"),
            &Message::new("s", "b"),
            Variables::new(),
        )
        .await
        .unwrap();

    let sent = h.recorder.only_delivered();
    assert_eq!(sent.to().len(), 1);
    assert_eq!(sent.to()[0].address.as_str(), "qa@example.com");
    assert_eq!(sent.to()[0].name.as_deref(), Some("Test Email"));
    let formatted = String::from_utf8(sent.formatted()).unwrap();
    assert!(!formatted.contains("someoneelse@example.com"));
}

#[tokio::test]
async fn test_reply_to_and_from() {
    let h = harness(&smtp_settings());
    let message = Message::new("s", "b").reply_to("support@example.com");

    h.mailer.send(&ann(), &message, Variables::new()).await.unwrap();

    let sent = h.recorder.only_delivered();
    assert_eq!(sent.from().address.as_str(), "noreply@example.com");
    assert_eq!(sent.from().name.as_deref(), Some("Acme"));
    let formatted = String::from_utf8(sent.formatted()).unwrap();
    let reply_to = formatted.find("Reply-To:").unwrap();
    let from = formatted.find("\r\nFrom:").unwrap();
    assert!(reply_to < from);
}

#[tokio::test]
async fn test_missing_from_address() {
    let settings = EmailSettings {
        email_address: None,
        ..smtp_settings()
    };
    let h = harness(&settings);

    let err = h
        .mailer
        .send(&ann(), &Message::new("s", "b"), Variables::new())
        .await
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(h.recorder.plans().is_empty());
}

#[tokio::test]
async fn test_delivery_failure_skips_after_hook() {
    let hook = RecordingHook::new(HookVerdict::Proceed);
    let h = harness_with(
        &smtp_settings(),
        MailerConfig::default(),
        Recorder::failing("connection refused"),
        &[hook.clone()],
    );

    let err = h
        .mailer
        .send(&ann(), &Message::new("s", "b"), Variables::new())
        .await
        .unwrap_err();

    assert!(matches!(&err, Error::Delivery(detail) if detail == "connection refused"));
    assert_eq!(hook.counts(), (1, 0));
}

#[tokio::test]
async fn test_missing_attachment_is_delivery_error() {
    let h = harness(&smtp_settings());
    let message = Message::new("s", "b").attach(FileAttachment::new("/nonexistent/report.pdf"));

    let err = h.mailer.send(&ann(), &message, Variables::new()).await.unwrap_err();

    assert!(matches!(err, Error::Delivery(_)));
    assert!(h.recorder.delivered().is_empty());
}

#[tokio::test]
async fn test_render_error_propagates() {
    let h = harness(&smtp_settings());

    let err = h
        .mailer
        .send(&ann(), &Message::new("{% if %}", "b"), Variables::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Render(_)));
    assert!(h.recorder.delivered().is_empty());
}

#[tokio::test]
async fn test_send_email_uses_stored_user() {
    init_tracing();
    let users = Arc::new(MemoryUserDirectory::new());
    users.insert(
        Recipient::user(UserId(7), "ann@x.com").with_name(Some("Annabel".into()), Some("Lee".into())),
    );
    let recorder = Arc::new(Recorder::default());
    let mailer = Mailer::builder(Arc::new(
        SettingsProvider::from_settings(&smtp_settings()).unwrap(),
    ))
    .users(users)
    .transports(Arc::new(RecordingFactory(Arc::clone(&recorder))))
    .build();

    let message = Message::new("Hi {{ user.firstName }} #{{ user.id }}", "b")
        .to("ann@x.com")
        .to_name(Some("Ignored".into()), None);
    mailer.send_email(&message, Variables::new()).await.unwrap();

    let sent = recorder.only_delivered();
    assert_eq!(sent.subject(), "Hi Annabel #7");
    assert_eq!(sent.to()[0].name.as_deref(), Some("Annabel Lee"));
}

#[tokio::test]
async fn test_send_email_builds_placeholder() {
    let h = harness(&smtp_settings());
    let message = Message::new("Hi {{ user.fullName }}", "b")
        .to("bob@x.com")
        .to_name(Some("Bob".into()), Some("Stone".into()));

    h.mailer.send_email(&message, Variables::new()).await.unwrap();

    let sent = h.recorder.only_delivered();
    assert_eq!(sent.subject(), "Hi Bob Stone");
    assert_eq!(sent.to()[0].address.as_str(), "bob@x.com");
}

#[tokio::test]
async fn test_send_by_key_wraps_in_builtin_layout() {
    let config = MailerConfig::builder().site_name("Acme").build();
    let h = harness_with(&smtp_settings(), config, Recorder::default(), &[]);

    h.mailer
        .send_by_key(
            "ann@x.com",
            FORGOT_PASSWORD,
            vars(json!({"link": "https://acme.test/reset/abc"})),
        )
        .await
        .unwrap();

    let sent = h.recorder.only_delivered();
    assert_eq!(sent.subject(), "Reset your password");
    assert_eq!(sent.to()[0].address.as_str(), "ann@x.com");

    let text = sent.text_body().unwrap();
    assert!(text.starts_with("Hey ann@x.com,"));
    assert!(text.contains("To reset your Acme password"));
    assert!(text.contains("https://acme.test/reset/abc"));

    let html = sent.html_body().unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>Acme</title>"));
    assert!(html.contains("<p>https://acme.test/reset/abc</p>"));
}

#[tokio::test]
async fn test_send_by_key_uses_custom_layout() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("mail.html"),
        "<section>{% block body %}{% endblock %}</section>",
    )
    .unwrap();
    let settings = EmailSettings {
        template: Some("mail".into()),
        ..smtp_settings()
    };
    let config = MailerConfig::builder().templates_root(dir.path()).build();
    let h = harness_with(&settings, config, Recorder::default(), &[]);

    h.mailer
        .send_by_key(ann(), FORGOT_PASSWORD, vars(json!({"link": "L"})))
        .await
        .unwrap();

    let html = h.recorder.only_delivered().html_body().unwrap().to_string();
    assert!(html.starts_with("<section><p>Hey Ann,</p>"));
    assert!(html.ends_with("</section>"));
}

#[tokio::test]
async fn test_send_by_key_locale() {
    init_tracing();
    let messages = Arc::new(courier_core::DefaultMessages::new());
    messages.register(FORGOT_PASSWORD, "de", "Passwort zurücksetzen", "Hallo {{ user.friendlyName }}");
    let recorder = Arc::new(Recorder::default());
    let mailer = Mailer::builder(Arc::new(
        SettingsProvider::from_settings(&smtp_settings()).unwrap(),
    ))
    .messages(messages)
    .transports(Arc::new(RecordingFactory(Arc::clone(&recorder))))
    .build();

    mailer
        .send_by_key(ann().with_locale("de-AT"), FORGOT_PASSWORD, Variables::new())
        .await
        .unwrap();

    let sent = recorder.only_delivered();
    assert_eq!(sent.subject(), "Passwort zurücksetzen");
    assert_eq!(sent.text_body(), Some("Hallo Ann"));
}

#[tokio::test]
async fn test_send_by_key_unknown_key() {
    let h = harness(&smtp_settings());
    let err = h
        .mailer
        .send_by_key("ann@x.com", "no_such_key", Variables::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownMessageKey(key) if key == "no_such_key"));
}

#[tokio::test]
async fn test_test_email_masks_password_and_restores_on_failure() {
    let h = harness(&smtp_settings());
    let original = h.provider.settings().await.unwrap();

    let overrides = EmailSettings {
        password: Some("secret".into()),
        host: Some("smtp.test".into()),
        ..EmailSettings::default()
    };
    let report = h.mailer.send_test_email(overrides, "ann@x.com").await;

    assert!(!report.success);
    assert!(report.error.unwrap().contains("cannot determine send method"));
    assert_eq!(report.settings.password.as_deref(), Some(PASSWORD_MASK));
    assert_eq!(report.settings.host.as_deref(), Some("smtp.test"));
    assert!(Arc::ptr_eq(&h.provider.settings().await.unwrap(), &original));
    assert!(h.recorder.plans().is_empty());
}

#[tokio::test]
async fn test_test_email_success_uses_overrides_then_restores() {
    let h = harness(&smtp_settings());
    let overrides = EmailSettings {
        host: Some("smtp.test".into()),
        smtp_auth: true,
        username: Some("tester".into()),
        password: Some("secret".into()),
        ..smtp_settings()
    };

    let report = h.mailer.send_test_email(overrides, ann()).await;

    assert!(report.success, "{:?}", report.error);
    assert_eq!(report.error, None);
    assert_eq!(report.settings.password.as_deref(), Some(PASSWORD_MASK));

    let TransportPlan::Smtp(options) = &h.recorder.plans()[0] else {
        panic!("expected smtp plan");
    };
    assert_eq!(options.host, "smtp.test");

    let sent = h.recorder.only_delivered();
    let text = sent.text_body().unwrap();
    assert!(text.contains("host: smtp.test"));
    assert!(text.contains(&format!("password: {PASSWORD_MASK}")));
    assert!(!text.contains("secret"));

    let restored = h.provider.settings().await.unwrap();
    assert_eq!(restored.host.as_deref(), Some("smtp.example.com"));
}

#[tokio::test]
async fn test_test_email_reports_delivery_failure() {
    let h = harness_with(
        &smtp_settings(),
        MailerConfig::default(),
        Recorder::failing("535 authentication failed"),
        &[],
    );

    let report = h.mailer.send_test_email(smtp_settings(), ann()).await;

    assert!(!report.success);
    assert!(report.error.unwrap().contains("535 authentication failed"));
}

/// Holds the send to `gate_on` inside its before-send hook until released.
struct GateHook {
    gate_on: &'static str,
    entered: tokio::sync::Notify,
    release: tokio::sync::Notify,
}

#[async_trait]
impl SendHook for GateHook {
    async fn before_send(&self, event: &DispatchEvent) -> HookVerdict {
        if event.recipient.email == self.gate_on {
            self.entered.notify_one();
            self.release.notified().await;
        }
        HookVerdict::Proceed
    }
}

#[tokio::test]
async fn test_send_during_test_email_uses_stored_settings() {
    init_tracing();
    let recorder = Arc::new(Recorder::default());
    let gate = Arc::new(GateHook {
        gate_on: "admin@x.com",
        entered: tokio::sync::Notify::new(),
        release: tokio::sync::Notify::new(),
    });
    let provider = Arc::new(SettingsProvider::from_settings(&smtp_settings()).unwrap());
    let mailer = Mailer::builder(Arc::clone(&provider))
        .transports(Arc::new(RecordingFactory(Arc::clone(&recorder))))
        .hook(gate.clone())
        .build();

    let overrides = EmailSettings {
        host: Some("admin-test.example.com".into()),
        ..smtp_settings()
    };
    let test_send = mailer.send_test_email(overrides, "admin@x.com");
    let ordinary = async {
        gate.entered.notified().await;
        let outcome = mailer
            .send(&ann(), &Message::new("s", "b"), Variables::new())
            .await;
        gate.release.notify_one();
        outcome
    };

    let (report, outcome) = tokio::join!(test_send, ordinary);
    assert!(report.success, "{:?}", report.error);
    assert!(outcome.unwrap().success);

    let hosts = smtp_hosts(&recorder.plans());
    assert_eq!(hosts, ["smtp.example.com", "admin-test.example.com"]);
    assert_eq!(
        provider.settings().await.unwrap().host.as_deref(),
        Some("smtp.example.com")
    );
}

fn smtp_hosts(plans: &[TransportPlan]) -> Vec<String> {
    plans
        .iter()
        .map(|plan| match plan {
            TransportPlan::Smtp(options) => options.host.clone(),
            other => panic!("expected smtp plan, got {other:?}"),
        })
        .collect()
}
