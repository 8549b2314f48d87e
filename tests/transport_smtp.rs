mod common;

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use relaymail::{
        config::MailerConfig,
        smtp::{authentication::CheckedLogin, client::SessionState, SmtpSession},
        Mail,
    };

    use crate::common::{closed_port, config_json, init_tracing, StubRelay};

    #[test]
    fn send_through_stub_relay() {
        init_tracing();
        let relay = StubRelay::start();
        let config = MailerConfig::from_json(&config_json(relay.port)).unwrap();

        let mut mail = Mail::connect(&config).unwrap();
        mail.from = "John Doe <john@localhost>".to_owned();
        mail.to = "root@localhost".into();
        mail.bcc = "Hidden <hidden@localhost>".into();
        mail.subject = "Hello ß☺ example".to_owned();
        mail.body = "Be happy!\n.\nBye".to_owned();
        mail.add_header("X-Mailer", "relaymail");

        assert!(mail.send());

        let tags = mail.conversation_log().tags().collect::<Vec<_>>();
        assert_eq!(
            tags,
            vec![
                "CONNECTION",
                "EHLO",
                "AUTH LOGIN",
                "USERNAME",
                "PASSWORD",
                "MAIL FROM",
                "RCPT TO",
                "RCPT TO",
                "DATA",
                "DATA",
                "QUIT"
            ]
        );
        assert_eq!(
            mail.conversation_log().entries()[1].response(),
            "250-stub.localhost | 250-8BITMIME | 250 AUTH LOGIN"
        );
        assert_eq!(mail.session().state(), SessionState::Closed);

        let received = relay.received();
        assert_eq!(
            received,
            vec![
                "EHLO",
                "AUTH LOGIN",
                "dXNlckBsb2NhbGhvc3Q=",
                "c2VjcmV0",
                "MAIL FROM:<john@localhost>",
                "RCPT TO:<root@localhost>",
                "RCPT TO:<hidden@localhost>",
                "DATA",
                "MIME-Version: 1.0",
                "From: John Doe <john@localhost>",
                "Subject: Hello ß☺ example",
                "To: root@localhost",
                "X-Mailer: relaymail",
                "",
                "Be happy!",
                "..",
                "Bye",
                ".",
                "QUIT",
            ]
        );
    }

    #[test]
    fn display_log_after_send() {
        let relay = StubRelay::start();
        let config = MailerConfig::from_json(&config_json(relay.port)).unwrap();

        let mut mail = Mail::connect(&config).unwrap();
        mail.from = "john@localhost".to_owned();
        mail.to = "root@localhost".into();
        assert!(mail.send());
        relay.received();

        let log = mail.display_log();
        assert!(log.starts_with("-- START OF LOG --\n[CONNECTION]\t 220 stub.localhost ESMTP ready\n"));
        assert!(log.contains("[DATA]\t 250 2.0.0 OK queued\n"));
        assert!(log.ends_with("[QUIT]\t 221 2.0.0 Bye\n-- END OF LOG --\n"));
    }

    #[test]
    fn session_with_checked_login() {
        init_tracing();
        let relay = StubRelay::start();
        let config = MailerConfig::from_json(&config_json(relay.port)).unwrap();

        let mut session = SmtpSession::builder(config.profile(Some("stub")).unwrap())
            .authenticator(CheckedLogin)
            .open()
            .unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert!(!session.is_encrypted());

        let response = session.send_command("NOOP").unwrap();
        assert!(response.has_code(250));

        session.exchange("QUIT", "QUIT").unwrap();
        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);

        assert_eq!(relay.received().last().map(String::as_str), Some("QUIT"));
    }

    #[test]
    fn refused_connection() {
        let config = MailerConfig::from_json(&config_json(closed_port())).unwrap();
        let err = Mail::connect(&config).unwrap_err();
        assert!(err.is_connection());
    }

    #[test]
    fn unknown_profile() {
        let config = MailerConfig::from_json(&config_json(closed_port())).unwrap();
        let err = SmtpSession::from_config(&config, Some("missing")).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "configuration error: mail connection not found: \"missing\""
        );
    }
}
