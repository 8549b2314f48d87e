use std::{
    io::{BufRead, BufReader, Write},
    net::{TcpListener, TcpStream},
    thread::{self, JoinHandle},
};

/// A single connection SMTP relay on localhost
///
/// Accepts every command, answers `AUTH LOGIN` with the usual challenges and
/// records every line it receives.
pub struct StubRelay {
    pub port: u16,
    handle: JoinHandle<Vec<String>>,
}

impl StubRelay {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            serve(stream)
        });

        StubRelay { port, handle }
    }

    /// Waits for the client to hang up and returns the lines it sent
    pub fn received(self) -> Vec<String> {
        self.handle.join().unwrap()
    }
}

fn serve(stream: TcpStream) -> Vec<String> {
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);
    let mut received = Vec::new();
    let mut auth_step = 0;
    let mut in_data = false;

    let mut reply = |line: &str| {
        // the client may be gone already
        let _ = writer.write_all(format!("{line}\r\n").as_bytes());
    };
    reply("220 stub.localhost ESMTP ready");

    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let command = line.trim_end_matches(['\r', '\n']).to_owned();
        received.push(command.clone());

        if in_data {
            if command == "." {
                in_data = false;
                reply("250 2.0.0 OK queued");
            }
            continue;
        }

        if auth_step == 1 {
            auth_step = 2;
            reply("334 UGFzc3dvcmQ6");
            continue;
        }
        if auth_step == 2 {
            auth_step = 0;
            reply("235 2.7.0 Authentication successful");
            continue;
        }

        match command.to_ascii_uppercase().as_str() {
            c if c.starts_with("EHLO") => {
                reply("250-stub.localhost");
                reply("250-8BITMIME");
                reply("250 AUTH LOGIN");
            }
            "AUTH LOGIN" => {
                auth_step = 1;
                reply("334 VXNlcm5hbWU6");
            }
            "DATA" => {
                in_data = true;
                reply("354 End data with <CR><LF>.<CR><LF>");
            }
            "QUIT" => {
                reply("221 2.0.0 Bye");
                break;
            }
            _ => reply("250 OK"),
        }
    }

    received
}

/// Prints the client's wire trace with the test output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A port nobody listens on
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub fn config_json(port: u16) -> String {
    format!(
        r#"{{
            "defaults": {{ "connection": "stub", "port": 25, "timeout": 5, "security": "none" }},
            "connections": {{
                "stub": {{
                    "host": "127.0.0.1",
                    "port": {port},
                    "username": "user@localhost",
                    "password": "secret"
                }}
            }}
        }}"#
    )
}
