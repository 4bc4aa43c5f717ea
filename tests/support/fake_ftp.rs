//! Minimal in-process FTP server for integration tests.
//!
//! Serves a fixed set of files over passive or active data connections and
//! records every command it receives. Can refuse the first N sessions with a
//! 421 greeting to exercise retry. In `TYPE A` files are sent with CRLF
//! line endings, as the network ASCII representation requires.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
struct ServerState {
    files: HashMap<String, Vec<u8>>,
    credentials: Option<(String, String)>,
    refuse_first: u32,
    reset_listings: bool,
    sessions: AtomicU32,
    commands: Mutex<Vec<String>>,
}

/// Builder for [`FakeFtpServer`].
#[derive(Default)]
pub struct FakeFtpServerBuilder {
    state: ServerState,
}

impl FakeFtpServerBuilder {
    /// Serves `data` at `path`.
    pub fn file(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.state.files.insert(path.to_string(), data.into());
        self
    }

    /// Only this user/password pair may log in. Without it any login works.
    pub fn credentials(mut self, user: &str, password: &str) -> Self {
        self.state.credentials = Some((user.to_string(), password.to_string()));
        self
    }

    /// Greets the first `sessions` connections with 421 and hangs up.
    pub fn refuse_first(mut self, sessions: u32) -> Self {
        self.state.refuse_first = sessions;
        self
    }

    /// Resets every `LIST` data connection and answers 426.
    pub fn reset_listings(mut self) -> Self {
        self.state.reset_listings = true;
        self
    }

    pub async fn start(self) -> FakeFtpServer {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake FTP server");
        let addr = listener.local_addr().expect("local addr");
        let state = Arc::new(self.state);

        let accept_state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = Arc::clone(&accept_state);
                tokio::spawn(async move {
                    let _ = serve(stream, state).await;
                });
            }
        });

        FakeFtpServer { addr, state }
    }
}

/// Running fake server. Stops when the test runtime shuts down.
pub struct FakeFtpServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
}

impl FakeFtpServer {
    pub fn builder() -> FakeFtpServerBuilder {
        FakeFtpServerBuilder::default()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// `ftp://127.0.0.1:<port><path>`
    pub fn url(&self, path: &str) -> String {
        format!("ftp://127.0.0.1:{}{}", self.addr.port(), path)
    }

    /// Number of control connections accepted so far.
    pub fn sessions(&self) -> u32 {
        self.state.sessions.load(Ordering::SeqCst)
    }

    /// Every command line received, in order, across sessions.
    pub fn commands(&self) -> Vec<String> {
        self.state.commands.lock().expect("commands lock").clone()
    }

    pub fn received(&self, command: &str) -> bool {
        self.commands().iter().any(|c| c == command)
    }
}

async fn reply(writer: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    writer.write_all(format!("{line}\r\n").as_bytes()).await?;
    writer.flush().await
}

enum DataChannel {
    Passive(TcpListener),
    Active(SocketAddr),
}

impl DataChannel {
    async fn open(self) -> std::io::Result<TcpStream> {
        match self {
            Self::Passive(listener) => Ok(listener.accept().await?.0),
            Self::Active(addr) => TcpStream::connect(addr).await,
        }
    }
}

fn parse_port_argument(arg: &str) -> Option<SocketAddr> {
    let parts: Vec<u16> = arg
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    let [a, b, c, d, hi, lo] = parts.as_slice() else {
        return None;
    };
    let ip = format!("{a}.{b}.{c}.{d}").parse().ok()?;
    Some(SocketAddr::new(ip, hi * 256 + lo))
}

fn to_network_ascii(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        if byte == b'\n' {
            out.push(b'\r');
        }
        out.push(byte);
    }
    out
}

fn listing_line(path: &str, size: usize) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    format!("-rw-r--r--    1 ftp      ftp      {size:>8} Mar 14 09:26 {name}\r\n")
}

async fn serve(stream: TcpStream, state: Arc<ServerState>) -> std::io::Result<()> {
    let session = state.sessions.fetch_add(1, Ordering::SeqCst) + 1;
    let (read, mut writer) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    if session <= state.refuse_first {
        return reply(&mut writer, "421 Too many users, try again later.").await;
    }

    writer
        .write_all(b"220-Fake FTP server\r\n220-For tests only\r\n220 Ready.\r\n")
        .await?;
    writer.flush().await?;

    let mut user = String::new();
    let mut ascii = false;
    let mut data_channel: Option<DataChannel> = None;

    while let Some(line) = lines.next_line().await? {
        state
            .commands
            .lock()
            .expect("commands lock")
            .push(line.clone());
        let (command, arg) = line.split_once(' ').unwrap_or((line.as_str(), ""));

        match command.to_ascii_uppercase().as_str() {
            "USER" => {
                user = arg.to_string();
                reply(&mut writer, "331 Please specify the password.").await?;
            }
            "PASS" => {
                let accepted = state
                    .credentials
                    .as_ref()
                    .is_none_or(|(u, p)| *u == user && p == arg);
                if accepted {
                    reply(&mut writer, "230 Login successful.").await?;
                } else {
                    reply(&mut writer, "530 Login incorrect.").await?;
                }
            }
            "TYPE" => {
                ascii = arg.eq_ignore_ascii_case("A");
                reply(&mut writer, &format!("200 Switching to {arg} mode.")).await?;
            }
            "MODE" if arg == "S" => reply(&mut writer, "200 Mode set to S.").await?,
            "MODE" => reply(&mut writer, "504 Bad MODE command.").await?,
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let port = listener.local_addr()?.port();
                data_channel = Some(DataChannel::Passive(listener));
                reply(
                    &mut writer,
                    &format!(
                        "227 Entering Passive Mode (127,0,0,1,{},{}).",
                        port >> 8,
                        port & 0xff
                    ),
                )
                .await?;
            }
            "PORT" => match parse_port_argument(arg) {
                Some(addr) => {
                    data_channel = Some(DataChannel::Active(addr));
                    reply(&mut writer, "200 PORT command successful.").await?;
                }
                None => reply(&mut writer, "501 Illegal PORT command.").await?,
            },
            "LIST" | "RETR" => {
                let Some(data) = state.files.get(arg) else {
                    data_channel = None;
                    reply(&mut writer, "550 Failed to open file.").await?;
                    continue;
                };
                let Some(channel) = data_channel.take() else {
                    reply(&mut writer, "425 Use PORT or PASV first.").await?;
                    continue;
                };
                let is_list = command.eq_ignore_ascii_case("LIST");
                let payload = if is_list {
                    listing_line(arg, data.len()).into_bytes()
                } else if ascii {
                    to_network_ascii(data)
                } else {
                    data.clone()
                };
                reply(&mut writer, "150 Opening data connection.").await?;
                let mut data_stream = channel.open().await?;
                if is_list && state.reset_listings {
                    #[allow(deprecated)]
                    data_stream.set_linger(Some(Duration::ZERO))?;
                    drop(data_stream);
                    reply(&mut writer, "426 Connection closed; transfer aborted.").await?;
                    continue;
                }
                data_stream.write_all(&payload).await?;
                data_stream.shutdown().await?;
                drop(data_stream);
                reply(&mut writer, "226 Transfer complete.").await?;
            }
            "QUIT" => {
                reply(&mut writer, "221 Goodbye.").await?;
                break;
            }
            _ => reply(&mut writer, "502 Command not implemented.").await?,
        }
    }
    Ok(())
}
