use std::{
    io::{Read, Write},
    net::{TcpStream, ToSocketAddrs},
    os::unix::net::UnixStream,
    time::Duration,
};

use jsonlrpc::{
    JsonRpcVersion, RequestId, RequestObject, RequestParams, ResponseObject, RpcClient,
};
use orfail::{Failure, OrFail};

/// The single long-lived connection to the daemon's JSON-RPC endpoint.
///
/// Created once per process and shared by every call issued during its
/// lifetime; torn down implicitly at process exit.
#[derive(Debug)]
pub struct DaemonClient {
    inner: RpcClient<Transport>,
    next_request_id: i64,
}

impl DaemonClient {
    /// Connects to `server_addr`, a Unix domain socket path or an IP
    /// address/hostname paired with `port`. A non-positive `timeout`
    /// disables the per-call deadline.
    pub fn connect(server_addr: &str, port: u16, timeout: f64) -> orfail::Result<Self> {
        let transport = Transport::connect(server_addr, port).or_fail()?;
        transport.set_timeout(timeout).or_fail()?;
        Ok(Self {
            inner: RpcClient::new(transport),
            next_request_id: 0,
        })
    }

    /// Issues a single request and waits for the matching response.
    ///
    /// `params` goes on the wire only when non-empty (the key is omitted, not
    /// null). A remote error response or any transport failure comes back as
    /// a `Failure` carrying a printable message.
    pub fn call(
        &mut self,
        method: &str,
        params: serde_json::Map<String, serde_json::Value>,
    ) -> orfail::Result<serde_json::Value> {
        self.next_request_id += 1;
        let request = RequestObject {
            jsonrpc: JsonRpcVersion::V2,
            method: method.to_owned(),
            params: if params.is_empty() {
                None
            } else {
                Some(RequestParams::Object(params))
            },
            id: Some(RequestId::Number(self.next_request_id)),
        };
        log::debug!("request: {}", serde_json::to_string(&request).or_fail()?);

        let response: ResponseObject = self
            .inner
            .call(&request)
            .or_fail_with(|e| format!("RPC call '{method}' failed: {e}"))?;
        log::debug!("response: {}", serde_json::to_string(&response).or_fail()?);

        match response {
            ResponseObject::Ok { result, .. } => Ok(result),
            ResponseObject::Err { error, .. } => Err(Failure::new(format!(
                "request:\n{}\nGot JSON-RPC error response\nresponse:\n{}",
                serde_json::to_string_pretty(&request).or_fail()?,
                serde_json::to_string_pretty(&error).or_fail()?,
            ))),
        }
    }
}

/// Stream behind the client: a Unix domain socket when the server address is
/// a filesystem path, TCP otherwise.
#[derive(Debug)]
enum Transport {
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl Transport {
    fn connect(server_addr: &str, port: u16) -> orfail::Result<Self> {
        if server_addr.starts_with('/') {
            let socket = UnixStream::connect(server_addr)
                .or_fail_with(|e| format!("Failed to connect to '{server_addr}': {e}"))?;
            log::info!("connected to unix socket '{server_addr}'");
            return Ok(Self::Unix(socket));
        }

        let addr = (server_addr, port)
            .to_socket_addrs()
            .or_fail_with(|e| format!("Failed to resolve '{server_addr}:{port}': {e}"))?
            .next()
            .or_fail()?;
        let socket = TcpStream::connect(addr)
            .or_fail_with(|e| format!("Failed to connect to '{addr}': {e}"))?;
        socket.set_nodelay(true).or_fail()?;
        log::info!("connected to '{addr}'");
        Ok(Self::Tcp(socket))
    }

    fn set_timeout(&self, timeout: f64) -> orfail::Result<()> {
        let timeout = if timeout > 0.0 {
            Some(
                Duration::try_from_secs_f64(timeout)
                    .or_fail_with(|e| format!("Bad timeout value: {e}"))?,
            )
        } else {
            None
        };
        match self {
            Self::Unix(socket) => {
                socket.set_read_timeout(timeout).or_fail()?;
                socket.set_write_timeout(timeout).or_fail()?;
            }
            Self::Tcp(socket) => {
                socket.set_read_timeout(timeout).or_fail()?;
                socket.set_write_timeout(timeout).or_fail()?;
            }
        }
        Ok(())
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Unix(socket) => socket.read(buf),
            Self::Tcp(socket) => socket.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Unix(socket) => socket.write(buf),
            Self::Tcp(socket) => socket.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Unix(socket) => socket.flush(),
            Self::Tcp(socket) => socket.flush(),
        }
    }
}
