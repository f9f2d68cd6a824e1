// a scripted stand-in for the realflight soap server, only used by the tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type Responder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub(crate) struct FakeRealFlight {
    address: String,
    requests: Arc<Mutex<Vec<String>>>,
    accepted: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    task: tokio::task::JoinHandle<()>,
}

// what the server does with every accepted connection
#[derive(Clone)]
enum Behaviour {
    // read one request and answer it through the responder
    Respond(Responder),
    // do not read at all for a while, then drain until the client closes
    Deaf(Duration),
}

impl FakeRealFlight {
    // every request gets whatever the responder returns, None means stay silent
    pub(crate) async fn start<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self::start_with(Behaviour::Respond(Arc::new(responder))).await
    }

    pub(crate) async fn start_silent() -> Self {
        Self::start(|_| None).await
    }

    pub(crate) async fn start_replying(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::start(move |_| Some(reply.clone())).await
    }

    // never reads during `hold`, so a large enough request stalls the client's write
    pub(crate) async fn start_deaf(hold: Duration) -> Self {
        Self::start_with(Behaviour::Deaf(hold)).await
    }

    async fn start_with(behaviour: Behaviour) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let accepted = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));

        let task = {
            let requests = requests.clone();
            let accepted = accepted.clone();
            let closed = closed.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    accepted.fetch_add(1, Ordering::SeqCst);

                    let requests = requests.clone();
                    let closed = closed.clone();
                    match behaviour.clone() {
                        Behaviour::Respond(responder) => {
                            tokio::spawn(serve(stream, responder, requests, closed));
                        }
                        Behaviour::Deaf(hold) => {
                            tokio::spawn(ignore(stream, hold, closed));
                        }
                    }
                }
            })
        };

        FakeRealFlight {
            address,
            requests,
            accepted,
            closed,
            task,
        }
    }

    pub(crate) fn address(&self) -> String {
        self.address.clone()
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    // connections the client closed on us before we answered
    pub(crate) fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait_for_closed(&self, n: usize) {
        for _ in 0..1000 {
            if self.closed() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("only {} of {} connections were closed", self.closed(), n);
    }
}

impl Drop for FakeRealFlight {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub(crate) fn http_reply(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: text/xml; charset=utf-8\r\nContent-Length: {}\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}

pub(crate) fn soap_reply(inner: &str) -> String {
    let body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <SOAP-ENV:Envelope xmlns:SOAP-ENV=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <SOAP-ENV:Body>{}</SOAP-ENV:Body></SOAP-ENV:Envelope>",
        inner
    );
    http_reply("200 OK", &body)
}

async fn serve(
    mut stream: TcpStream,
    responder: Responder,
    requests: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicUsize>,
) {
    let request = match read_request(&mut stream).await {
        Some(r) => r,
        None => {
            // closed before a full request arrived, e.g. an unused pooled connection
            closed.fetch_add(1, Ordering::SeqCst);
            return;
        }
    };

    requests.lock().unwrap().push(request.clone());

    match responder(&request) {
        Some(reply) => {
            let _ = stream.write_all(reply.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
        None => {
            // hold the connection open without answering until the client gives up
            drain(&mut stream).await;
            closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

async fn ignore(mut stream: TcpStream, hold: Duration, closed: Arc<AtomicUsize>) {
    tokio::time::sleep(hold).await;
    drain(&mut stream).await;
    closed.fetch_add(1, Ordering::SeqCst);
}

// read and discard until eof or error
async fn drain(stream: &mut TcpStream) {
    let mut sink = vec![0_u8; 64 * 1024];
    while let Ok(n) = stream.read(&mut sink).await {
        if n == 0 {
            break;
        }
    }
}

// read one http request: headers, then as many body bytes as content-length says
async fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0_u8; 1024];

    loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf).into_owned();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|l| l.strip_prefix("Content-Length: "))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);

            if buf.len() >= header_end + 4 + content_length {
                return Some(text);
            }
        }
    }
}
