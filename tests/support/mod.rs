// Shared one-time server bootstrap for integration tests.
use std::{
    net::TcpStream,
    sync::{OnceLock, mpsc},
    time::Duration,
};

// Base URL every test in this binary points at.
static SERVER_URL: OnceLock<String> = OnceLock::new();

// Start the shared test server on first use and return its base URL.
pub fn server_url() -> &'static str {
    SERVER_URL
        .get_or_init(|| {
            let (addr_tx, addr_rx) = mpsc::channel();
            // An OS thread with its own runtime outlives each #[tokio::test]
            // runtime in the binary.
            std::thread::spawn(move || {
                let runtime = tokio::runtime::Runtime::new().expect("test runtime");
                runtime.block_on(async move {
                    // An ephemeral port avoids collisions with local services.
                    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                        .await
                        .expect("bind ephemeral test port");
                    let addr = listener.local_addr().expect("get local addr");
                    addr_tx.send(addr).expect("publish server address");
                    koth_server::run(listener).await.expect("server failed");
                });
            });

            let addr = addr_rx
                .recv_timeout(Duration::from_secs(5))
                .expect("server thread never published its address");

            // Bind and accept can race the first request, so probe with retries.
            let mut ready = false;
            for _ in 0..100 {
                if TcpStream::connect(addr).is_ok() {
                    ready = true;
                    break;
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            assert!(ready, "server did not become ready in time");

            format!("http://{addr}")
        })
        .as_str()
}
