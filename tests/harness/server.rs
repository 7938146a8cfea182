use kastia::adapter::inbound::http;
use kastia::testkit::TestWorld;
use reqwest::{Client, RequestBuilder};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// The HTTP API running on an ephemeral port over a [`TestWorld`].
pub struct TestServer {
    pub world: TestWorld,
    pub base: String,
    client: Client,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub async fn start(name: &str) -> Self {
        Self::over(TestWorld::new(name)).await
    }

    pub async fn over(world: TestWorld) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        let base = format!("http://{}", listener.local_addr().expect("local addr"));
        let (tx, rx) = oneshot::channel::<()>();
        let services = world.services.clone();
        let handle = tokio::spawn(async move {
            http::serve_on(listener, services, async {
                let _ = rx.await;
            })
            .await
            .expect("server exited cleanly");
        });
        Self {
            world,
            base,
            client: Client::new(),
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(format!("{}{path}", self.base))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(format!("{}{path}", self.base))
    }

    /// Stop the server and wait for it to drain.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.expect("server task");
        }
    }
}
