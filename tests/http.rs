use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CounterView {
    id: u64,
    name: String,
    count: u64,
    all_time_high: u64,
    recent_timestamps: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FullRefresh {
    counters: Vec<CounterView>,
    history: Vec<HistoryDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CounterUpdate {
    kind: String,
    id: u64,
    count: u64,
    recent_timestamps: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryDay {
    date: String,
    entries: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    name: String,
    count: u64,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_dir() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("daily_tally_http_{}_{}", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/state")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_dir = unique_data_dir();
    let child = Command::new(env!("CARGO_BIN_EXE_daily_tally"))
        .env("PORT", port.to_string())
        .env("APP_DATA_DIR", data_dir)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn create(client: &Client, server: &TestServer, name: &str) -> CounterView {
    let response = client
        .post(format!("{}/api/counters", server.base_url))
        .json(&json!({ "name": name }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let full: FullRefresh = response.json().await.unwrap();
    full.counters
        .into_iter()
        .rev()
        .find(|counter| counter.name == name)
        .expect("created counter in refresh")
}

async fn post_action(
    client: &Client,
    server: &TestServer,
    id: u64,
    action: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/api/counters/{id}/{action}", server.base_url))
        .json(&json!({ "confirm": true }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_increment_and_decrement() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let counter = create(&client, &server, "Push-ups").await;
    assert_eq!(counter.count, 0);

    for _ in 0..4 {
        let response = post_action(&client, &server, counter.id, "increment").await;
        assert!(response.status().is_success());
    }
    let update: CounterUpdate = post_action(&client, &server, counter.id, "decrement")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(update.kind, "counter");
    assert_eq!(update.id, counter.id);
    assert_eq!(update.count, 3);
    assert_eq!(update.recent_timestamps.len(), 3);

    let full: FullRefresh = client
        .get(format!("{}/api/state", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let stored = full
        .counters
        .iter()
        .find(|c| c.id == counter.id)
        .expect("counter listed");
    assert_eq!(stored.count, 3);
    assert_eq!(stored.all_time_high, 4);
    assert_eq!(stored.recent_timestamps.len(), 3);
}

#[tokio::test]
async fn http_reset_archives_and_delete_keeps_history() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let counter = create(&client, &server, "Water").await;
    post_action(&client, &server, counter.id, "increment").await;
    post_action(&client, &server, counter.id, "increment").await;

    let declined = client
        .post(format!("{}/api/counters/{}/reset", server.base_url, counter.id))
        .json(&json!({ "confirm": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(declined.status(), StatusCode::NO_CONTENT);

    let update: CounterUpdate = post_action(&client, &server, counter.id, "reset")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(update.count, 0);
    assert!(update.recent_timestamps.is_empty());

    let deleted = post_action(&client, &server, counter.id, "delete").await;
    let full: FullRefresh = deleted.json().await.unwrap();
    assert!(full.counters.iter().all(|c| c.id != counter.id));

    let history: Vec<HistoryDay> = client
        .get(format!("{}/api/history", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let water = history
        .iter()
        .flat_map(|day| day.entries.iter())
        .find(|entry| entry.name == "Water")
        .expect("archived entry survives delete");
    assert_eq!(water.count, 2);
    assert!(!history[0].date.is_empty());
    assert_eq!(full.history.len(), history.len());
}

#[tokio::test]
async fn http_unknown_counter_is_not_found() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = post_action(&client, &server, 1, "increment").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_blank_name_is_ignored() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/counters", server.base_url))
        .json(&json!({ "name": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
