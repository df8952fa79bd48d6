use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct Category {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Habit {
    id: String,
    name: String,
    category_id: Option<String>,
    description: Option<String>,
    frequency: String,
}

#[derive(Debug, Deserialize)]
struct Record {
    habit_id: String,
    date: String,
    completed: bool,
}

#[derive(Debug, Deserialize)]
struct StateResponse {
    mode: String,
    categories: Vec<Category>,
    habits: Vec<Habit>,
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    key: String,
    label: String,
    is_today: bool,
    completed: bool,
}

#[derive(Debug, Deserialize)]
struct Card {
    cells: Vec<Cell>,
    streak: u32,
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

fn unique_dir() -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("habit_tracker_http_{}_{}", std::process::id(), nanos));
    path
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
    let dir = unique_dir();
    let child = Command::new(env!("CARGO_BIN_EXE_habit_tracker"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", dir.join("state.json"))
        .env("APP_VISIT_PATH", dir.join("visit.json"))
        .env_remove("HABIT_USER_ID")
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

async fn state(client: &Client, base_url: &str) -> StateResponse {
    client
        .get(format!("{base_url}/api/state"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_multiline_habit_creates_each_line() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let category: Category = client
        .post(format!("{}/api/categories", server.base_url))
        .json(&serde_json::json!({ "name": "Mornings" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(category.name, "Mornings");

    let created: Vec<Habit> = client
        .post(format!("{}/api/habits", server.base_url))
        .json(&serde_json::json!({
            "name": "Run\nRead\n\nMeditate",
            "description": "before work",
            "frequency": "weekly",
            "category_id": category.id,
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let names: Vec<&str> = created.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["Run", "Read", "Meditate"]);
    for habit in &created {
        assert_eq!(habit.frequency, "weekly");
        assert_eq!(habit.description.as_deref(), Some("before work"));
        assert_eq!(habit.category_id.as_deref(), Some(category.id.as_str()));
    }

    let response = client
        .delete(format!("{}/api/categories/{}", server.base_url, category.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let after = state(&client, &server.base_url).await;
    assert_eq!(after.mode, "local");
    assert!(after.categories.iter().all(|c| c.id != category.id));
    for habit in &created {
        let stored = after.habits.iter().find(|h| h.id == habit.id).unwrap();
        assert_eq!(stored.category_id, None);
    }
}

#[tokio::test]
async fn http_toggle_only_changes_today() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let habit = client
        .post(format!("{}/api/habits", server.base_url))
        .json(&serde_json::json!({ "name": "Stretch", "frequency": "daily" }))
        .send()
        .await
        .unwrap()
        .json::<Vec<Habit>>()
        .await
        .unwrap()
        .remove(0);

    let card: Card = client
        .get(format!("{}/api/habits/{}", server.base_url, habit.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(card.cells.len(), 7);
    assert_eq!(card.cells[6].label, "Today");
    assert_eq!(card.cells[5].label, "Yesterday");
    assert_eq!(card.streak, 0);

    let yesterday = card.cells[5].key.clone();
    let today = card.cells[6].key.clone();
    assert!(card.cells[6].is_today);

    let card: Card = client
        .post(format!("{}/api/habits/{}/toggle", server.base_url, habit.id))
        .json(&serde_json::json!({ "date": yesterday }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(card.cells.iter().all(|c| !c.completed));

    let card: Card = client
        .post(format!("{}/api/habits/{}/toggle", server.base_url, habit.id))
        .json(&serde_json::json!({ "date": today }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(card.cells[6].completed);
    assert_eq!(card.streak, 1);

    let after = state(&client, &server.base_url).await;
    let records: Vec<&Record> = after
        .records
        .iter()
        .filter(|r| r.habit_id == habit.id)
        .collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].date, today);
    assert!(records[0].completed);
}

#[tokio::test]
async fn http_deleting_habit_drops_records() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let habit = client
        .post(format!("{}/api/habits", server.base_url))
        .json(&serde_json::json!({ "name": "Journal" }))
        .send()
        .await
        .unwrap()
        .json::<Vec<Habit>>()
        .await
        .unwrap()
        .remove(0);

    for (date, completed) in [("2026-01-01", true), ("2026-01-02", false), ("2026-01-02", true)] {
        let response = client
            .post(format!("{}/api/habits/{}/complete", server.base_url, habit.id))
            .json(&serde_json::json!({ "date": date, "completed": completed }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    let before = state(&client, &server.base_url).await;
    let records: Vec<&Record> = before
        .records
        .iter()
        .filter(|r| r.habit_id == habit.id)
        .collect();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.completed));

    let response = client
        .delete(format!("{}/api/habits/{}", server.base_url, habit.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let after = state(&client, &server.base_url).await;
    assert!(after.habits.iter().all(|h| h.id != habit.id));
    assert!(after.records.iter().all(|r| r.habit_id != habit.id));

    let response = client
        .get(format!("{}/api/habits/{}", server.base_url, habit.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_blank_category_is_ignored() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let before = state(&client, &server.base_url).await;
    let created: Option<Category> = client
        .post(format!("{}/api/categories", server.base_url))
        .json(&serde_json::json!({ "name": "   " }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(created.is_none());

    let after = state(&client, &server.base_url).await;
    assert_eq!(after.categories.len(), before.categories.len());
}

#[tokio::test]
async fn http_category_edits_report_unknown_ids() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .put(format!("{}/api/categories/missing", server.base_url))
        .json(&serde_json::json!({ "name": "Other" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .delete(format!("{}/api/categories/missing", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let category: Category = client
        .post(format!("{}/api/categories", server.base_url))
        .json(&serde_json::json!({ "name": "Chores" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let renamed: Category = client
        .put(format!("{}/api/categories/{}", server.base_url, category.id))
        .json(&serde_json::json!({ "name": "Errands" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(renamed.id, category.id);
    assert_eq!(renamed.name, "Errands");
}
