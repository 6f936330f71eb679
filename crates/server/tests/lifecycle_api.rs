//! End-to-end lifecycle over HTTP: accounts, seeding, assignment, sale,
//! gate scan, settlement and the audit trail, with role checks exercised
//! through `x-user-id` impersonation against the none authenticator.

use std::io::Write;
use std::net::TcpListener;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::{NamedTempFile, TempDir};
use tokio::time::sleep;

fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn config_with_db(port: u16, db_path: &str) -> String {
    format!(
        r#"
[auth]
method = "none"

[server]
host = "127.0.0.1"
port = {}

[database]
path = "{}"
"#,
        port, db_path
    )
}

async fn spawn_server(config_path: &std::path::Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_turnstile"))
        .env("TURNSTILE_CONFIG", config_path)
        .env("RUST_LOG", "error")
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

struct Api {
    client: Client,
    base: String,
}

impl Api {
    fn new(port: u16) -> Self {
        Self {
            client: Client::new(),
            base: format!("http://127.0.0.1:{}/api/v1", port),
        }
    }

    /// POST as the anonymous super admin.
    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// POST impersonating a specific account.
    async fn post_as(&self, user_id: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base, path))
            .header("x-user-id", user_id)
            .json(&body)
            .send()
            .await
            .expect("Failed to send request")
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .expect("Failed to send request")
    }

    async fn get_as(&self, user_id: &str, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base, path))
            .header("x-user-id", user_id)
            .send()
            .await
            .expect("Failed to send request")
    }

    async fn create_user(&self, name: &str, email: &str, role: &str) -> String {
        let response = self
            .post(
                "/users",
                json!({
                    "name": name,
                    "email": email,
                    "token": format!("tok-{}", email),
                    "role": role,
                }),
            )
            .await;
        assert_eq!(response.status(), 201, "creating {} failed", name);
        let user: Value = response.json().await.unwrap();
        user["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_full_event_lifecycle() {
    let port = get_available_port();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("event.db");
    let config_content = config_with_db(port, db_path.to_str().unwrap());

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let mut server = spawn_server(temp_file.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let api = Api::new(port);

    // Accounts: an agent, a treasurer, a gate guard.
    let agent_id = api.create_user("Ada", "ada@example.com", "AGENT").await;
    let treasurer_id = api
        .create_user("Tessa", "tessa@example.com", "TREASURER")
        .await;
    let guard_id = api
        .create_user("Gus", "gus@example.com", "GATE_GUARD")
        .await;

    // Seed three tickets.
    let response = api
        .post(
            "/inventory/seed",
            json!({
                "tickets": [
                    {"serial_number": "0001", "code": "AB12", "magic_link": "https://tickets.example.com/t/AB12"},
                    {"serial_number": "0002", "code": "CD34", "magic_link": "https://tickets.example.com/t/CD34"},
                    {"serial_number": "0003", "code": "EF56", "magic_link": "https://tickets.example.com/t/EF56"},
                ]
            }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let seeded: Value = response.json().await.unwrap();
    assert_eq!(seeded["inserted"], 3);
    assert_eq!(seeded["skipped"], 0);

    // Re-seeding the same codes is idempotent.
    let response = api
        .post(
            "/inventory/seed",
            json!({
                "tickets": [
                    {"serial_number": "0001", "code": "AB12", "magic_link": "https://tickets.example.com/t/AB12"},
                ]
            }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let reseeded: Value = response.json().await.unwrap();
    assert_eq!(reseeded["inserted"], 0);
    assert_eq!(reseeded["skipped"], 1);

    // Assign serials 0001..0002 to the agent.
    let response = api
        .post(
            "/inventory/assign",
            json!({
                "agent_id": agent_id,
                "start_serial": "0001",
                "end_serial": "0002",
            }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let assigned: Value = response.json().await.unwrap();
    assert_eq!(assigned["assigned"], 2);

    // The agent sees two assigned tickets and owes nothing yet.
    let response = api.get_as(&agent_id, "/agent/wallet").await;
    assert_eq!(response.status(), 200);
    let wallet: Value = response.json().await.unwrap();
    assert_eq!(wallet["counts"]["assigned"], 2);
    assert_eq!(wallet["pending_count"], 0);
    let ticket_id = wallet["tickets"][0]["id"].as_str().unwrap().to_string();
    let code = wallet["tickets"][0]["code"].as_str().unwrap().to_string();

    // The agent sells it.
    let response = api
        .post_as(
            &agent_id,
            "/agent/sell",
            json!({
                "ticket_id": ticket_id,
                "customer_name": "Jane",
            }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let sold: Value = response.json().await.unwrap();
    assert_eq!(sold["status"], "SOLD");
    assert_eq!(sold["payment_settled"], false);

    // A VERIFY scan reports VALID without consuming the ticket.
    let response = api
        .post_as(
            &guard_id,
            "/gate/scan",
            json!({"payload": code, "mode": "verify"}),
        )
        .await;
    assert_eq!(response.status(), 200);
    let verified: Value = response.json().await.unwrap();
    assert_eq!(verified["outcome"], "VALID");
    assert_eq!(verified["allowed"], true);

    // ENTRY by full magic link admits and consumes.
    let response = api
        .post_as(
            &guard_id,
            "/gate/scan",
            json!({
                "payload": format!("https://tickets.example.com/t/{}", code),
                "mode": "entry",
            }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let scanned: Value = response.json().await.unwrap();
    assert_eq!(scanned["outcome"], "VALID");
    assert_eq!(scanned["ticket"]["status"], "SCANNED");

    // A second ENTRY is refused with 409.
    let response = api
        .post_as(
            &guard_id,
            "/gate/scan",
            json!({"payload": code, "mode": "entry"}),
        )
        .await;
    assert_eq!(response.status(), 409);
    let denied: Value = response.json().await.unwrap();
    assert_eq!(denied["outcome"], "USED");
    assert_eq!(denied["allowed"], false);

    // Debt survives the gate: the treasury still sees 1500 pending.
    let response = api.get_as(&treasurer_id, "/treasury/agents").await;
    assert_eq!(response.status(), 200);
    let overview: Value = response.json().await.unwrap();
    let summary = overview
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["agent_id"] == agent_id.as_str())
        .expect("agent missing from overview");
    assert_eq!(summary["pending_count"], 1);
    assert_eq!(summary["pending_amount"], 1500);

    // Settle the scanned ticket.
    let response = api
        .post_as(
            &treasurer_id,
            "/treasury/settle",
            json!({"agent_id": agent_id, "ticket_ids": [ticket_id]}),
        )
        .await;
    assert_eq!(response.status(), 200);
    let receipt: Value = response.json().await.unwrap();
    assert_eq!(receipt["count"], 1);
    assert_eq!(receipt["amount"], 1500);

    // Settling again finds nothing eligible.
    let response = api
        .post_as(
            &treasurer_id,
            "/treasury/settle",
            json!({"agent_id": agent_id, "ticket_ids": [ticket_id]}),
        )
        .await;
    assert_eq!(response.status(), 409);

    // The audit trail recorded the story (newest first). Writes go through
    // a background task; give it a moment to drain.
    sleep(Duration::from_millis(200)).await;
    let response = api.get("/audit?limit=100").await;
    assert_eq!(response.status(), 200);
    let audit: Value = response.json().await.unwrap();
    let mut types: Vec<&str> = audit["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event_type"].as_str().unwrap())
        .collect();
    types.reverse();
    assert_eq!(
        types,
        vec![
            "service_started",
            "tickets_seeded",
            "tickets_seeded",
            "batch_assigned",
            "ticket_sold",
            "gate_entry",
            "gate_denied",
            "payments_settled",
        ]
    );

    server.kill().await.ok();
}

#[tokio::test]
async fn test_roles_are_enforced() {
    let port = get_available_port();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("roles.db");
    let config_content = config_with_db(port, db_path.to_str().unwrap());

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let mut server = spawn_server(temp_file.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let api = Api::new(port);
    let agent_id = api.create_user("Ada", "ada@example.com", "AGENT").await;
    let guard_id = api
        .create_user("Gus", "gus@example.com", "GATE_GUARD")
        .await;

    // An agent may not seed inventory.
    let response = api
        .post_as(
            &agent_id,
            "/inventory/seed",
            json!({"tickets": [
                {"serial_number": "0001", "code": "AB12", "magic_link": "https://x/t/AB12"},
            ]}),
        )
        .await;
    assert_eq!(response.status(), 403);

    // A gate guard may not settle payments.
    let response = api
        .post_as(
            &guard_id,
            "/treasury/settle",
            json!({"agent_id": agent_id, "ticket_ids": ["x"]}),
        )
        .await;
    assert_eq!(response.status(), 403);

    // An agent may not read the audit log.
    let response = api.get_as(&agent_id, "/audit").await;
    assert_eq!(response.status(), 403);

    // An unknown impersonation header is a credential failure.
    let response = api.get_as("no-such-user", "/agent/wallet").await;
    assert_eq!(response.status(), 401);

    // The anonymous super admin can do anything.
    let response = api.get("/inventory").await;
    assert_eq!(response.status(), 200);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_ban_and_reset_flow() {
    let port = get_available_port();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("ban.db");
    let config_content = config_with_db(port, db_path.to_str().unwrap());

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let mut server = spawn_server(temp_file.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let api = Api::new(port);
    let guard_id = api
        .create_user("Gus", "gus@example.com", "GATE_GUARD")
        .await;

    let response = api
        .post(
            "/inventory/seed",
            json!({"tickets": [
                {"serial_number": "0001", "code": "AB12", "magic_link": "https://x/t/AB12"},
            ]}),
        )
        .await;
    assert_eq!(response.status(), 201);

    // Find the ticket and ban it.
    let response = api.get("/inventory?search=AB12").await;
    let listing: Value = response.json().await.unwrap();
    let ticket_id = listing["tickets"][0]["id"].as_str().unwrap().to_string();

    let response = api
        .post(&format!("/inventory/{}/ban", ticket_id), json!({}))
        .await;
    assert_eq!(response.status(), 200);
    let banned: Value = response.json().await.unwrap();
    assert_eq!(banned["status"], "INVALID");

    // The gate refuses a banned ticket outright.
    let response = api
        .post_as(
            &guard_id,
            "/gate/scan",
            json!({"payload": "AB12", "mode": "entry"}),
        )
        .await;
    assert_eq!(response.status(), 409);
    let denied: Value = response.json().await.unwrap();
    assert_eq!(denied["outcome"], "BANNED");

    // Reset returns it to stock.
    let response = api.post("/inventory/reset", json!({})).await;
    assert_eq!(response.status(), 200);
    let reset: Value = response.json().await.unwrap();
    assert_eq!(reset["reset"], 1);

    let response = api.get(&format!("/inventory/{}", ticket_id)).await;
    let fresh: Value = response.json().await.unwrap();
    assert_eq!(fresh["status"], "IN_STOCK");

    server.kill().await.ok();
}
