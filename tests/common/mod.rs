use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

use payroll_service::config::{DatabaseConfig, PayrollConfig, SmtpConfig};
use payroll_service::models::{EmploymentStatus, PaymentStatus, SaveSalary};
use payroll_service::services::{Mailer, MemoryStore, MockMailer, PayrollStore};
use payroll_service::startup::{build_router, AppState};

pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<MockMailer>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_mailer(Arc::new(MockMailer::new())).await
    }

    pub async fn spawn_with_failing_mailer() -> Self {
        Self::spawn_with_mailer(Arc::new(MockMailer::failing())).await
    }

    async fn spawn_with_mailer(mailer: Arc<MockMailer>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let store_handle: Arc<dyn PayrollStore> = store.clone();
        let mailer_handle: Arc<dyn Mailer> = mailer.clone();
        let state = AppState::new(test_config(), store_handle, mailer_handle);
        let router = build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let port = listener.local_addr().expect("No local addr").port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        // Wait for the server to accept requests.
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            store,
            mailer,
        }
    }

    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    pub fn seed_employee(&self, first_name: &str, last_name: &str, email: &str) -> i64 {
        self.store
            .seed_employee(first_name, last_name, email, EmploymentStatus::Active)
    }

    pub async fn seed_salary(
        &self,
        employee_id: i64,
        base: &str,
        bonus: &str,
        payment_date: (i32, u32, u32),
    ) -> i64 {
        let (year, month, day) = payment_date;
        self.store
            .save_salary(&SaveSalary {
                salary_id: None,
                employee_id,
                base_salary: Decimal::from_str(base).expect("bad base salary"),
                bonus: Decimal::from_str(bonus).expect("bad bonus"),
                payment_date: NaiveDate::from_ymd_opt(year, month, day).expect("bad date"),
                payment_status: PaymentStatus::Pending,
            })
            .await
            .expect("Failed to seed salary")
    }
}

fn test_config() -> PayrollConfig {
    PayrollConfig {
        port: 0,
        database: DatabaseConfig {
            host: "localhost".to_string(),
            name: "payroll_test".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            max_connections: 2,
            min_connections: 1,
        },
        smtp: SmtpConfig {
            host: "smtp.test.local".to_string(),
            port: 587,
            sender: "payroll@example.com".to_string(),
            app_password: String::new(),
            enabled: false,
        },
    }
}
