pub mod database;
pub mod mailer;
pub mod metrics;
pub mod renderer;
pub mod repository;
pub mod workflow;

pub use database::Database;
pub use mailer::{Mailer, MockMailer, SmtpMailer};
pub use metrics::{get_metrics, init_metrics};
pub use renderer::{format_amount, parse_amount, DocumentRenderer, InvoiceDocument};
pub use repository::{MemoryStore, PayrollStore};
pub use workflow::InvoiceWorkflow;
