pub mod employee;
pub mod invoice;
pub mod salary;
pub mod stats;

pub use employee::{EmployeeRef, EmploymentStatus};
pub use invoice::{
    invoice_number, month_name, CreateInvoice, Invoice, InvoiceStatus, InvoiceView, Period,
};
pub use salary::{PaymentStatus, SalaryRecord, SalaryRow, SaveSalary};
pub use stats::DashboardStats;
