pub mod activity_service;
pub mod audit_service;
pub mod auth;
pub mod client_service;
pub mod dashboard_service;
pub mod notification;
pub mod report_service;
pub mod storage;
pub mod user_service;
pub mod visibility;

pub use activity_service::ActivityService;
pub use audit_service::AuditService;
pub use auth::AuthService;
pub use client_service::ClientService;
pub use dashboard_service::DashboardService;
pub use report_service::ReportService;
pub use user_service::UserService;
