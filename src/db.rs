pub mod activity_repo;
pub use activity_repo::ActivityRepository;
pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod client_repo;
pub use client_repo::ClientRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
pub mod report_repo;
pub use report_repo::ReportRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
