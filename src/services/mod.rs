pub mod analytics_service;
pub mod auth_service;
pub mod draft_service;
pub mod master_file_service;
pub mod metadata_store;
pub mod pdf_service;
pub mod soap_service;
pub mod storage_service;
pub mod submission_service;
pub mod wizard_service;
