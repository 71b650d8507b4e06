pub mod worker_dto;
pub mod worker_list_response;
pub mod worker_response;
pub mod workers;
