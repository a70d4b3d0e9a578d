pub mod remote_search;
pub mod static_page;
